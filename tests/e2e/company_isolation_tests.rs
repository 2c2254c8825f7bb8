use crate::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn staff_see_only_their_own_company() {
    let battalion = Battalion::stand_up("alpha").await.unwrap();
    let server = &battalion.server;
    let bravo = server.create_company("bravo").await.unwrap();
    let bravo_reservist = create_reservist(server, SUPER_ADMIN_ID, Some(&bravo), None)
        .await
        .unwrap();

    // An explicit company filter cannot widen a clerk's view.
    let (status, page) = server
        .get(&battalion.staff_id, &format!("/api/reservists?company_id={bravo}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["account_id"], Value::String(battalion.reservist_id.clone()));

    let (status, body) = server
        .get(&battalion.staff_id, &format!("/api/reservists/{bravo_reservist}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "company_scope");

    let (status, body) = server
        .post(
            &battalion.staff_id,
            "/api/accounts",
            json!({
                "email": "wrong-company@battalion.mil",
                "role": "reservist",
                "first_name": "Rico",
                "last_name": "Dela Cruz",
                "reservist": { "company_id": bravo, "service_number": "SN-77", "rank": "PFC" }
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "company_scope");

    let (status, page) = server
        .get(SUPER_ADMIN_ID, "/api/reservists?sort=rank&order=asc")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
}

#[tokio::test]
async fn reservists_cannot_read_each_other() {
    let battalion = Battalion::stand_up("charlie").await.unwrap();
    let server = &battalion.server;
    let peer = create_reservist(server, &battalion.staff_id, None, None)
        .await
        .unwrap();

    let (status, _) = server
        .get(&peer, &format!("/api/reservists/{}", battalion.reservist_id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .get(&peer, &format!("/api/rids/{}", battalion.reservist_id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.get(&peer, "/api/reservists").await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn company_sessions_are_hidden_from_other_companies() {
    let battalion = Battalion::stand_up("delta").await.unwrap();
    let server = &battalion.server;
    let echo = server.create_company("echo").await.unwrap();
    let outsider = create_reservist(server, SUPER_ADMIN_ID, Some(&echo), None)
        .await
        .unwrap();

    let (_, company_session) = server
        .post(
            &battalion.staff_id,
            "/api/training",
            session_body("Company Drill", None, 4.0, None),
        )
        .await
        .unwrap();
    let (_, wide_session) = server
        .post(
            SUPER_ADMIN_ID,
            "/api/training",
            session_body("Battalion Review", None, 6.0, None),
        )
        .await
        .unwrap();
    let company_session_id = string_field(&company_session, "id").unwrap();
    let wide_session_id = string_field(&wide_session, "id").unwrap();

    let (status, page) = server.get(&outsider, "/api/training?upcoming=true").await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let visible: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert_eq!(visible, vec![wide_session_id.as_str()]);

    let (status, _) = server
        .post(
            &outsider,
            &format!("/api/training/{company_session_id}/register"),
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .put(
            &battalion.staff_id,
            &format!("/api/training/{wide_session_id}"),
            json!({ "title": "Renamed" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "company_scope");

    let (_, dashboard) = server.get(&battalion.staff_id, "/api/dashboard").await.unwrap();
    assert_eq!(dashboard["upcoming_training"], 2);
    assert_eq!(dashboard["reservists_by_status"]["ready"], 1);
    assert_eq!(dashboard["reservists_by_status"]["standby"], 0);
}
