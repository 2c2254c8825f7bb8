use crate::*;
use reqwest::StatusCode;
use serde_json::json;

async fn fill_required_sections(battalion: &Battalion) {
    let sections = [
        (
            "personal",
            json!({
                "first_name": "Juan", "last_name": "Cruz", "birth_date": "1992-07-15",
                "birth_place": "Iloilo", "sex": "M", "civil_status": "married"
            }),
        ),
        (
            "contact",
            json!({ "address": "Brgy. San Roque", "mobile": "0917-000-1111", "email": "juan@mail.ph" }),
        ),
        (
            "military",
            json!({
                "service_number": "SN-1001", "rank": "CPL", "branch": "Army",
                "date_of_enlistment": "2014-02-10"
            }),
        ),
        (
            "emergency_contact",
            json!({ "name": "Maria Cruz", "relationship": "spouse", "mobile": "0917-000-2222" }),
        ),
    ];
    for (section, payload) in sections {
        let (status, body) = battalion
            .server
            .put(
                &battalion.reservist_id,
                &format!("/api/rids/{}/sections/{section}", battalion.reservist_id),
                payload,
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK, "{section}: {body}");
    }
}

#[tokio::test]
async fn incomplete_sheets_cannot_be_submitted() {
    let battalion = Battalion::stand_up("alpha").await.unwrap();
    let server = &battalion.server;
    let base = format!("/api/rids/{}", battalion.reservist_id);

    let (status, sheet) = server.get(&battalion.reservist_id, &base).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sheet["status"], "draft");
    assert_eq!(sheet["completeness"]["percent"], 0);

    let (status, body) = server
        .put(
            &battalion.reservist_id,
            &format!("{base}/sections/hobbies"),
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "unknown_section");

    let (status, body) = server
        .put(
            &battalion.reservist_id,
            &format!("{base}/sections/personal"),
            json!({ "first_name": "Juan", "birth_date": "July 15" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_section");

    let (status, _) = server
        .put(
            &battalion.reservist_id,
            &format!("{base}/sections/contact"),
            json!({ "address": "Brgy. San Roque", "mobile": "0917", "email": "juan@mail.ph" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .post(&battalion.reservist_id, &format!("{base}/submit"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "rids_incomplete");
    assert!(body["details"].get("personal").is_some());
    assert!(body["details"].get("contact").is_none());
}

#[tokio::test]
async fn returned_sheet_is_corrected_and_approved() {
    let battalion = Battalion::stand_up("bravo").await.unwrap();
    let server = &battalion.server;
    let base = format!("/api/rids/{}", battalion.reservist_id);
    fill_required_sections(&battalion).await;

    let (status, submitted) = server
        .post(&battalion.reservist_id, &format!("{base}/submit"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submitted["status"], "submitted");
    assert_eq!(submitted["completeness"]["complete"], true);

    let (status, body) = server
        .put(
            &battalion.reservist_id,
            &format!("{base}/sections/awards"),
            json!({ "entries": [] }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "rids_locked");

    let (status, body) = server
        .post(
            &battalion.reservist_id,
            &format!("{base}/review"),
            json!({ "decision": "approve" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = server
        .post(&battalion.staff_id, &format!("{base}/review"), json!({ "decision": "return" }))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "remarks_required");

    let (status, returned) = server
        .post(
            &battalion.staff_id,
            &format!("{base}/review"),
            json!({ "decision": "return", "remarks": "attach awards" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "returned");
    assert_eq!(returned["remarks"], "attach awards");

    let (status, _) = server
        .put(
            &battalion.reservist_id,
            &format!("{base}/sections/awards"),
            json!({ "entries": [{ "title": "Military Merit Medal", "year": "2021" }] }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server
        .post(&battalion.reservist_id, &format!("{base}/submit"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, approved) = server
        .post(&battalion.staff_id, &format!("{base}/review"), json!({ "decision": "approve" }))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["sections"]["awards"]["entries"][0]["year"], "2021");

    let (status, body) = server
        .post(&battalion.reservist_id, &format!("{base}/submit"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "invalid_status_transition");

    let (_, inbox) = server
        .get(&battalion.reservist_id, "/api/notifications")
        .await
        .unwrap();
    let rids_notices = inbox["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "rids")
        .count();
    assert_eq!(rids_notices, 2);
}
