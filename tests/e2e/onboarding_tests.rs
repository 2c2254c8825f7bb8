use crate::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn super_admin_bootstraps_company_staff_and_reservist() {
    let battalion = Battalion::stand_up("alpha").await.unwrap();
    let server = &battalion.server;

    let (status, me) = server.get(SUPER_ADMIN_ID, "/api/me").await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["account"]["role"], "super_admin");

    let (status, company) = server
        .get(SUPER_ADMIN_ID, &format!("/api/companies/{}", battalion.company_id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(company["code"], "ALPHA");
    assert_eq!(company["staff_count"], 1);
    assert_eq!(company["reservist_count"], 1);

    // Staff created the reservist without naming a company; it lands in theirs.
    let (status, reservist) = server
        .get(&battalion.staff_id, &format!("/api/reservists/{}", battalion.reservist_id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reservist["company_id"], Value::String(battalion.company_id.clone()));
    assert_eq!(reservist["mobilization_status"], "ready");

    let (status, me) = server.get(&battalion.reservist_id, "/api/me").await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["company_id"], Value::String(battalion.company_id.clone()));
    assert_eq!(me["profile"]["first_name"], "Juan");
}

#[tokio::test]
async fn provisioning_respects_the_role_hierarchy() {
    let battalion = Battalion::stand_up("bravo").await.unwrap();
    let server = &battalion.server;

    let (status, body) = server
        .post(
            &battalion.staff_id,
            "/api/accounts",
            json!({
                "email": "another-clerk@battalion.mil",
                "role": "staff",
                "first_name": "Lito",
                "last_name": "Santos"
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "forbidden");

    let (status, _) = server
        .post(
            &battalion.reservist_id,
            "/api/accounts",
            json!({
                "email": "self-service@battalion.mil",
                "role": "reservist",
                "first_name": "Pedro",
                "last_name": "Lim",
                "reservist": { "service_number": "SN-9", "rank": "PVT" }
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .post(
            SUPER_ADMIN_ID,
            "/api/accounts",
            json!({
                "email": "no-details@battalion.mil",
                "role": "reservist",
                "first_name": "Pedro",
                "last_name": "Lim"
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_request");
}

#[tokio::test]
async fn deactivated_accounts_lose_access_until_reactivated() {
    let battalion = Battalion::stand_up("charlie").await.unwrap();
    let server = &battalion.server;
    let path = format!("/api/accounts/{}", battalion.reservist_id);

    let (status, account) = server
        .post(SUPER_ADMIN_ID, &format!("{path}/deactivate"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["status"], "deactivated");

    let (status, body) = server.get(&battalion.reservist_id, "/api/me").await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "account_deactivated");

    let (status, _) = server
        .post(SUPER_ADMIN_ID, &format!("{path}/activate"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get(&battalion.reservist_id, "/api/me").await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admins_cannot_change_the_status_of_other_administrators() {
    let battalion = Battalion::stand_up("echo").await.unwrap();
    let server = &battalion.server;
    let mut admins = Vec::new();
    for name in ["ops", "logistics"] {
        let id = server
            .create_account(
                SUPER_ADMIN_ID,
                json!({
                    "email": format!("{name}-admin@battalion.mil"),
                    "role": "admin",
                    "first_name": "Marco",
                    "last_name": format!("Admin {name}")
                }),
            )
            .await
            .unwrap();
        admins.push(id);
    }
    let (ops, logistics) = (&admins[0], &admins[1]);

    let (status, body) = server
        .post(ops, &format!("/api/accounts/{logistics}/deactivate"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "forbidden");

    let (status, body) = server
        .post(ops, &format!("/api/accounts/{SUPER_ADMIN_ID}/deactivate"), json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "forbidden");

    let (status, _) = server.get(logistics, "/api/me").await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, account) = server
        .post(
            SUPER_ADMIN_ID,
            &format!("/api/accounts/{logistics}/deactivate"),
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["status"], "deactivated");
}

#[tokio::test]
async fn company_with_personnel_cannot_be_deleted() {
    let battalion = Battalion::stand_up("delta").await.unwrap();
    let server = &battalion.server;

    let (status, body) = server
        .delete(SUPER_ADMIN_ID, &format!("/api/companies/{}", battalion.company_id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "company_has_dependents");

    let empty = server.create_company("echo").await.unwrap();
    let (status, _) = server
        .delete(SUPER_ADMIN_ID, &format!("/api/companies/{empty}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
}
