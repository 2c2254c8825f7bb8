use crate::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn every_mutation_leaves_a_verifiable_entry() {
    let battalion = Battalion::stand_up("alpha").await.unwrap();
    let server = &battalion.server;

    let (status, body) = server
        .put(
            SUPER_ADMIN_ID,
            &format!("/api/companies/{}", battalion.company_id),
            json!({ "description": "Infantry" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, logs) = server
        .get(SUPER_ADMIN_ID, "/api/audit?entity_type=company")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = logs["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["company.update", "company.create"]);

    let (_, logs) = server
        .get(
            SUPER_ADMIN_ID,
            &format!("/api/audit?actor_id={}&limit=5", battalion.staff_id),
        )
        .await
        .unwrap();
    let entries = logs["logs"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "account.create");
    let log_id = string_field(&entries[0], "id").unwrap();

    let (status, verdict) = server
        .get(SUPER_ADMIN_ID, &format!("/api/audit/{log_id}/verify"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["valid"], true);
    assert_eq!(verdict["algorithm"], "HMAC-SHA256");
}

#[tokio::test]
async fn audit_trail_is_reserved_for_the_super_admin() {
    let battalion = Battalion::stand_up("bravo").await.unwrap();
    let server = &battalion.server;

    let (status, _) = server.get(&battalion.staff_id, "/api/audit").await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .get(SUPER_ADMIN_ID, "/api/audit?start_time=yesterday")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], Value::String("invalid_timestamp".into()));

    let future = (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339();
    let (status, logs) = server
        .get(
            SUPER_ADMIN_ID,
            &format!("/api/audit?start_time={}", future.replace('+', "%2B")),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(logs["logs"].as_array().unwrap().is_empty());

    let (status, _) = server
        .get(SUPER_ADMIN_ID, "/api/audit/does-not-exist/verify")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}
