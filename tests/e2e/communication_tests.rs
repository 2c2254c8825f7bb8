use crate::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn ids(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["id"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn publishing_fans_out_to_the_company_only() {
    let battalion = Battalion::stand_up("alpha").await.unwrap();
    let server = &battalion.server;
    let other_company = server.create_company("bravo").await.unwrap();
    let outsider = create_reservist(server, SUPER_ADMIN_ID, Some(&other_company), None)
        .await
        .unwrap();

    let (status, draft) = server
        .post(
            &battalion.staff_id,
            "/api/announcements",
            json!({ "title": "Muster", "body": "Report at 0600", "priority": "urgent" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "{draft}");
    assert_eq!(draft["company_id"], Value::String(battalion.company_id.clone()));
    assert_eq!(draft["is_published"], false);
    let announcement_id = string_field(&draft, "id").unwrap();

    // Drafts stay out of the reader feed.
    let (_, feed) = server
        .get(&battalion.reservist_id, "/api/announcements")
        .await
        .unwrap();
    assert!(ids(&feed).is_empty());

    let publish = format!("/api/announcements/{announcement_id}/publish");
    let (status, published) = server
        .post(&battalion.staff_id, &publish, json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["notified"], 2);
    assert_eq!(published["announcement"]["is_published"], true);

    let (status, body) = server
        .post(&battalion.staff_id, &publish, json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "already_published");

    let (_, feed) = server
        .get(&battalion.reservist_id, "/api/announcements")
        .await
        .unwrap();
    assert_eq!(ids(&feed), vec![announcement_id.clone()]);

    let (_, feed) = server.get(&outsider, "/api/announcements").await.unwrap();
    assert!(ids(&feed).is_empty());
    let (status, _) = server
        .get(&outsider, &format!("/api/announcements/{announcement_id}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, inbox) = server.get(&outsider, "/api/notifications").await.unwrap();
    assert_eq!(inbox["unread"], 0);
}

#[tokio::test]
async fn battalion_wide_announcements_reach_every_active_account() {
    let battalion = Battalion::stand_up("charlie").await.unwrap();
    let server = &battalion.server;

    let (status, body) = server
        .post(
            &battalion.staff_id,
            "/api/announcements",
            json!({ "title": "Wide", "body": "x", "company_id": "someone-else" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "company_scope");

    let (_, draft) = server
        .post(
            SUPER_ADMIN_ID,
            "/api/announcements",
            json!({ "title": "Annual Training", "body": "Schedule attached", "priority": "high" }),
        )
        .await
        .unwrap();
    let announcement_id = string_field(&draft, "id").unwrap();

    let (status, published) = server
        .post(
            SUPER_ADMIN_ID,
            &format!("/api/announcements/{announcement_id}/publish"),
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    // super admin, clerk and reservist
    assert_eq!(published["notified"], 3);

    let (status, inbox) = server
        .get(&battalion.reservist_id, "/api/notifications")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["unread"], 1);
    assert_eq!(inbox["items"][0]["kind"], "announcement");
    assert_eq!(inbox["items"][0]["title"], "Annual Training");
}

#[tokio::test]
async fn notifications_are_marked_read_by_their_owner_only() {
    let battalion = Battalion::stand_up("delta").await.unwrap();
    let server = &battalion.server;

    let (_, draft) = server
        .post(
            &battalion.staff_id,
            "/api/announcements",
            json!({ "title": "Drill", "body": "Saturday" }),
        )
        .await
        .unwrap();
    let announcement_id = string_field(&draft, "id").unwrap();
    server
        .post(
            &battalion.staff_id,
            &format!("/api/announcements/{announcement_id}/publish"),
            json!({}),
        )
        .await
        .unwrap();

    let (_, inbox) = server
        .get(&battalion.reservist_id, "/api/notifications")
        .await
        .unwrap();
    let notification_id = string_field(&inbox["items"][0], "id").unwrap();
    let read = format!("/api/notifications/{notification_id}/read");

    let (status, _) = server.post(&battalion.staff_id, &read, json!({})).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post(&battalion.reservist_id, &read, json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (_, dashboard) = server
        .get(&battalion.reservist_id, "/api/dashboard")
        .await
        .unwrap();
    assert_eq!(dashboard["role"], "reservist");
    assert_eq!(dashboard["unread_notifications"], 0);

    let (status, cleared) = server
        .post(&battalion.staff_id, "/api/notifications/read-all", json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["updated"], 1);

    let (_, logs) = server
        .get(SUPER_ADMIN_ID, "/api/audit?entity_type=notification")
        .await
        .unwrap();
    let entries = logs["logs"].as_array().unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["notification.read_all", "notification.read"]);
    assert_eq!(entries[0]["actor_id"], battalion.staff_id.as_str());
    assert_eq!(entries[0]["details"]["updated"], 1);
    assert_eq!(entries[1]["actor_id"], battalion.reservist_id.as_str());
    assert_eq!(entries[1]["entity_id"], notification_id.as_str());
}
