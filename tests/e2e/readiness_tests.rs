use crate::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn upload(battalion: &Battalion, doc_type: &str) -> String {
    let (status, document) = battalion
        .server
        .post(
            &battalion.reservist_id,
            "/api/documents",
            json!({
                "doc_type": doc_type,
                "file_name": format!("{doc_type}.pdf"),
                "storage_path": format!("uploads/{}/{doc_type}.pdf", battalion.reservist_id)
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "{document}");
    assert_eq!(document["status"], "pending");
    string_field(&document, "id").unwrap()
}

async fn attend(battalion: &Battalion, title: &str, hours: f64) -> String {
    let server = &battalion.server;
    let (status, session) = server
        .post(
            &battalion.staff_id,
            "/api/training",
            session_body(title, None, hours, None),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK, "{session}");
    let session_id = string_field(&session, "id").unwrap();

    let (status, _) = server
        .post(
            &battalion.reservist_id,
            &format!("/api/training/{session_id}/register"),
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, registration) = server
        .put(
            &battalion.staff_id,
            &format!(
                "/api/training/{session_id}/registrations/{}",
                battalion.reservist_id
            ),
            json!({ "status": "attended" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registration["status"], "attended");
    session_id
}

#[tokio::test]
async fn document_review_notifies_the_owner_once() {
    let battalion = Battalion::stand_up("alpha").await.unwrap();
    let server = &battalion.server;
    let document_id = upload(&battalion, "medical_certificate").await;

    let (status, body) = server
        .post(
            &battalion.staff_id,
            &format!("/api/documents/{document_id}/review"),
            json!({ "status": "pending" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_status");

    let (status, reviewed) = server
        .post(
            &battalion.staff_id,
            &format!("/api/documents/{document_id}/review"),
            json!({ "status": "rejected", "notes": "scan is unreadable" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "rejected");
    assert_eq!(reviewed["reviewed_by"], Value::String(battalion.staff_id.clone()));

    let (status, body) = server
        .post(
            &battalion.staff_id,
            &format!("/api/documents/{document_id}/review"),
            json!({ "status": "verified" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "document_not_pending");

    let (status, inbox) = server
        .get(&battalion.reservist_id, "/api/notifications?unread_only=true")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = inbox["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["document"]);
    assert!(inbox["items"][0]["message"]
        .as_str()
        .unwrap()
        .contains("scan is unreadable"));
}

#[tokio::test]
async fn only_pending_documents_can_be_withdrawn_by_their_owner() {
    let battalion = Battalion::stand_up("bravo").await.unwrap();
    let server = &battalion.server;
    let first = upload(&battalion, "birth_certificate").await;
    let second = upload(&battalion, "diploma").await;

    let (status, _) = server
        .post(
            &battalion.staff_id,
            &format!("/api/documents/{second}/review"),
            json!({ "status": "verified" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .delete(&battalion.reservist_id, &format!("/api/documents/{first}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .delete(&battalion.reservist_id, &format!("/api/documents/{second}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, page) = server
        .get(&battalion.reservist_id, "/api/documents")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["status"], "verified");
}

#[tokio::test]
async fn attended_training_and_verified_documents_make_a_reservist_eligible() {
    let battalion = Battalion::stand_up("charlie").await.unwrap();
    let server = &battalion.server;
    let path = format!("/api/reservists/{}/eligibility", battalion.reservist_id);

    let (status, before) = server.get(&battalion.staff_id, &path).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["eligible"], false);
    // Time in rank is met from the start; nothing else is.
    assert_eq!(before["score"], 40);

    attend(&battalion, "Marksmanship", 24.0).await;
    attend(&battalion, "Field Medic", 24.0).await;
    let document_id = upload(&battalion, "training_certificate").await;
    let (status, _) = server
        .post(
            &battalion.staff_id,
            &format!("/api/documents/{document_id}/review"),
            json!({ "status": "verified" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, after) = server.get(&battalion.reservist_id, &path).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["eligible"], true);
    assert_eq!(after["score"], 100);
    assert_eq!(after["rank"], "CPL");
    assert_eq!(after["criteria"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn capacity_is_enforced_and_completed_sessions_are_kept() {
    let battalion = Battalion::stand_up("delta").await.unwrap();
    let server = &battalion.server;
    let second = create_reservist(server, &battalion.staff_id, None, None)
        .await
        .unwrap();

    let (status, session) = server
        .post(
            &battalion.staff_id,
            "/api/training",
            session_body("Range Day", Some(&battalion.company_id), 8.0, Some(1)),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let session_id = string_field(&session, "id").unwrap();
    let register = format!("/api/training/{session_id}/register");

    let (status, _) = server
        .post(&battalion.reservist_id, &register, json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .post(&battalion.reservist_id, &register, json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "already_registered");

    let (status, body) = server.post(&second, &register, json!({})).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "session_full");

    let (status, _) = server
        .post(
            &battalion.reservist_id,
            &format!("/api/training/{session_id}/cancel-registration"),
            json!({}),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.post(&second, &register, json!({})).await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, roster) = server
        .get(
            &battalion.staff_id,
            &format!("/api/training/{session_id}/registrations"),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let active: Vec<&Value> = roster
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["status"] == "registered")
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["account_id"], Value::String(second.clone()));

    let (status, _) = server
        .put(
            &battalion.staff_id,
            &format!("/api/training/{session_id}"),
            json!({ "status": "completed" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .post(&battalion.reservist_id, &register, json!({}))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "session_closed");

    let (status, body) = server
        .delete(&battalion.staff_id, &format!("/api/training/{session_id}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "session_completed");
}

#[tokio::test]
async fn sessions_must_end_after_they_start() {
    let battalion = Battalion::stand_up("foxtrot").await.unwrap();
    let server = &battalion.server;

    let mut backwards = session_body("Night March", Some(&battalion.company_id), 6.0, None);
    let start = backwards["start_at"].clone();
    backwards["start_at"] = backwards["end_at"].clone();
    backwards["end_at"] = start;
    let (status, body) = server
        .post(&battalion.staff_id, "/api/training", backwards)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_schedule");

    let (status, session) = server
        .post(
            &battalion.staff_id,
            "/api/training",
            session_body("Night March", Some(&battalion.company_id), 6.0, None),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let session_id = string_field(&session, "id").unwrap();

    let (status, body) = server
        .put(
            &battalion.staff_id,
            &format!("/api/training/{session_id}"),
            json!({ "end_at": session["start_at"].clone() }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid_schedule");
}
