//! Battalion fixtures shared by the workflow tests.

use anyhow::Result;
pub use battalion_hub::{expect_ok, random_id, string_field, TestServer, SUPER_ADMIN_ID};
use serde_json::{json, Value};

/// One company with a clerk and a reservist already provisioned.
pub struct Battalion {
    pub server: TestServer,
    pub company_id: String,
    pub staff_id: String,
    pub reservist_id: String,
}

impl Battalion {
    pub async fn stand_up(code: &str) -> Result<Self> {
        let server = TestServer::start().await?;
        let company_id = server.create_company(code).await?;
        let staff_id = create_staff(&server, SUPER_ADMIN_ID, &company_id).await?;
        let reservist_id = create_reservist(&server, &staff_id, None, Some("2019-03-01")).await?;
        Ok(Self {
            server,
            company_id,
            staff_id,
            reservist_id,
        })
    }
}

pub async fn create_staff(server: &TestServer, actor: &str, company_id: &str) -> Result<String> {
    let id = random_id("staff");
    server
        .create_account(
            actor,
            json!({
                "id": id,
                "email": format!("{id}@battalion.mil"),
                "role": "staff",
                "first_name": "Ana",
                "last_name": "Reyes",
                "staff": { "company_id": company_id, "position": "Company Clerk" }
            }),
        )
        .await
}

pub async fn create_reservist(
    server: &TestServer,
    actor: &str,
    company_id: Option<&str>,
    date_of_rank: Option<&str>,
) -> Result<String> {
    let id = random_id("rsv");
    server
        .create_account(
            actor,
            json!({
                "id": id,
                "email": format!("{id}@battalion.mil"),
                "role": "reservist",
                "first_name": "Juan",
                "last_name": "Cruz",
                "reservist": {
                    "company_id": company_id,
                    "service_number": format!("SN-{id}"),
                    "rank": "CPL",
                    "date_of_rank": date_of_rank,
                    "branch": "Army"
                }
            }),
        )
        .await
}

pub fn session_body(title: &str, company_id: Option<&str>, hours: f64, capacity: Option<u32>) -> Value {
    let start = chrono::Utc::now() + chrono::Duration::days(3);
    let end = start + chrono::Duration::hours(8);
    json!({
        "title": title,
        "location": "Camp Aguinaldo",
        "company_id": company_id,
        "start_at": start.to_rfc3339(),
        "end_at": end.to_rfc3339(),
        "hours": hours,
        "capacity": capacity
    })
}

pub fn error_code(body: &Value) -> &str {
    body.get("code").and_then(Value::as_str).unwrap_or_default()
}
