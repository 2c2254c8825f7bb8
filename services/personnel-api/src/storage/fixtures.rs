use chrono::{Duration, Utc};

use crate::auth::Role;
use crate::models::{DocumentStatus, MobilizationStatus, Priority, SessionStatus};

use super::accounts::{NewAccount, ReservistDetails, StaffDetails};
use super::announcements::AnnouncementRecord;
use super::audit::AuditLogEntry;
use super::companies::CompanyRecord;
use super::documents::DocumentRecord;
use super::training::SessionRecord;
use super::{AccountStore, Database};

pub fn company(id: &str, code: &str) -> CompanyRecord {
    let now = Utc::now().to_rfc3339();
    CompanyRecord {
        id: id.to_string(),
        code: code.to_string(),
        name: format!("{code} Company"),
        description: None,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    }
}

pub fn reservist(db: &Database, id: &str, company_id: Option<&str>) {
    AccountStore::new(db.clone())
        .create(&NewAccount {
            id: id.to_string(),
            email: format!("{id}@unit.mil"),
            role: Role::Reservist,
            first_name: "Juan".to_string(),
            last_name: format!("Reservist {id}"),
            middle_name: None,
            phone: None,
            staff: None,
            reservist: Some(ReservistDetails {
                company_id: company_id.map(String::from),
                service_number: format!("SN-{id}"),
                rank: "PVT".to_string(),
                date_of_rank: None,
                branch: Some("Army".to_string()),
                mobilization_status: MobilizationStatus::Ready,
            }),
        })
        .expect("reservist fixture");
}

pub fn staff(db: &Database, id: &str, company_id: Option<&str>) {
    AccountStore::new(db.clone())
        .create(&NewAccount {
            id: id.to_string(),
            email: format!("{id}@unit.mil"),
            role: Role::Staff,
            first_name: "Ana".to_string(),
            last_name: format!("Staff {id}"),
            middle_name: None,
            phone: None,
            staff: Some(StaffDetails {
                company_id: company_id.map(String::from),
                position: Some("Clerk".to_string()),
                employee_no: None,
            }),
            reservist: None,
        })
        .expect("staff fixture");
}

pub fn session(id: &str, company_id: Option<&str>, created_by: &str) -> SessionRecord {
    let start_at = Utc::now() + Duration::days(7);
    let now = Utc::now().to_rfc3339();
    SessionRecord {
        id: id.to_string(),
        title: format!("Drill {id}"),
        description: None,
        location: Some("Camp Aguinaldo".to_string()),
        company_id: company_id.map(String::from),
        start_at,
        end_at: start_at + Duration::hours(8),
        capacity: None,
        hours: 8.0,
        status: SessionStatus::Scheduled,
        created_by: created_by.to_string(),
        created_at: now.clone(),
        updated_at: now,
    }
}

pub fn document(id: &str, account_id: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        account_id: account_id.to_string(),
        doc_type: "service_record".to_string(),
        file_name: format!("{id}.pdf"),
        storage_path: format!("documents/{account_id}/{id}.pdf"),
        status: DocumentStatus::Pending,
        notes: None,
        reviewed_by: None,
        reviewed_at: None,
        created_at: Utc::now().to_rfc3339(),
    }
}

pub fn announcement(
    id: &str,
    company_id: Option<&str>,
    priority: Priority,
    created_by: &str,
) -> AnnouncementRecord {
    let now = Utc::now().to_rfc3339();
    AnnouncementRecord {
        id: id.to_string(),
        title: format!("Notice {id}"),
        body: "Formation at 0700".to_string(),
        priority,
        company_id: company_id.map(String::from),
        is_published: false,
        published_at: None,
        created_by: created_by.to_string(),
        created_at: now.clone(),
        updated_at: now,
    }
}

/// An unsigned entry for store methods that write their audit row in the same
/// transaction as the change.
pub fn audit_entry(action: &str, entity_type: &str, entity_id: &str) -> AuditLogEntry {
    AuditLogEntry {
        id: uuid::Uuid::new_v4().to_string(),
        actor_id: "s1".to_string(),
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id: Some(entity_id.to_string()),
        details: serde_json::json!({}),
        created_at: Utc::now().to_rfc3339(),
        signature: "unsigned".to_string(),
    }
}
