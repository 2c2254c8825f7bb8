use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::eligibility::EligibilityReport;
use crate::models::{
    AccountStatus, DocumentStatus, MobilizationStatus, Priority, RegistrationStatus, SessionStatus,
};
use crate::rids::Completeness;
use crate::storage::accounts::{AccountRecord, ProfileRecord};
use crate::storage::companies::{CompanyDependents, CompanyRecord};
use crate::storage::personnel::{ReservistRecord, StaffRecord};
use crate::storage::rids::RidsRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

// Accounts

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub account: AccountRecord,
    pub profile: Option<ProfileRecord>,
    pub staff: Option<StaffRecord>,
    pub reservist: Option<ReservistRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub view: AccountView,
    pub company_id: Option<String>,
    pub unread_notifications: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffDetailsRequest {
    pub company_id: Option<String>,
    pub position: Option<String>,
    pub employee_no: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservistDetailsRequest {
    pub company_id: Option<String>,
    pub service_number: String,
    pub rank: String,
    pub date_of_rank: Option<NaiveDate>,
    pub branch: Option<String>,
    pub mobilization_status: Option<MobilizationStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    /// Platform user id. Generated when absent.
    pub id: Option<String>,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub staff: Option<StaffDetailsRequest>,
    pub reservist: Option<ReservistDetailsRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountListQuery {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
}

// Companies

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompanyRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyListQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetailResponse {
    #[serde(flatten)]
    pub company: CompanyRecord,
    pub staff_count: i64,
    pub reservist_count: i64,
}

impl CompanyDetailResponse {
    pub fn new(company: CompanyRecord, dependents: &CompanyDependents) -> Self {
        Self {
            company,
            staff_count: dependents.staff,
            reservist_count: dependents.reservists,
        }
    }
}

// Personnel

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffListQuery {
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStaffRequest {
    pub company_id: Option<String>,
    pub position: Option<String>,
    pub employee_no: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservistListQuery {
    pub company_id: Option<String>,
    pub rank: Option<String>,
    pub mobilization_status: Option<MobilizationStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReservistRequest {
    pub company_id: Option<String>,
    pub rank: Option<String>,
    pub date_of_rank: Option<NaiveDate>,
    pub branch: Option<String>,
    pub mobilization_status: Option<MobilizationStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibilityResponse {
    pub account_id: String,
    pub rank: String,
    pub date_of_rank: Option<NaiveDate>,
    #[serde(flatten)]
    pub report: EligibilityReport,
}

// Documents

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
    pub doc_type: String,
    pub file_name: String,
    pub storage_path: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentListQuery {
    pub account_id: Option<String>,
    pub status: Option<DocumentStatus>,
    pub doc_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDocumentRequest {
    pub status: DocumentStatus,
    pub notes: Option<String>,
}

// Training

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub company_id: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub capacity: Option<u32>,
    pub hours: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub hours: Option<f64>,
    pub status: Option<SessionStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionListQuery {
    pub status: Option<SessionStatus>,
    pub company_id: Option<String>,
    pub upcoming: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceRequest {
    pub status: RegistrationStatus,
}

// Announcements

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
    pub priority: Option<Priority>,
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementListQuery {
    pub company_id: Option<String>,
    pub published: Option<bool>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    pub announcement: crate::storage::announcements::AnnouncementRecord,
    pub notified: usize,
}

// Notifications

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationsResponse {
    pub items: Vec<crate::storage::notifications::NotificationRecord>,
    pub unread: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

// RIDS

#[derive(Debug, Clone, Serialize)]
pub struct RidsResponse {
    #[serde(flatten)]
    pub record: RidsRecord,
    pub completeness: Completeness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RidsDecision {
    Approve,
    Return,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RidsReviewRequest {
    pub decision: RidsDecision,
    pub remarks: Option<String>,
}

// Dashboard

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardResponse {
    pub role: String,
    pub scope_company_id: Option<String>,
    pub companies: Option<i64>,
    pub reservists_by_status: Option<BTreeMap<String, i64>>,
    pub pending_documents: Option<i64>,
    pub upcoming_training: i64,
    pub unread_notifications: i64,
}

// Audit

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogsResponse {
    pub logs: Vec<crate::storage::audit::AuditLogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyAuditResponse {
    pub id: String,
    pub valid: bool,
    pub algorithm: &'static str,
}
