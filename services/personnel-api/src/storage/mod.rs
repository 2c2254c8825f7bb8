pub mod accounts;
pub mod announcements;
pub mod audit;
pub mod companies;
pub mod database;
pub mod documents;
pub mod error;
pub mod notifications;
pub mod personnel;
pub mod rids;
pub mod schema;
pub mod training;

#[cfg(test)]
pub(crate) mod fixtures;

pub use accounts::AccountStore;
pub use announcements::AnnouncementStore;
pub use audit::AuditStore;
pub use companies::CompanyStore;
pub use database::Database;
pub use documents::DocumentStore;
pub use error::StorageError;
pub use notifications::NotificationStore;
pub use personnel::PersonnelStore;
pub use rids::RidsStore;
pub use training::TrainingStore;

pub const PERSONNEL_DB_FILENAME: &str = "personnel.db";
