pub mod api;
pub mod auth;
pub mod config;
pub mod eligibility;
pub mod listing;
pub mod models;
pub mod rids;
pub mod signing;
pub mod storage;

pub use api::{create_router, ApiState, ErrorResponse};
pub use auth::{AccountContext, AuthError, Role, TokenClaims, TokenVerifier};
pub use config::{BootstrapAccount, PersonnelConfig};
pub use eligibility::{EligibilityReport, EligibilityThresholds};
pub use storage::{Database, StorageError};
