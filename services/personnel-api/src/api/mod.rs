use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub mod errors;
pub mod handlers;
pub mod router;
pub mod types;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use router::create_router;

use crate::auth::{AccountContext, AuthError, Role, TokenVerifier};
use crate::config::PersonnelConfig;
use crate::models::AccountStatus;
use crate::signing::Signer;
use crate::storage::audit::AuditLogEntry;
use crate::storage::{
    AccountStore, AnnouncementStore, AuditStore, CompanyStore, Database, DocumentStore,
    NotificationStore, PersonnelStore, RidsStore, TrainingStore,
};

use errors::{auth_error, forbidden, internal_error, storage_error};

pub struct ApiState {
    pub accounts: AccountStore,
    pub companies: CompanyStore,
    pub personnel: PersonnelStore,
    pub documents: DocumentStore,
    pub training: TrainingStore,
    pub announcements: AnnouncementStore,
    pub notifications: NotificationStore,
    pub rids: RidsStore,
    pub audit: AuditStore,
    pub verifier: TokenVerifier,
    pub signer: Signer,
    pub config: Arc<PersonnelConfig>,
}

impl ApiState {
    pub fn new(config: PersonnelConfig) -> Result<Self> {
        let database = Database::open(&config.data_dir)?;
        Self::with_database(config, database)
    }

    pub fn with_database(config: PersonnelConfig, database: Database) -> Result<Self> {
        let signer = Signer::new(&config.audit_hmac_secret)?;
        let verifier = TokenVerifier::new(&config);

        let state = Self {
            accounts: AccountStore::new(database.clone()),
            companies: CompanyStore::new(database.clone()),
            personnel: PersonnelStore::new(database.clone()),
            documents: DocumentStore::new(database.clone()),
            training: TrainingStore::new(database.clone()),
            announcements: AnnouncementStore::new(database.clone()),
            notifications: NotificationStore::new(database.clone()),
            rids: RidsStore::new(database.clone()),
            audit: AuditStore::new(database),
            verifier,
            signer,
            config: Arc::new(config),
        };

        if let Some(bootstrap) = &state.config.bootstrap_super_admin {
            if state
                .accounts
                .ensure_super_admin(&bootstrap.account_id, &bootstrap.email)?
            {
                info!(account_id = %bootstrap.account_id, "seeded bootstrap super_admin");
            }
        }

        Ok(state)
    }

    /// Resolves the caller from the bearer token. The role always comes from
    /// the account row, never from token claims.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AccountContext, ApiError> {
        let claims = self.verifier.verify_headers(headers).map_err(auth_error)?;

        let account = self
            .accounts
            .get(&claims.sub)
            .map_err(storage_error)?
            .ok_or_else(|| auth_error(AuthError::UnknownAccount(claims.sub.clone())))?;

        if account.status == AccountStatus::Deactivated {
            warn!(account_id = %account.id, "rejected deactivated account");
            return Err(auth_error(AuthError::AccountDeactivated(account.id)));
        }

        let company_id = match account.role {
            Role::Staff | Role::Reservist => {
                self.accounts.company_of(&account.id).map_err(storage_error)?
            }
            Role::SuperAdmin | Role::Admin => None,
        };

        Ok(AccountContext::new(account.id, account.email, account.role).with_company(company_id))
    }

    pub fn authorize(
        &self,
        headers: &HeaderMap,
        roles: &[Role],
    ) -> Result<AccountContext, ApiError> {
        let ctx = self.authenticate(headers)?;
        if !ctx.has_any_role(roles) {
            return Err(forbidden(
                "forbidden",
                &format!("role {} cannot perform this action", ctx.role),
            ));
        }
        Ok(ctx)
    }

    /// Builds and signs an audit entry without storing it. Stores that commit
    /// several rows at once take the entry and write it in their transaction.
    pub fn signed_audit(
        &self,
        actor: &AccountContext,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        details: Value,
    ) -> Result<AuditLogEntry, ApiError> {
        let mut entry = AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            actor_id: actor.account_id.clone(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.map(String::from),
            details,
            created_at: Utc::now().to_rfc3339(),
            signature: String::new(),
        };
        entry.signature = self.signer.sign_audit_log(&entry).map_err(internal_error)?;
        Ok(entry)
    }

    /// Appends a signed entry to the audit trail.
    pub fn record_audit(
        &self,
        actor: &AccountContext,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        details: Value,
    ) -> Result<(), ApiError> {
        let entry = self.signed_audit(actor, action, entity_type, entity_id, details)?;
        self.audit.write(&entry).map_err(storage_error)?;
        log_audit(&entry);
        Ok(())
    }
}

pub(crate) fn log_audit(entry: &AuditLogEntry) {
    info!(
        actor_id = %entry.actor_id,
        action = %entry.action,
        entity_type = %entry.entity_type,
        entity_id = entry.entity_id.as_deref().unwrap_or_default(),
        "recorded audit entry"
    );
}
