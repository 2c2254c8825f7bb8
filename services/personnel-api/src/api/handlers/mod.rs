use axum::Json;

use crate::auth::{AccountContext, Role};
use crate::listing::{ListParams, ListSpec, SortKey};
use crate::storage::personnel::ReservistRecord;

use super::errors::{bad_request, forbidden, listing_error, not_found, storage_error, ApiError};
use super::types::HealthResponse;
use super::ApiState;

pub mod accounts;
pub mod announcements;
pub mod audit;
pub mod companies;
pub mod dashboard;
pub mod documents;
pub mod notifications;
pub mod personnel;
pub mod rids;
pub mod training;

pub const ADMINISTRATORS: &[Role] = &[Role::SuperAdmin, Role::Admin];
pub const MANAGERS: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::Staff];

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "personnel-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn list_spec(params: &ListParams, sort_keys: &[SortKey]) -> Result<ListSpec, ApiError> {
    params.resolve(sort_keys).map_err(listing_error)
}

/// Trims `value` and rejects it when blank.
fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request(
            "invalid_request",
            &format!("{field} cannot be empty"),
        ));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, ApiError> {
    value.map(|v| required_text(field, v)).transpose()
}

fn ensure_company_access(ctx: &AccountContext, company_id: Option<&str>) -> Result<(), ApiError> {
    if ctx.can_access_company(company_id) {
        Ok(())
    } else {
        Err(forbidden(
            "company_scope",
            "records of another company are out of scope",
        ))
    }
}

fn ensure_company_exists(state: &ApiState, company_id: &str) -> Result<(), ApiError> {
    if state.companies.exists(company_id).map_err(storage_error)? {
        Ok(())
    } else {
        Err(bad_request(
            "unknown_company",
            &format!("company {company_id} does not exist"),
        ))
    }
}

/// Loads a reservist the caller may see: reservists themselves, staff of the
/// same company, and administrators.
fn visible_reservist(
    state: &ApiState,
    ctx: &AccountContext,
    account_id: &str,
) -> Result<ReservistRecord, ApiError> {
    if ctx.role == Role::Reservist && ctx.account_id != account_id {
        return Err(forbidden("forbidden", "reservists can only access their own records"));
    }

    let reservist = state
        .personnel
        .get_reservist(account_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("reservist_not_found", "reservist not found"))?;

    if ctx.role != Role::Reservist {
        ensure_company_access(ctx, reservist.company_id.as_deref())?;
    }
    Ok(reservist)
}
