use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::api::errors::{bad_request, forbidden, not_found, storage_error, ApiError, ApiResult};
use crate::api::types::{
    AccountListQuery, AccountView, CreateAccountRequest, MeResponse, UpdateProfileRequest,
};
use crate::api::ApiState;
use crate::auth::{AccountContext, Role};
use crate::listing::{ListParams, Page};
use crate::models::{AccountStatus, MobilizationStatus};
use crate::storage::accounts::{
    AccountFilter, AccountRecord, AccountSummary, NewAccount, ProfileRecord, ProfileUpdate,
    ReservistDetails, StaffDetails, ACCOUNT_SORT_KEYS,
};

use super::{
    ensure_company_exists, list_spec, optional_text, required_text, ADMINISTRATORS, MANAGERS,
};

pub async fn get_me(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<MeResponse> {
    let ctx = state.authenticate(&headers)?;
    let view = account_view(&state, &ctx.account_id)?;
    let unread_notifications = state
        .notifications
        .count_unread(&ctx.account_id)
        .map_err(storage_error)?;

    Ok(Json(MeResponse {
        view,
        company_id: ctx.company_id,
        unread_notifications,
    }))
}

pub async fn update_my_profile(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<ProfileRecord> {
    let ctx = state.authenticate(&headers)?;

    let update = ProfileUpdate {
        first_name: optional_text("first_name", request.first_name.as_deref())?,
        last_name: optional_text("last_name", request.last_name.as_deref())?,
        middle_name: request.middle_name.clone(),
        phone: request.phone.clone(),
    };
    let profile = state
        .accounts
        .update_profile(&ctx.account_id, &update)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "profile.update",
        "account",
        Some(&ctx.account_id),
        json!({
            "first_name": update.first_name,
            "last_name": update.last_name,
            "middle_name": update.middle_name,
            "phone": update.phone,
        }),
    )?;

    Ok(Json(profile))
}

pub async fn create_account(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<CreateAccountRequest>,
) -> ApiResult<AccountView> {
    let ctx = state.authorize(&headers, MANAGERS)?;

    if !ctx.role.can_provision(request.role) {
        return Err(forbidden(
            "forbidden",
            &format!("{} cannot create {} accounts", ctx.role, request.role),
        ));
    }

    let email = required_text("email", &request.email)?.to_ascii_lowercase();
    if !email.contains('@') {
        return Err(bad_request("invalid_email", "email must be a valid address"));
    }
    let id = match request.id.as_deref() {
        Some(id) => required_text("id", id)?,
        None => Uuid::new_v4().to_string(),
    };

    let (staff, reservist) = role_details(&state, &ctx, &request)?;

    let account = NewAccount {
        id,
        email,
        role: request.role,
        first_name: required_text("first_name", &request.first_name)?,
        last_name: required_text("last_name", &request.last_name)?,
        middle_name: request.middle_name.clone(),
        phone: request.phone.clone(),
        staff,
        reservist,
    };
    let record = state.accounts.create(&account).map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "account.create",
        "account",
        Some(&record.id),
        json!({ "email": record.email, "role": record.role }),
    )?;
    info!(actor_id = %ctx.account_id, account_id = %record.id, role = %record.role, "created account");

    Ok(Json(account_view(&state, &record.id)?))
}

/// Validates the role-specific details block. Staff may only place new
/// reservists into their own company.
fn role_details(
    state: &ApiState,
    ctx: &AccountContext,
    request: &CreateAccountRequest,
) -> Result<(Option<StaffDetails>, Option<ReservistDetails>), ApiError> {
    match request.role {
        Role::SuperAdmin | Role::Admin => {
            if request.staff.is_some() || request.reservist.is_some() {
                return Err(bad_request(
                    "invalid_request",
                    "administrator accounts take no staff or reservist details",
                ));
            }
            Ok((None, None))
        }
        Role::Staff => {
            if request.reservist.is_some() {
                return Err(bad_request(
                    "invalid_request",
                    "staff accounts take no reservist details",
                ));
            }
            let details = request.staff.clone().unwrap_or_default();
            if let Some(company_id) = details.company_id.as_deref() {
                ensure_company_exists(state, company_id)?;
            }
            Ok((
                Some(StaffDetails {
                    company_id: details.company_id,
                    position: details.position,
                    employee_no: details.employee_no,
                }),
                None,
            ))
        }
        Role::Reservist => {
            if request.staff.is_some() {
                return Err(bad_request(
                    "invalid_request",
                    "reservist accounts take no staff details",
                ));
            }
            let details = request.reservist.as_ref().ok_or_else(|| {
                bad_request(
                    "invalid_request",
                    "reservist accounts require service_number and rank",
                )
            })?;

            let company_id = if ctx.role == Role::Staff {
                let own = ctx.company_id.clone().ok_or_else(|| {
                    forbidden("company_scope", "staff without a company cannot create reservists")
                })?;
                if details.company_id.as_deref().is_some_and(|requested| requested != own) {
                    return Err(forbidden(
                        "company_scope",
                        "staff can only create reservists in their own company",
                    ));
                }
                Some(own)
            } else {
                details.company_id.clone()
            };
            if let Some(company_id) = company_id.as_deref() {
                ensure_company_exists(state, company_id)?;
            }

            Ok((
                None,
                Some(ReservistDetails {
                    company_id,
                    service_number: required_text("service_number", &details.service_number)?,
                    rank: required_text("rank", &details.rank)?,
                    date_of_rank: details.date_of_rank,
                    branch: details.branch.clone(),
                    mobilization_status: details
                        .mobilization_status
                        .unwrap_or(MobilizationStatus::Ready),
                }),
            ))
        }
    }
}

pub async fn list_accounts(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
    Query(query): Query<AccountListQuery>,
) -> ApiResult<Page<AccountSummary>> {
    state.authorize(&headers, ADMINISTRATORS)?;
    let spec = list_spec(&params, ACCOUNT_SORT_KEYS)?;

    let filter = AccountFilter {
        role: query.role,
        status: query.status,
    };
    let page = state.accounts.list(&filter, &spec).map_err(storage_error)?;
    Ok(Json(page))
}

pub async fn get_account(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<AccountView> {
    let ctx = state.authenticate(&headers)?;
    if !ctx.is_administrator() && ctx.account_id != account_id {
        return Err(forbidden("forbidden", "cannot view other accounts"));
    }
    Ok(Json(account_view(&state, &account_id)?))
}

pub async fn deactivate_account(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<AccountRecord> {
    change_status(&state, &headers, &account_id, AccountStatus::Deactivated).map(Json)
}

pub async fn activate_account(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<AccountRecord> {
    change_status(&state, &headers, &account_id, AccountStatus::Active).map(Json)
}

fn change_status(
    state: &ApiState,
    headers: &HeaderMap,
    account_id: &str,
    status: AccountStatus,
) -> Result<AccountRecord, ApiError> {
    let ctx = state.authorize(headers, ADMINISTRATORS)?;

    if ctx.account_id == account_id {
        return Err(bad_request(
            "cannot_change_own_status",
            "accounts cannot change their own status",
        ));
    }

    let target = state
        .accounts
        .get(account_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("account_not_found", "account not found"))?;

    if !ctx.role.can_provision(target.role) {
        return Err(forbidden(
            "forbidden",
            &format!("{} cannot change the status of {} accounts", ctx.role, target.role),
        ));
    }

    let record = state
        .accounts
        .set_status(account_id, status)
        .map_err(storage_error)?;

    let action = match status {
        AccountStatus::Active => "account.activate",
        AccountStatus::Deactivated => "account.deactivate",
    };
    state.record_audit(&ctx, action, "account", Some(account_id), json!({ "role": target.role }))?;
    info!(actor_id = %ctx.account_id, account_id, status = %status, "changed account status");

    Ok(record)
}

fn account_view(state: &ApiState, account_id: &str) -> Result<AccountView, ApiError> {
    let account = state
        .accounts
        .get(account_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("account_not_found", "account not found"))?;
    let profile = state.accounts.get_profile(account_id).map_err(storage_error)?;

    let (staff, reservist) = match account.role {
        Role::Staff => (
            state.personnel.get_staff(account_id).map_err(storage_error)?,
            None,
        ),
        Role::Reservist => (
            None,
            state.personnel.get_reservist(account_id).map_err(storage_error)?,
        ),
        Role::SuperAdmin | Role::Admin => (None, None),
    };

    Ok(AccountView {
        account,
        profile,
        staff,
        reservist,
    })
}
