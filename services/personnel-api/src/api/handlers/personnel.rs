use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::api::errors::{forbidden, not_found, storage_error, ApiResult};
use crate::api::types::{
    EligibilityResponse, ReservistListQuery, StaffListQuery, UpdateReservistRequest,
    UpdateStaffRequest,
};
use crate::api::ApiState;
use crate::auth::Role;
use crate::eligibility::EligibilityInputs;
use crate::listing::{ListParams, Page};
use crate::storage::personnel::{
    ReservistFilter, ReservistRecord, ReservistUpdate, StaffRecord, StaffUpdate,
    RESERVIST_SORT_KEYS, STAFF_SORT_KEYS,
};

use super::{
    ensure_company_access, ensure_company_exists, list_spec, optional_text, visible_reservist,
    ADMINISTRATORS, MANAGERS,
};

pub async fn list_staff(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
    Query(query): Query<StaffListQuery>,
) -> ApiResult<Page<StaffRecord>> {
    state.authorize(&headers, ADMINISTRATORS)?;
    let spec = list_spec(&params, STAFF_SORT_KEYS)?;

    let page = state
        .personnel
        .list_staff(query.company_id.as_deref(), &spec)
        .map_err(storage_error)?;
    Ok(Json(page))
}

pub async fn update_staff(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
    Json(request): Json<UpdateStaffRequest>,
) -> ApiResult<StaffRecord> {
    let ctx = state.authorize(&headers, ADMINISTRATORS)?;

    if let Some(company_id) = request.company_id.as_deref() {
        ensure_company_exists(&state, company_id)?;
    }
    let update = StaffUpdate {
        company_id: request.company_id.clone(),
        position: optional_text("position", request.position.as_deref())?,
        employee_no: optional_text("employee_no", request.employee_no.as_deref())?,
    };
    let record = state
        .personnel
        .update_staff(&account_id, &update)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "staff.update",
        "account",
        Some(&account_id),
        json!({
            "company_id": update.company_id,
            "position": update.position,
            "employee_no": update.employee_no,
        }),
    )?;
    info!(actor_id = %ctx.account_id, account_id = %account_id, "updated staff details");

    Ok(Json(record))
}

pub async fn list_reservists(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
    Query(query): Query<ReservistListQuery>,
) -> ApiResult<Page<ReservistRecord>> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    let spec = list_spec(&params, RESERVIST_SORT_KEYS)?;

    let company_id = if ctx.role == Role::Staff {
        let own = ctx
            .company_id
            .clone()
            .ok_or_else(|| forbidden("company_scope", "staff account has no company assignment"))?;
        Some(own)
    } else {
        query.company_id.clone()
    };

    let filter = ReservistFilter {
        company_id,
        rank: query.rank.clone(),
        mobilization_status: query.mobilization_status,
    };
    let page = state
        .personnel
        .list_reservists(&filter, &spec)
        .map_err(storage_error)?;
    Ok(Json(page))
}

pub async fn get_reservist(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<ReservistRecord> {
    let ctx = state.authenticate(&headers)?;
    Ok(Json(visible_reservist(&state, &ctx, &account_id)?))
}

pub async fn update_reservist(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
    Json(request): Json<UpdateReservistRequest>,
) -> ApiResult<ReservistRecord> {
    let ctx = state.authorize(&headers, MANAGERS)?;

    let current = state
        .personnel
        .get_reservist(&account_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("reservist_not_found", "reservist not found"))?;
    ensure_company_access(&ctx, current.company_id.as_deref())?;

    if let Some(company_id) = request.company_id.as_deref() {
        ensure_company_access(&ctx, Some(company_id))?;
        ensure_company_exists(&state, company_id)?;
    }

    let update = ReservistUpdate {
        company_id: request.company_id.clone(),
        rank: optional_text("rank", request.rank.as_deref())?,
        date_of_rank: request.date_of_rank,
        branch: request.branch.clone(),
        mobilization_status: request.mobilization_status,
    };
    let record = state
        .personnel
        .update_reservist(&account_id, &update)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "reservist.update",
        "account",
        Some(&account_id),
        json!({
            "company_id": update.company_id,
            "rank": update.rank,
            "date_of_rank": update.date_of_rank,
            "branch": update.branch,
            "mobilization_status": update.mobilization_status,
        }),
    )?;
    info!(actor_id = %ctx.account_id, account_id = %account_id, "updated reservist");

    Ok(Json(record))
}

pub async fn reservist_eligibility(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<EligibilityResponse> {
    let ctx = state.authenticate(&headers)?;
    let reservist = visible_reservist(&state, &ctx, &account_id)?;

    let inputs = EligibilityInputs {
        date_of_rank: reservist.date_of_rank,
        attendance: state
            .training
            .attendance_summary(&account_id)
            .map_err(storage_error)?,
        verified_documents: state
            .documents
            .count_verified(&account_id)
            .map_err(storage_error)?,
    };
    let report = state
        .config
        .eligibility
        .evaluate(&inputs, Utc::now().date_naive());

    Ok(Json(EligibilityResponse {
        account_id: reservist.account_id,
        rank: reservist.rank,
        date_of_rank: reservist.date_of_rank,
        report,
    }))
}
