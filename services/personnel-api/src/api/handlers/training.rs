use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::errors::{
    bad_request, conflict, forbidden, not_found, storage_conflict, storage_error, ApiError,
    ApiResult,
};
use crate::api::types::{
    AttendanceRequest, CreateSessionRequest, SessionListQuery, UpdateSessionRequest,
};
use crate::api::{log_audit, ApiState};
use crate::auth::{AccountContext, Role};
use crate::listing::{ListParams, Page};
use crate::models::{RegistrationStatus, SessionStatus};
use crate::storage::training::{
    RegistrationError, RegistrationRecord, SessionFilter, SessionRecord, SessionScope,
    SessionUpdate, SESSION_SORT_KEYS,
};

use super::{
    ensure_company_access, ensure_company_exists, list_spec, optional_text, required_text,
    MANAGERS,
};

const TRAINEES: &[Role] = &[Role::Reservist];

pub async fn create_session(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<SessionRecord> {
    let ctx = state.authorize(&headers, MANAGERS)?;

    let company_id = owning_company(&ctx, request.company_id.clone())?;
    if let Some(company_id) = company_id.as_deref() {
        ensure_company_exists(&state, company_id)?;
    }
    validate_schedule(request.start_at, request.end_at)?;
    validate_hours(request.hours)?;
    validate_capacity(request.capacity)?;

    let now = Utc::now().to_rfc3339();
    let session = SessionRecord {
        id: Uuid::new_v4().to_string(),
        title: required_text("title", &request.title)?,
        description: request.description.clone(),
        location: request.location.clone(),
        company_id,
        start_at: request.start_at,
        end_at: request.end_at,
        capacity: request.capacity,
        hours: request.hours,
        status: SessionStatus::Scheduled,
        created_by: ctx.account_id.clone(),
        created_at: now.clone(),
        updated_at: now,
    };
    state.training.create_session(&session).map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "training.create",
        "training_session",
        Some(&session.id),
        json!({
            "title": session.title,
            "company_id": session.company_id,
            "start_at": session.start_at,
            "end_at": session.end_at,
        }),
    )?;
    info!(actor_id = %ctx.account_id, session_id = %session.id, "created training session");

    Ok(Json(session))
}

pub async fn list_sessions(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
    Query(query): Query<SessionListQuery>,
) -> ApiResult<Page<SessionRecord>> {
    let ctx = state.authenticate(&headers)?;
    let spec = list_spec(&params, SESSION_SORT_KEYS)?;

    let scope = if ctx.is_administrator() {
        match query.company_id.clone() {
            Some(company_id) => SessionScope::Company(company_id),
            None => SessionScope::All,
        }
    } else {
        SessionScope::Audience(ctx.company_id.clone())
    };

    let filter = SessionFilter {
        scope,
        status: query.status,
        starting_after: query.upcoming.unwrap_or(false).then(Utc::now),
    };
    let page = state
        .training
        .list_sessions(&filter, &spec)
        .map_err(storage_error)?;
    Ok(Json(page))
}

pub async fn get_session(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<SessionRecord> {
    let ctx = state.authenticate(&headers)?;
    let session = load_session(&state, &session_id)?;
    ensure_in_audience(&ctx, &session)?;
    Ok(Json(session))
}

pub async fn update_session(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    Json(request): Json<UpdateSessionRequest>,
) -> ApiResult<SessionRecord> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    let current = load_session(&state, &session_id)?;
    ensure_company_access(&ctx, current.company_id.as_deref())?;

    validate_schedule(
        request.start_at.unwrap_or(current.start_at),
        request.end_at.unwrap_or(current.end_at),
    )?;
    if let Some(hours) = request.hours {
        validate_hours(hours)?;
    }
    validate_capacity(request.capacity)?;

    let update = SessionUpdate {
        title: optional_text("title", request.title.as_deref())?,
        description: request.description.clone(),
        location: request.location.clone(),
        start_at: request.start_at,
        end_at: request.end_at,
        capacity: request.capacity,
        hours: request.hours,
        status: request.status,
    };
    let session = state
        .training
        .update_session(&session_id, &update)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "training.update",
        "training_session",
        Some(&session_id),
        json!({
            "title": update.title,
            "start_at": update.start_at,
            "end_at": update.end_at,
            "capacity": update.capacity,
            "hours": update.hours,
            "status": update.status,
        }),
    )?;
    info!(actor_id = %ctx.account_id, session_id = %session_id, "updated training session");

    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    let current = load_session(&state, &session_id)?;
    ensure_company_access(&ctx, current.company_id.as_deref())?;

    state
        .training
        .delete_session(&session_id)
        .map_err(storage_conflict("session_completed"))?;

    state.record_audit(
        &ctx,
        "training.delete",
        "training_session",
        Some(&session_id),
        json!({ "title": current.title }),
    )?;
    info!(actor_id = %ctx.account_id, session_id = %session_id, "deleted training session");

    Ok(Json(json!({ "status": "deleted", "session_id": session_id })))
}

pub async fn register(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<RegistrationRecord> {
    let ctx = state.authorize(&headers, TRAINEES)?;
    let session = load_session(&state, &session_id)?;
    ensure_in_audience(&ctx, &session)?;

    let audit = state.signed_audit(
        &ctx,
        "training.register",
        "training_session",
        Some(&session_id),
        json!({ "title": session.title }),
    )?;
    let registration = state
        .training
        .register(&session_id, &ctx.account_id, &audit)
        .map_err(registration_error)?;
    log_audit(&audit);

    state
        .notifications
        .notify(
            &ctx.account_id,
            "training",
            "Training registration",
            &format!("You are registered for {}", session.title),
        )
        .map_err(storage_error)?;

    Ok(Json(registration))
}

pub async fn cancel_registration(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let ctx = state.authorize(&headers, TRAINEES)?;

    state
        .training
        .cancel_registration(&session_id, &ctx.account_id)
        .map_err(registration_error)?;

    state.record_audit(
        &ctx,
        "training.cancel_registration",
        "training_session",
        Some(&session_id),
        json!({}),
    )?;

    Ok(Json(json!({ "status": "cancelled", "session_id": session_id })))
}

pub async fn list_registrations(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<Vec<RegistrationRecord>> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    let session = load_session(&state, &session_id)?;
    ensure_company_access(&ctx, session.company_id.as_deref())?;

    let registrations = state
        .training
        .list_registrations(&session_id)
        .map_err(storage_error)?;
    Ok(Json(registrations))
}

pub async fn record_attendance(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path((session_id, account_id)): Path<(String, String)>,
    Json(request): Json<AttendanceRequest>,
) -> ApiResult<RegistrationRecord> {
    let ctx = state.authorize(&headers, MANAGERS)?;

    if !matches!(
        request.status,
        RegistrationStatus::Attended | RegistrationStatus::Absent
    ) {
        return Err(bad_request(
            "invalid_status",
            "attendance must be attended or absent",
        ));
    }
    let session = load_session(&state, &session_id)?;
    ensure_company_access(&ctx, session.company_id.as_deref())?;

    let registration = state
        .training
        .set_attendance(&session_id, &account_id, request.status)
        .map_err(registration_error)?;

    state.record_audit(
        &ctx,
        "training.attendance",
        "training_session",
        Some(&session_id),
        json!({ "account_id": account_id, "status": registration.status }),
    )?;
    info!(
        actor_id = %ctx.account_id,
        session_id = %session_id,
        account_id = %account_id,
        status = %registration.status,
        "recorded attendance"
    );

    Ok(Json(registration))
}

fn load_session(state: &ApiState, session_id: &str) -> Result<SessionRecord, ApiError> {
    state
        .training
        .get_session(session_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("session_not_found", "training session not found"))
}

/// Staff manage sessions of their own company only; administrators may
/// target any company or the whole battalion.
fn owning_company(
    ctx: &AccountContext,
    requested: Option<String>,
) -> Result<Option<String>, ApiError> {
    if ctx.is_administrator() {
        return Ok(requested);
    }
    let own = ctx
        .company_id
        .clone()
        .ok_or_else(|| forbidden("company_scope", "staff account has no company assignment"))?;
    match requested {
        Some(company_id) if company_id != own => Err(forbidden(
            "company_scope",
            "staff can only schedule training for their own company",
        )),
        _ => Ok(Some(own)),
    }
}

/// Battalion-wide sessions are open to everyone; company sessions only to
/// that company.
fn ensure_in_audience(ctx: &AccountContext, session: &SessionRecord) -> Result<(), ApiError> {
    if ctx.is_administrator() {
        return Ok(());
    }
    match session.company_id.as_deref() {
        None => Ok(()),
        Some(company_id) if ctx.company_id.as_deref() == Some(company_id) => Ok(()),
        Some(_) => Err(forbidden(
            "company_scope",
            "training session belongs to another company",
        )),
    }
}

fn validate_schedule(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Result<(), ApiError> {
    if end_at <= start_at {
        return Err(bad_request(
            "invalid_schedule",
            "end_at must be after start_at",
        ));
    }
    Ok(())
}

fn validate_hours(hours: f64) -> Result<(), ApiError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(bad_request("invalid_hours", "hours must be zero or more"));
    }
    Ok(())
}

fn validate_capacity(capacity: Option<u32>) -> Result<(), ApiError> {
    if capacity == Some(0) {
        return Err(bad_request("invalid_capacity", "capacity must be at least 1"));
    }
    Ok(())
}

fn registration_error(err: RegistrationError) -> ApiError {
    match err {
        RegistrationError::SessionClosed(_) => conflict("session_closed", &err.to_string()),
        RegistrationError::SessionFull(_) => conflict("session_full", &err.to_string()),
        RegistrationError::AlreadyRegistered => conflict("already_registered", &err.to_string()),
        RegistrationError::NotRegistered => not_found("not_registered", &err.to_string()),
        RegistrationError::Storage(inner) => storage_error(inner),
    }
}
