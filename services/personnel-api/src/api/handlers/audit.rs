use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};

use crate::api::errors::{
    bad_request, internal_error, not_found, storage_error, ApiError, ApiResult,
};
use crate::api::types::{AuditLogsResponse, AuditQuery, VerifyAuditResponse};
use crate::api::ApiState;
use crate::auth::Role;
use crate::signing::SIGNATURE_ALGORITHM;
use crate::storage::audit::{AuditFilter, DEFAULT_AUDIT_LIMIT};

const AUDITORS: &[Role] = &[Role::SuperAdmin];
const MAX_AUDIT_LIMIT: usize = 1000;

pub async fn query_audit_logs(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> ApiResult<AuditLogsResponse> {
    state.authorize(&headers, AUDITORS)?;

    let start_time = normalize_timestamp("start_time", query.start_time.as_deref())?;
    let end_time = normalize_timestamp("end_time", query.end_time.as_deref())?;

    let filter = AuditFilter {
        actor_id: query.actor_id.clone(),
        entity_type: query.entity_type.clone(),
        action: query.action.clone(),
        start_time,
        end_time,
        limit: Some(
            query
                .limit
                .unwrap_or(DEFAULT_AUDIT_LIMIT)
                .clamp(1, MAX_AUDIT_LIMIT),
        ),
    };

    let logs = state.audit.query(&filter).map_err(storage_error)?;
    Ok(Json(AuditLogsResponse { logs }))
}

pub async fn verify_audit_log(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(log_id): Path<String>,
) -> ApiResult<VerifyAuditResponse> {
    state.authorize(&headers, AUDITORS)?;

    let entry = state
        .audit
        .get(&log_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("audit_log_not_found", "audit log entry not found"))?;
    let valid = state.signer.verify_audit_log(&entry).map_err(internal_error)?;

    Ok(Json(VerifyAuditResponse {
        id: entry.id,
        valid,
        algorithm: SIGNATURE_ALGORITHM,
    }))
}

/// Stored entries carry UTC RFC 3339 stamps, so bounds are rewritten into the
/// same shape before the text comparison.
fn normalize_timestamp(field: &str, raw: Option<&str>) -> Result<Option<String>, ApiError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc).to_rfc3339())
            .map_err(|e| {
                bad_request(
                    "invalid_timestamp",
                    &format!("{field} must be valid RFC3339 format: {e}"),
                )
            })
    })
    .transpose()
}
