use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::errors::{
    bad_request, bad_request_with_details, internal_error, storage_conflict, storage_error,
    ApiResult,
};
use crate::api::types::{RidsDecision, RidsResponse, RidsReviewRequest};
use crate::api::ApiState;
use crate::models::RidsStatus;
use crate::rids::{completeness, validate_section, RidsError, RidsSection};
use crate::storage::rids::RidsRecord;

use super::{visible_reservist, MANAGERS};

pub async fn get_rids(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<RidsResponse> {
    let ctx = state.authenticate(&headers)?;
    visible_reservist(&state, &ctx, &account_id)?;

    let record = state.rids.get_or_empty(&account_id).map_err(storage_error)?;
    Ok(Json(with_completeness(record)))
}

pub async fn save_section(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path((account_id, section)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> ApiResult<RidsResponse> {
    let ctx = state.authenticate(&headers)?;
    visible_reservist(&state, &ctx, &account_id)?;

    let section: RidsSection = section
        .parse()
        .map_err(|err: RidsError| bad_request("unknown_section", &err.to_string()))?;
    validate_section(section, &payload)
        .map_err(|err| bad_request("invalid_section", &err.to_string()))?;

    let record = state
        .rids
        .save_section(&account_id, section, payload)
        .map_err(storage_conflict("rids_locked"))?;

    state.record_audit(
        &ctx,
        "rids.save_section",
        "rids",
        Some(&account_id),
        json!({ "section": section }),
    )?;
    info!(actor_id = %ctx.account_id, account_id = %account_id, section = %section, "saved RIDS section");

    Ok(Json(with_completeness(record)))
}

pub async fn submit_rids(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<RidsResponse> {
    let ctx = state.authenticate(&headers)?;
    visible_reservist(&state, &ctx, &account_id)?;

    let current = state.rids.get_or_empty(&account_id).map_err(storage_error)?;
    let report = completeness(&current.sections);
    if !report.complete {
        let details = serde_json::to_value(&report.missing).map_err(internal_error)?;
        return Err(bad_request_with_details(
            "rids_incomplete",
            "required RIDS sections are incomplete",
            details,
        ));
    }

    let record = state
        .rids
        .transition(
            &account_id,
            &[RidsStatus::Draft, RidsStatus::Returned],
            RidsStatus::Submitted,
            None,
            None,
        )
        .map_err(storage_conflict("invalid_status_transition"))?;

    state.record_audit(&ctx, "rids.submit", "rids", Some(&account_id), json!({}))?;
    info!(actor_id = %ctx.account_id, account_id = %account_id, "submitted RIDS");

    Ok(Json(with_completeness(record)))
}

pub async fn review_rids(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
    Json(request): Json<RidsReviewRequest>,
) -> ApiResult<RidsResponse> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    visible_reservist(&state, &ctx, &account_id)?;

    let remarks = request
        .remarks
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let target = match request.decision {
        RidsDecision::Approve => RidsStatus::Approved,
        RidsDecision::Return => {
            if remarks.is_none() {
                return Err(bad_request(
                    "remarks_required",
                    "returning a RIDS requires remarks",
                ));
            }
            RidsStatus::Returned
        }
    };

    let record = state
        .rids
        .transition(
            &account_id,
            &[RidsStatus::Submitted],
            target,
            Some(&ctx.account_id),
            remarks,
        )
        .map_err(storage_conflict("invalid_status_transition"))?;

    let message = match remarks {
        Some(remarks) => format!("Your RIDS was {}: {}", record.status, remarks),
        None => format!("Your RIDS was {}", record.status),
    };
    state
        .notifications
        .notify(&account_id, "rids", "RIDS reviewed", &message)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "rids.review",
        "rids",
        Some(&account_id),
        json!({ "status": record.status, "remarks": record.remarks }),
    )?;
    info!(actor_id = %ctx.account_id, account_id = %account_id, status = %record.status, "reviewed RIDS");

    Ok(Json(with_completeness(record)))
}

fn with_completeness(record: RidsRecord) -> RidsResponse {
    let completeness = completeness(&record.sections);
    RidsResponse {
        record,
        completeness,
    }
}
