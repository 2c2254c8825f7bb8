use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};

use crate::api::errors::{storage_error, ApiError, ApiResult};
use crate::api::types::DashboardResponse;
use crate::api::ApiState;
use crate::auth::Role;
use crate::models::MobilizationStatus;
use crate::storage::training::SessionScope;

const MOBILIZATION_STATUSES: [MobilizationStatus; 3] = [
    MobilizationStatus::Ready,
    MobilizationStatus::Standby,
    MobilizationStatus::Inactive,
];

pub async fn dashboard(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<DashboardResponse> {
    let ctx = state.authenticate(&headers)?;

    let unread_notifications = state
        .notifications
        .count_unread(&ctx.account_id)
        .map_err(storage_error)?;

    let mut response = DashboardResponse {
        role: ctx.role.to_string(),
        scope_company_id: ctx.company_id.clone(),
        unread_notifications,
        ..DashboardResponse::default()
    };

    match ctx.role {
        Role::SuperAdmin | Role::Admin => {
            response.companies = Some(state.companies.count().map_err(storage_error)?);
            response.reservists_by_status = Some(mobilization_counts(&state, None)?);
            response.pending_documents =
                Some(state.documents.count_pending(None).map_err(storage_error)?);
            response.upcoming_training = state
                .training
                .count_upcoming(&SessionScope::All)
                .map_err(storage_error)?;
        }
        Role::Staff => {
            let company_id = ctx.company_id.as_deref();
            if company_id.is_some() {
                response.reservists_by_status = Some(mobilization_counts(&state, company_id)?);
                response.pending_documents = Some(
                    state
                        .documents
                        .count_pending(company_id)
                        .map_err(storage_error)?,
                );
            }
            response.upcoming_training = state
                .training
                .count_upcoming(&SessionScope::Audience(ctx.company_id.clone()))
                .map_err(storage_error)?;
        }
        Role::Reservist => {
            response.upcoming_training = state
                .training
                .count_upcoming(&SessionScope::Audience(ctx.company_id.clone()))
                .map_err(storage_error)?;
        }
    }

    Ok(Json(response))
}

fn mobilization_counts(
    state: &ApiState,
    company_id: Option<&str>,
) -> Result<BTreeMap<String, i64>, ApiError> {
    let mut counts: BTreeMap<String, i64> = MOBILIZATION_STATUSES
        .iter()
        .map(|status| (status.to_string(), 0))
        .collect();
    for (status, count) in state
        .personnel
        .mobilization_breakdown(company_id)
        .map_err(storage_error)?
    {
        counts.insert(status.to_string(), count);
    }
    Ok(counts)
}
