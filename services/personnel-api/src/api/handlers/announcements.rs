use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::errors::{
    forbidden, not_found, storage_conflict, storage_error, ApiError, ApiResult,
};
use crate::api::types::{
    AnnouncementListQuery, CreateAnnouncementRequest, PublishResponse, UpdateAnnouncementRequest,
};
use crate::api::{log_audit, ApiState};
use crate::auth::{AccountContext, Role};
use crate::listing::{ListParams, Page};
use crate::models::Priority;
use crate::storage::announcements::{
    AnnouncementFilter, AnnouncementRecord, AnnouncementUpdate, ANNOUNCEMENT_SORT_KEYS,
};

use super::{
    ensure_company_access, ensure_company_exists, list_spec, optional_text, required_text,
    MANAGERS,
};

pub async fn create_announcement(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<CreateAnnouncementRequest>,
) -> ApiResult<AnnouncementRecord> {
    let ctx = state.authorize(&headers, MANAGERS)?;

    let company_id = match (ctx.role, request.company_id.clone()) {
        (Role::Staff, requested) => {
            let own = ctx.company_id.clone().ok_or_else(|| {
                forbidden("company_scope", "staff account has no company assignment")
            })?;
            if requested.as_deref().is_some_and(|c| c != own) {
                return Err(forbidden(
                    "company_scope",
                    "staff can only announce to their own company",
                ));
            }
            Some(own)
        }
        (_, requested) => requested,
    };
    if let Some(company_id) = company_id.as_deref() {
        ensure_company_exists(&state, company_id)?;
    }

    let now = Utc::now().to_rfc3339();
    let record = AnnouncementRecord {
        id: Uuid::new_v4().to_string(),
        title: required_text("title", &request.title)?,
        body: required_text("body", &request.body)?,
        priority: request.priority.unwrap_or(Priority::Normal),
        company_id,
        is_published: false,
        published_at: None,
        created_by: ctx.account_id.clone(),
        created_at: now.clone(),
        updated_at: now,
    };
    state.announcements.create(&record).map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "announcement.create",
        "announcement",
        Some(&record.id),
        json!({
            "title": record.title,
            "priority": record.priority,
            "company_id": record.company_id,
        }),
    )?;
    info!(actor_id = %ctx.account_id, announcement_id = %record.id, "created announcement");

    Ok(Json(record))
}

pub async fn list_announcements(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
    Query(query): Query<AnnouncementListQuery>,
) -> ApiResult<Page<AnnouncementRecord>> {
    let ctx = state.authenticate(&headers)?;

    // Feeds default to most pressing first.
    let mut params = params;
    if params.sort.is_none() && params.order.is_none() {
        params.order = Some("desc".to_string());
    }
    let spec = list_spec(&params, ANNOUNCEMENT_SORT_KEYS)?;

    let manages_requested_company = ctx.role == Role::Staff
        && query.company_id.is_some()
        && query.company_id == ctx.company_id;

    let filter = if ctx.is_administrator() || manages_requested_company {
        AnnouncementFilter {
            audience: None,
            company_id: query.company_id.clone(),
            published: query.published,
            priority: query.priority,
        }
    } else {
        AnnouncementFilter {
            audience: Some(ctx.company_id.clone()),
            company_id: None,
            published: None,
            priority: query.priority,
        }
    };

    let page = state
        .announcements
        .list(&filter, &spec)
        .map_err(storage_error)?;
    Ok(Json(page))
}

pub async fn get_announcement(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(announcement_id): Path<String>,
) -> ApiResult<AnnouncementRecord> {
    let ctx = state.authenticate(&headers)?;
    let record = load_announcement(&state, &announcement_id)?;

    let in_audience = record.is_published
        && (record.company_id.is_none() || record.company_id == ctx.company_id);
    if !in_audience && !ctx.can_access_company(record.company_id.as_deref()) {
        return Err(not_found("announcement_not_found", "announcement not found"));
    }
    Ok(Json(record))
}

pub async fn update_announcement(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(announcement_id): Path<String>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> ApiResult<AnnouncementRecord> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    managed_announcement(&state, &ctx, &announcement_id)?;

    let update = AnnouncementUpdate {
        title: optional_text("title", request.title.as_deref())?,
        body: optional_text("body", request.body.as_deref())?,
        priority: request.priority,
    };
    let record = state
        .announcements
        .update(&announcement_id, &update)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "announcement.update",
        "announcement",
        Some(&announcement_id),
        json!({ "title": update.title, "priority": update.priority }),
    )?;
    info!(actor_id = %ctx.account_id, announcement_id = %announcement_id, "updated announcement");

    Ok(Json(record))
}

pub async fn delete_announcement(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(announcement_id): Path<String>,
) -> ApiResult<Value> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    let record = managed_announcement(&state, &ctx, &announcement_id)?;

    state
        .announcements
        .delete(&announcement_id)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "announcement.delete",
        "announcement",
        Some(&announcement_id),
        json!({ "title": record.title }),
    )?;
    info!(actor_id = %ctx.account_id, announcement_id = %announcement_id, "deleted announcement");

    Ok(Json(json!({ "status": "deleted", "announcement_id": announcement_id })))
}

pub async fn publish_announcement(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(announcement_id): Path<String>,
) -> ApiResult<PublishResponse> {
    let ctx = state.authorize(&headers, MANAGERS)?;
    let record = managed_announcement(&state, &ctx, &announcement_id)?;

    let recipients = state
        .accounts
        .active_audience(record.company_id.as_deref())
        .map_err(storage_error)?;
    let audit = state.signed_audit(
        &ctx,
        "announcement.publish",
        "announcement",
        Some(&announcement_id),
        json!({ "company_id": record.company_id, "recipients": recipients.len() }),
    )?;
    let announcement = state
        .announcements
        .publish(&announcement_id, &recipients, &audit)
        .map_err(storage_conflict("already_published"))?;
    log_audit(&audit);

    Ok(Json(PublishResponse {
        announcement,
        notified: recipients.len(),
    }))
}

fn load_announcement(state: &ApiState, announcement_id: &str) -> Result<AnnouncementRecord, ApiError> {
    state
        .announcements
        .get(announcement_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("announcement_not_found", "announcement not found"))
}

/// Staff may only manage announcements aimed at their own company.
fn managed_announcement(
    state: &ApiState,
    ctx: &AccountContext,
    announcement_id: &str,
) -> Result<AnnouncementRecord, ApiError> {
    let record = load_announcement(state, announcement_id)?;
    ensure_company_access(ctx, record.company_id.as_deref())?;
    Ok(record)
}
