use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::api::errors::{storage_error, ApiResult};
use crate::api::types::{MarkAllReadResponse, NotificationQuery, NotificationsResponse};
use crate::api::ApiState;

const DEFAULT_NOTIFICATION_LIMIT: u32 = 50;
const MAX_NOTIFICATION_LIMIT: u32 = 200;

pub async fn list_notifications(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<NotificationsResponse> {
    let ctx = state.authenticate(&headers)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
        .clamp(1, MAX_NOTIFICATION_LIMIT);
    let items = state
        .notifications
        .list(&ctx.account_id, query.unread_only.unwrap_or(false), limit)
        .map_err(storage_error)?;
    let unread = state
        .notifications
        .count_unread(&ctx.account_id)
        .map_err(storage_error)?;

    Ok(Json(NotificationsResponse { items, unread }))
}

pub async fn mark_read(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> ApiResult<Value> {
    let ctx = state.authenticate(&headers)?;

    state
        .notifications
        .mark_read(&ctx.account_id, &notification_id)
        .map_err(storage_error)?;
    state.record_audit(
        &ctx,
        "notification.read",
        "notification",
        Some(&notification_id),
        json!({}),
    )?;

    Ok(Json(json!({ "status": "read", "notification_id": notification_id })))
}

pub async fn mark_all_read(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<MarkAllReadResponse> {
    let ctx = state.authenticate(&headers)?;

    let updated = state
        .notifications
        .mark_all_read(&ctx.account_id)
        .map_err(storage_error)?;
    state.record_audit(
        &ctx,
        "notification.read_all",
        "notification",
        None,
        json!({ "updated": updated }),
    )?;

    Ok(Json(MarkAllReadResponse { updated }))
}
