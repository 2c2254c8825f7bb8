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
    conflict_with_details, internal_error, not_found, storage_error, ApiResult,
};
use crate::api::types::{
    CompanyDetailResponse, CompanyListQuery, CreateCompanyRequest, UpdateCompanyRequest,
};
use crate::api::ApiState;
use crate::auth::Role;
use crate::listing::{ListParams, Page};
use crate::storage::companies::{
    CompanyDeleteError, CompanyRecord, CompanyUpdate, COMPANY_SORT_KEYS,
};

use super::{list_spec, optional_text, required_text, MANAGERS};

const COMPANY_ADMINS: &[Role] = &[Role::SuperAdmin];

pub async fn create_company(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<CreateCompanyRequest>,
) -> ApiResult<CompanyRecord> {
    let ctx = state.authorize(&headers, COMPANY_ADMINS)?;

    let now = Utc::now().to_rfc3339();
    let record = CompanyRecord {
        id: Uuid::new_v4().to_string(),
        code: required_text("code", &request.code)?.to_ascii_uppercase(),
        name: required_text("name", &request.name)?,
        description: request.description.clone(),
        is_active: request.is_active.unwrap_or(true),
        created_at: now.clone(),
        updated_at: now,
    };
    state.companies.create(&record).map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "company.create",
        "company",
        Some(&record.id),
        json!({ "code": record.code, "name": record.name }),
    )?;
    info!(actor_id = %ctx.account_id, company_id = %record.id, code = %record.code, "created company");

    Ok(Json(record))
}

pub async fn list_companies(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
    Query(query): Query<CompanyListQuery>,
) -> ApiResult<Page<CompanyRecord>> {
    state.authorize(&headers, MANAGERS)?;
    let spec = list_spec(&params, COMPANY_SORT_KEYS)?;

    let page = state
        .companies
        .list(query.is_active, &spec)
        .map_err(storage_error)?;
    Ok(Json(page))
}

pub async fn get_company(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(company_id): Path<String>,
) -> ApiResult<CompanyDetailResponse> {
    state.authorize(&headers, MANAGERS)?;

    let company = state
        .companies
        .get(&company_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("company_not_found", "company not found"))?;
    let dependents = state
        .companies
        .dependents(&company_id)
        .map_err(storage_error)?;

    Ok(Json(CompanyDetailResponse::new(company, &dependents)))
}

pub async fn update_company(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(company_id): Path<String>,
    Json(request): Json<UpdateCompanyRequest>,
) -> ApiResult<CompanyRecord> {
    let ctx = state.authorize(&headers, COMPANY_ADMINS)?;

    let update = CompanyUpdate {
        code: optional_text("code", request.code.as_deref())?.map(|c| c.to_ascii_uppercase()),
        name: optional_text("name", request.name.as_deref())?,
        description: request.description.clone(),
        is_active: request.is_active,
    };
    let record = state
        .companies
        .update(&company_id, &update)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "company.update",
        "company",
        Some(&company_id),
        json!({
            "code": update.code,
            "name": update.name,
            "description": update.description,
            "is_active": update.is_active,
        }),
    )?;
    info!(actor_id = %ctx.account_id, company_id = %company_id, "updated company");

    Ok(Json(record))
}

pub async fn delete_company(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(company_id): Path<String>,
) -> ApiResult<Value> {
    let ctx = state.authorize(&headers, COMPANY_ADMINS)?;

    match state.companies.delete(&company_id) {
        Ok(()) => {}
        Err(CompanyDeleteError::HasDependents(dependents)) => {
            let details = serde_json::to_value(dependents).map_err(internal_error)?;
            return Err(conflict_with_details(
                "company_has_dependents",
                "company still has assigned personnel, sessions or announcements",
                details,
            ));
        }
        Err(CompanyDeleteError::Storage(err)) => return Err(storage_error(err)),
    }

    state.record_audit(&ctx, "company.delete", "company", Some(&company_id), json!({}))?;
    info!(actor_id = %ctx.account_id, company_id = %company_id, "deleted company");

    Ok(Json(json!({ "status": "deleted", "company_id": company_id })))
}
