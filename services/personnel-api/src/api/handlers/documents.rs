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
    bad_request, conflict, forbidden, not_found, storage_conflict, storage_error, ApiError,
    ApiResult,
};
use crate::api::types::{CreateDocumentRequest, DocumentListQuery, ReviewDocumentRequest};
use crate::api::ApiState;
use crate::auth::{AccountContext, Role};
use crate::listing::{ListParams, Page};
use crate::models::DocumentStatus;
use crate::storage::documents::{DocumentFilter, DocumentRecord, DOCUMENT_SORT_KEYS};

use super::{ensure_company_access, list_spec, required_text, MANAGERS};

const UPLOADERS: &[Role] = &[Role::Reservist];

pub async fn create_document(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<CreateDocumentRequest>,
) -> ApiResult<DocumentRecord> {
    let ctx = state.authorize(&headers, UPLOADERS)?;

    let record = DocumentRecord {
        id: Uuid::new_v4().to_string(),
        account_id: ctx.account_id.clone(),
        doc_type: required_text("doc_type", &request.doc_type)?,
        file_name: required_text("file_name", &request.file_name)?,
        storage_path: required_text("storage_path", &request.storage_path)?,
        status: DocumentStatus::Pending,
        notes: request.notes.clone(),
        reviewed_by: None,
        reviewed_at: None,
        created_at: Utc::now().to_rfc3339(),
    };
    state.documents.create(&record).map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "document.create",
        "document",
        Some(&record.id),
        json!({ "doc_type": record.doc_type, "file_name": record.file_name }),
    )?;
    info!(actor_id = %ctx.account_id, document_id = %record.id, "recorded document upload");

    Ok(Json(record))
}

pub async fn list_documents(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult<Page<DocumentRecord>> {
    let ctx = state.authenticate(&headers)?;
    let spec = list_spec(&params, DOCUMENT_SORT_KEYS)?;

    let mut filter = DocumentFilter {
        account_id: query.account_id.clone(),
        company_id: None,
        status: query.status,
        doc_type: query.doc_type.clone(),
    };
    match ctx.role {
        Role::Reservist => filter.account_id = Some(ctx.account_id.clone()),
        Role::Staff => {
            let own = ctx.company_id.clone().ok_or_else(|| {
                forbidden("company_scope", "staff account has no company assignment")
            })?;
            filter.company_id = Some(own);
        }
        Role::SuperAdmin | Role::Admin => {}
    }

    let page = state.documents.list(&filter, &spec).map_err(storage_error)?;
    Ok(Json(page))
}

pub async fn get_document(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> ApiResult<DocumentRecord> {
    let ctx = state.authenticate(&headers)?;
    let document = visible_document(&state, &ctx, &document_id)?;
    Ok(Json(document))
}

pub async fn review_document(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
    Json(request): Json<ReviewDocumentRequest>,
) -> ApiResult<DocumentRecord> {
    let ctx = state.authorize(&headers, MANAGERS)?;

    if request.status == DocumentStatus::Pending {
        return Err(bad_request(
            "invalid_status",
            "review status must be verified or rejected",
        ));
    }
    visible_document(&state, &ctx, &document_id)?;

    let document = state
        .documents
        .review(
            &document_id,
            request.status,
            &ctx.account_id,
            request.notes.as_deref(),
        )
        .map_err(storage_conflict("document_not_pending"))?;

    let message = match &document.notes {
        Some(notes) => format!("Your {} was {}: {}", document.doc_type, document.status, notes),
        None => format!("Your {} was {}", document.doc_type, document.status),
    };
    state
        .notifications
        .notify(&document.account_id, "document", "Document reviewed", &message)
        .map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "document.review",
        "document",
        Some(&document_id),
        json!({ "status": document.status, "notes": document.notes }),
    )?;
    info!(
        actor_id = %ctx.account_id,
        document_id = %document_id,
        status = %document.status,
        "reviewed document"
    );

    Ok(Json(document))
}

pub async fn delete_document(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> ApiResult<Value> {
    let ctx = state.authorize(&headers, UPLOADERS)?;

    let document = state
        .documents
        .get(&document_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("document_not_found", "document not found"))?;
    if document.account_id != ctx.account_id {
        return Err(forbidden("forbidden", "only the owner can delete a document"));
    }
    if document.status != DocumentStatus::Pending {
        return Err(conflict(
            "document_not_pending",
            &format!("document is already {}", document.status),
        ));
    }

    state.documents.delete(&document_id).map_err(storage_error)?;

    state.record_audit(
        &ctx,
        "document.delete",
        "document",
        Some(&document_id),
        json!({ "file_name": document.file_name }),
    )?;
    info!(actor_id = %ctx.account_id, document_id = %document_id, "deleted document");

    Ok(Json(json!({ "status": "deleted", "document_id": document_id })))
}

fn visible_document(
    state: &ApiState,
    ctx: &AccountContext,
    document_id: &str,
) -> Result<DocumentRecord, ApiError> {
    let document = state
        .documents
        .get(document_id)
        .map_err(storage_error)?
        .ok_or_else(|| not_found("document_not_found", "document not found"))?;

    if document.account_id == ctx.account_id {
        return Ok(document);
    }
    if ctx.role == Role::Reservist {
        return Err(forbidden("forbidden", "reservists can only access their own documents"));
    }

    let owner_company = state
        .accounts
        .company_of(&document.account_id)
        .map_err(storage_error)?;
    ensure_company_access(ctx, owner_company.as_deref())?;
    Ok(document)
}
