use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use super::handlers::{
    accounts, announcements, audit, companies, dashboard, documents, health_check,
    notifications, personnel, rids, training,
};
use super::ApiState;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub fn create_router(state: Arc<ApiState>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/api/me", get(accounts::get_me))
        .route("/api/me/profile", put(accounts::update_my_profile))
        .route(
            "/api/accounts",
            post(accounts::create_account).get(accounts::list_accounts),
        )
        .route("/api/accounts/:account_id", get(accounts::get_account))
        .route(
            "/api/accounts/:account_id/deactivate",
            post(accounts::deactivate_account),
        )
        .route(
            "/api/accounts/:account_id/activate",
            post(accounts::activate_account),
        )
        .route(
            "/api/companies",
            post(companies::create_company).get(companies::list_companies),
        )
        .route(
            "/api/companies/:company_id",
            get(companies::get_company)
                .put(companies::update_company)
                .delete(companies::delete_company),
        )
        .route("/api/staff", get(personnel::list_staff))
        .route("/api/staff/:account_id", put(personnel::update_staff))
        .route("/api/reservists", get(personnel::list_reservists))
        .route(
            "/api/reservists/:account_id",
            get(personnel::get_reservist).put(personnel::update_reservist),
        )
        .route(
            "/api/reservists/:account_id/eligibility",
            get(personnel::reservist_eligibility),
        )
        .route(
            "/api/documents",
            post(documents::create_document).get(documents::list_documents),
        )
        .route(
            "/api/documents/:document_id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route(
            "/api/documents/:document_id/review",
            post(documents::review_document),
        )
        .route(
            "/api/training",
            post(training::create_session).get(training::list_sessions),
        )
        .route(
            "/api/training/:session_id",
            get(training::get_session)
                .put(training::update_session)
                .delete(training::delete_session),
        )
        .route("/api/training/:session_id/register", post(training::register))
        .route(
            "/api/training/:session_id/cancel-registration",
            post(training::cancel_registration),
        )
        .route(
            "/api/training/:session_id/registrations",
            get(training::list_registrations),
        )
        .route(
            "/api/training/:session_id/registrations/:account_id",
            put(training::record_attendance),
        )
        .route(
            "/api/announcements",
            post(announcements::create_announcement).get(announcements::list_announcements),
        )
        .route(
            "/api/announcements/:announcement_id",
            get(announcements::get_announcement)
                .put(announcements::update_announcement)
                .delete(announcements::delete_announcement),
        )
        .route(
            "/api/announcements/:announcement_id/publish",
            post(announcements::publish_announcement),
        )
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
        .route("/api/rids/:account_id", get(rids::get_rids))
        .route(
            "/api/rids/:account_id/sections/:section",
            put(rids::save_section),
        )
        .route("/api/rids/:account_id/submit", post(rids::submit_rids))
        .route("/api/rids/:account_id/review", post(rids::review_rids))
        .route("/api/dashboard", get(dashboard::dashboard))
        .route("/api/audit", get(audit::query_audit_logs))
        .route("/api/audit/:log_id/verify", get(audit::verify_audit_log))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(middleware::from_fn(set_request_id))
        .layer(layers)
}

/// Tags every request and response with an `x-request-id`, keeping one the
/// caller already supplied.
async fn set_request_id(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), header_value);
    }

    let mut response = next.run(request).await;

    if !response.headers().contains_key(&REQUEST_ID_HEADER) {
        if let Ok(header_value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER.clone(), header_value);
        }
    }

    response
}
