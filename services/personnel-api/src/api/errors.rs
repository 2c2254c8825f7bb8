use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::auth::AuthError;
use crate::listing::ListingError;
use crate::storage::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<Value>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<Value>,
) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details,
        }),
    )
}

pub fn bad_request(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, code, message, None)
}

pub fn bad_request_with_details(code: &str, message: &str, details: Value) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, code, message, Some(details))
}

pub fn unauthorized(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::UNAUTHORIZED, code, message, None)
}

pub fn forbidden(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::FORBIDDEN, code, message, None)
}

pub fn not_found(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, code, message, None)
}

pub fn conflict(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::CONFLICT, code, message, None)
}

pub fn conflict_with_details(code: &str, message: &str, details: Value) -> ApiError {
    error_response(StatusCode::CONFLICT, code, message, Some(details))
}

pub fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    error!(error = %err, "internal error");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error",
        None,
    )
}

pub fn auth_error(err: AuthError) -> ApiError {
    match err {
        AuthError::MissingAuthHeader | AuthError::MalformedAuthHeader => {
            unauthorized("missing_token", &err.to_string())
        }
        AuthError::InvalidToken(_) => unauthorized("invalid_token", &err.to_string()),
        AuthError::UnknownAccount(_) => forbidden("account_not_registered", &err.to_string()),
        AuthError::AccountDeactivated(_) => forbidden("account_deactivated", &err.to_string()),
        AuthError::UnknownRole(_) => internal_error(err),
    }
}

pub fn storage_error(err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound { .. } => not_found("not_found", &err.to_string()),
        StorageError::Conflict(message) => conflict("conflict", &message),
        other => internal_error(other),
    }
}

/// Like [`storage_error`], but reports conflicts under a specific code.
pub fn storage_conflict(code: &'static str) -> impl Fn(StorageError) -> ApiError {
    move |err| match err {
        StorageError::Conflict(message) => conflict(code, &message),
        other => storage_error(other),
    }
}

pub fn listing_error(err: ListingError) -> ApiError {
    let code = match err {
        ListingError::InvalidSort { .. } => "invalid_sort",
        ListingError::InvalidOrder(_) => "invalid_order",
        ListingError::InvalidPage => "invalid_page",
    };
    bad_request(code, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_http_statuses() {
        let (status, body) = storage_error(StorageError::not_found("company", "alpha"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "not_found");

        let (status, body) = storage_error(StorageError::Conflict("taken".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "taken");

        let (status, body) = storage_error(StorageError::ConnectionPoisoned);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.is_none());
    }

    #[test]
    fn deactivated_accounts_are_forbidden_not_unauthorized() {
        let (status, body) = auth_error(AuthError::AccountDeactivated("r1".into()));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, "account_deactivated");

        let (status, _) = auth_error(AuthError::MissingAuthHeader);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
