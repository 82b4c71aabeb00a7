//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use member_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Member store error.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::DuplicateMember(_) => (StatusCode::CONFLICT, err.to_string()),
        StoreError::MemberNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::MissingCounterRow => {
            // Data-integrity condition that survived even a recalculation.
            tracing::error!("member count row missing and could not be rebuilt");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "count is unavailable".to_string(),
            )
        }
        // Storage errors are never exposed verbatim to clients.
        StoreError::Database(_) | StoreError::Migration(_) => {
            tracing::error!(error = %err, "storage unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "service unavailable".to_string(),
            )
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
