//! API error types and handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use classfold::{ClassfoldError, ErrorKind};
use serde::Serialize;
use tracing::error;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from client.
    BadRequest(String),
    /// Internal server error.
    Internal(String),
    /// Error from the classfold library.
    Classfold(ClassfoldError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => {
                error!(message = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
            ApiError::Classfold(e) => match (e.kind(), e.as_violation()) {
                (_, Some(violation)) => {
                    (StatusCode::BAD_REQUEST, violation.code(), violation.to_string())
                }
                (ErrorKind::InvalidInput, None) => {
                    (StatusCode::BAD_REQUEST, "invalid_input", e.to_string())
                }
                (ErrorKind::NotFound, None) => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
                (ErrorKind::Internal, None) => {
                    error!(error = %e, "internal error");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
                }
            },
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<ClassfoldError> for ApiError {
    fn from(err: ClassfoldError) -> Self {
        ApiError::Classfold(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Classfold(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApiError {}
