//! Error types for lern-curriculum
//!
//! `PipelineError` describes why one unit of work (a linking batch, a
//! validation pair, an audit item) failed; it ends up in the run report.
//! `ApiError` is the HTTP surface.

use crate::oracle::{OracleContractError, OracleError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lern_common::api::auth::AdminAuthError;
use serde_json::json;
use thiserror::Error;

/// Failure of a single pipeline unit
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Oracle call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Oracle response rejected: {0}")]
    Contract(#[from] OracleContractError),

    #[error("Store error: {0}")]
    Store(#[from] lern_common::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No caller identity (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller known but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// lern-common error
    #[error("Common error: {0}")]
    Common(#[from] lern_common::Error),
}

impl From<AdminAuthError> for ApiError {
    fn from(err: AdminAuthError) -> Self {
        match err {
            AdminAuthError::MissingIdentity => ApiError::Unauthorized(err.to_string()),
            AdminAuthError::UnknownUser(_) | AdminAuthError::NotAdmin(_) => {
                ApiError::Forbidden(err.to_string())
            }
            AdminAuthError::DatabaseError(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(lern_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(lern_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
