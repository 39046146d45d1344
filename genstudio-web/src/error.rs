//! Error types for genstudio-web

use crate::remote::RemoteError;
use crate::services::{ArchiveError, JobRegistryError, SpreadsheetError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. cancelling a finished job
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upload over the body limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Well-formed request whose content cannot be processed (422)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Remote generative service failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Map a remote failure to a user-facing message
    pub fn upstream(context: &str, err: &RemoteError) -> Self {
        if err.is_invalid_api_key() {
            ApiError::Upstream("API key is invalid. Please check your Gemini API key.".to_string())
        } else if err.is_rate_limited() {
            ApiError::Upstream("API quota exceeded. Please try again later.".to_string())
        } else {
            ApiError::Upstream(format!("An error occurred during {}: {}", context, err))
        }
    }
}

impl From<SpreadsheetError> for ApiError {
    fn from(err: SpreadsheetError) -> Self {
        match err {
            SpreadsheetError::ColumnNotFound { .. } => ApiError::Unprocessable(err.to_string()),
            SpreadsheetError::Read(_) | SpreadsheetError::Empty => {
                ApiError::BadRequest(err.to_string())
            }
            SpreadsheetError::Write(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JobRegistryError> for ApiError {
    fn from(err: JobRegistryError) -> Self {
        match err {
            JobRegistryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            JobRegistryError::AlreadyTerminal { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Empty => ApiError::NotFound(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg)
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, message = %message, "Request failed");
        }

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
