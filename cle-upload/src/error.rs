//! Error types for cle-upload
//!
//! Two layers:
//! - [`UploadError`]: orchestrator taxonomy. Ingest/analyze failures are
//!   recorded on the session; only `InvalidTransition` reaches a caller.
//! - [`ApiError`]: HTTP handler errors with their status code mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ProcessingStage;

/// Fallback shown when neither the backend nor the transport gave a message
pub const GENERIC_FAILURE_MESSAGE: &str = "An unknown error occurred";

/// Upload orchestrator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Command issued in a stage that forbids it (e.g. `start` while active)
    #[error("Invalid transition: cannot {command} while {stage}")]
    InvalidTransition {
        command: &'static str,
        stage: ProcessingStage,
    },

    /// The ingest call failed (network, validation, backend rejection)
    #[error("Ingest failed: {0}")]
    IngestFailure(String),

    /// The analyze call failed, including transport timeouts
    #[error("Analyze failed: {0}")]
    AnalyzeFailure(String),
}

impl UploadError {
    /// Message to surface on the session snapshot
    pub fn user_message(&self) -> String {
        match self {
            UploadError::IngestFailure(msg) | UploadError::AnalyzeFailure(msg) => {
                if msg.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    msg.clone()
                }
            }
            other => other.to_string(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., upload already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_maps_to_conflict() {
        let err = UploadError::InvalidTransition {
            command: "start",
            stage: ProcessingStage::Uploading,
        };
        assert_eq!(err.to_string(), "Invalid transition: cannot start while uploading");
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn blank_failures_fall_back_to_generic_message() {
        assert_eq!(
            UploadError::AnalyzeFailure("  ".to_string()).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
        assert_eq!(
            UploadError::IngestFailure("file too large".to_string()).user_message(),
            "file too large"
        );
    }
}
