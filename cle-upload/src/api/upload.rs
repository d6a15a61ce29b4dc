//! Upload workflow API handlers
//!
//! POST /upload/start, POST /upload/reset, GET /upload/status, GET /upload/events

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, UploadError};
use crate::models::{ProcessingStage, SessionSnapshot, UploadFile, UploadRequest};
use crate::AppState;
use cle_common::human_time::{format_clock, format_remaining};

/// POST /upload/start request
#[derive(Debug, Deserialize)]
pub struct StartUploadRequest {
    /// Contract document on the dashboard host
    pub file_path: String,
    pub contract_name: String,
    pub uploaded_by: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// POST /upload/start response
#[derive(Debug, Serialize)]
pub struct StartUploadResponse {
    pub session_id: Uuid,
    pub stage: ProcessingStage,
}

/// GET /upload/status response
#[derive(Debug, Serialize)]
pub struct UploadStatusResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    /// Elapsed time as `M:SS`
    pub elapsed_display: String,
    /// Remaining estimate as `~M:SS left`, absent unless processing
    pub remaining_display: Option<String>,
}

/// POST /upload/reset response
#[derive(Debug, Serialize)]
pub struct ResetUploadResponse {
    pub stage: ProcessingStage,
}

/// POST /upload/start
///
/// Returns 409 if a session is not idle, 400 if the path is not a file.
/// Otherwise reads the document and starts the session; 202 Accepted, the
/// upload itself runs in the background.
pub async fn start_upload(
    State(state): State<AppState>,
    Json(request): Json<StartUploadRequest>,
) -> ApiResult<(StatusCode, Json<StartUploadResponse>)> {
    if request.contract_name.trim().is_empty() {
        return Err(ApiError::BadRequest("contract_name is required".to_string()));
    }
    if request.uploaded_by.trim().is_empty() {
        return Err(ApiError::BadRequest("uploaded_by is required".to_string()));
    }

    // Checked before any file I/O; `start` below remains authoritative.
    let stage = state.orchestrator.current_stage();
    if stage != ProcessingStage::Idle {
        return Err(UploadError::InvalidTransition {
            command: "start",
            stage,
        }
        .into());
    }

    let path = std::path::Path::new(&request.file_path);
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::BadRequest(format!(
            "File does not exist: {}",
            request.file_path
        )));
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| request.file_path.clone());
    let bytes = tokio::fs::read(path).await?;

    let session_id = state.orchestrator.start(UploadRequest {
        file: UploadFile::new(file_name, bytes),
        contract_name: request.contract_name,
        submitted_by: request.uploaded_by,
        metadata: request.metadata,
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartUploadResponse {
            session_id,
            stage: state.orchestrator.current_stage(),
        }),
    ))
}

/// GET /upload/status
///
/// Poll the current session snapshot.
pub async fn get_upload_status(State(state): State<AppState>) -> Json<UploadStatusResponse> {
    let snapshot = state.orchestrator.snapshot();
    tracing::debug!(stage = %snapshot.current_stage, "Status query");

    let remaining_display = snapshot
        .is_processing
        .then(|| format_remaining(snapshot.estimated_remaining_seconds));

    Json(UploadStatusResponse {
        elapsed_display: format_clock(snapshot.elapsed_time),
        remaining_display,
        snapshot,
    })
}

/// POST /upload/reset
///
/// Discard the session. Always succeeds.
pub async fn reset_upload(State(state): State<AppState>) -> Json<ResetUploadResponse> {
    state.orchestrator.reset();
    Json(ResetUploadResponse {
        stage: state.orchestrator.current_stage(),
    })
}

/// Build upload workflow routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload/start", post(start_upload))
        .route("/upload/reset", post(reset_upload))
        .route("/upload/status", get(get_upload_status))
        .route("/upload/events", get(super::sse::upload_event_stream))
}
