//! cle-upload library interface
//!
//! Upload/analysis progress orchestration for the contract dashboard, plus
//! the HTTP surface the dashboard polls.

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, UploadError};

use axum::Router;
use chrono::{DateTime, Utc};
use cle_common::events::EventBus;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::UploadOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The single upload session owner
    pub orchestrator: Arc<UploadOrchestrator>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<UploadOrchestrator>, event_bus: EventBus) -> Self {
        Self {
            orchestrator,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS is permissive: the dashboard is served from a different origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
