//! Server-Sent Events for upload progress streaming

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /upload/events - SSE event stream for upload progress
///
/// Streams SessionStarted, ProgressUpdate, StageChanged, ContractIngested,
/// SessionCompleted, SessionFailed, SessionReset and HandoffReady.
pub async fn upload_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    cle_common::sse::event_bus_sse_stream("cle-upload", state.event_bus.subscribe())
}
