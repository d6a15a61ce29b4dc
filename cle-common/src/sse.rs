//! Server-Sent Events (SSE) utilities
//!
//! Forwards EventBus traffic to an SSE response with periodic heartbeats.

use crate::events::UploadEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Convert a bus event into an SSE frame (`event:` = type name, `data:` = JSON)
pub fn to_sse_event(event: &UploadEvent) -> Option<Event> {
    let event_type = event.event_type();
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event_type).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

/// Stream every event from `rx` to an SSE client
///
/// Lagging clients skip the dropped events and keep streaming; the stream ends
/// when the bus is closed.
pub fn event_bus_sse_stream(
    service_name: &'static str,
    mut rx: broadcast::Receiver<UploadEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(frame) = to_sse_event(&event) {
                        debug!("SSE: Broadcasting {}", event.event_type());
                        yield Ok(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}
