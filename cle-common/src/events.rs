//! Event types for the upload progress event system
//!
//! Provides the shared event definitions and the EventBus used to push
//! orchestrator activity to SSE subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Upload orchestrator events
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// Stages travel as their snake_case names so this crate stays independent
/// of the orchestrator's stage enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UploadEvent {
    /// A new upload session left the idle state
    SessionStarted {
        session_id: Uuid,
        generation: u64,
        contract_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Emitted on every clock tick while a session is processing
    ///
    /// Triggers:
    /// - SSE: Update progress bar, elapsed and remaining time
    ProgressUpdate {
        session_id: Uuid,
        stage: String,
        upload_progress: u8,
        analyze_progress: u8,
        elapsed_seconds: u64,
        estimated_remaining_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// Current stage changed (real or simulated)
    StageChanged {
        session_id: Uuid,
        old_stage: String,
        new_stage: String,
        timestamp: DateTime<Utc>,
    },

    /// Backend accepted the file and assigned a contract identifier
    ContractIngested {
        session_id: Uuid,
        contract_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Analysis finished; progress is at 100%
    SessionCompleted {
        session_id: Uuid,
        contract_id: String,
        clause_count: u32,
        finding_count: u32,
        processing_duration_seconds: f64,
        timestamp: DateTime<Utc>,
    },

    /// Ingest or analyze failed; session is in the error stage
    SessionFailed {
        session_id: Uuid,
        stage: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Session discarded and replaced by a fresh idle session
    SessionReset {
        previous_session_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },

    /// Display delay elapsed after completion; the UI may navigate away
    HandoffReady {
        session_id: Uuid,
        contract_id: String,
        /// Dashboard route for the analyzed contract
        redirect_path: String,
        timestamp: DateTime<Utc>,
    },
}

impl UploadEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            UploadEvent::SessionStarted { .. } => "SessionStarted",
            UploadEvent::ProgressUpdate { .. } => "ProgressUpdate",
            UploadEvent::StageChanged { .. } => "StageChanged",
            UploadEvent::ContractIngested { .. } => "ContractIngested",
            UploadEvent::SessionCompleted { .. } => "SessionCompleted",
            UploadEvent::SessionFailed { .. } => "SessionFailed",
            UploadEvent::SessionReset { .. } => "SessionReset",
            UploadEvent::HandoffReady { .. } => "HandoffReady",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the orchestrator)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UploadEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use cle_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress updates are fire-and-forget: nobody watching is fine.
    pub fn emit_lossy(&self, event: UploadEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset_event() -> UploadEvent {
        UploadEvent::SessionReset {
            previous_session_id: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bus = EventBus::new(10);
        bus.emit_lossy(reset_event());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        let session_id = Uuid::new_v4();
        bus.emit_lossy(UploadEvent::ContractIngested {
            session_id,
            contract_id: "c-1".to_string(),
            timestamp: Utc::now(),
        });
        bus.emit_lossy(reset_event());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "ContractIngested");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.event_type(), "SessionReset");
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = UploadEvent::StageChanged {
            session_id: Uuid::nil(),
            old_stage: "uploading".to_string(),
            new_stage: "extracting_text".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StageChanged");
        assert_eq!(json["new_stage"], "extracting_text");
    }
}
