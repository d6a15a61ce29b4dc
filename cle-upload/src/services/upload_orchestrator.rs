//! Upload/analyze orchestrator
//!
//! Drives one session at a time through ingest then analyze:
//!
//! ```text
//! start ──► clock.start, ingest ──ok──► analyze ──ok──► complete ──delay──► hand-off
//!                          └─err─► error          └─err─► error
//! ```
//!
//! # Concurrency
//! Three kinds of tokio task touch the session: the clock's tick task, the
//! pipeline task awaiting the backend, and the deferred hand-off. All of them
//! go through one mutex that is never held across an `.await`.
//!
//! # Staleness
//! Every `start` and `reset` bumps a generation counter. Each task captures
//! the generation it was spawned for and drops its result if the counter has
//! moved on, so an ingest or analyze call that outlives its session can never
//! touch the next one. Network calls themselves are not cancelled.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::UploadError;
use crate::models::{
    AnalysisSummary, ProcessingStage, Session, SessionSnapshot, StateTransition, UploadRequest,
};
use crate::services::contract_client::ContractBackend;
use crate::services::elapsed_clock::ElapsedClock;
use crate::services::progress_mapper::{AnalyzeStageStrategy, ThresholdSchedule};
use cle_common::config::ProgressConfig;
use cle_common::events::{EventBus, UploadEvent};
use cle_common::human_time::format_clock;

/// Invoked once with the contract identifier after a successful analysis
pub type CompletionCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Timing knobs for the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub tick_interval: Duration,
    pub handoff_delay: Duration,
    pub analyze_ceiling: u8,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&ProgressConfig::default())
    }
}

impl From<&ProgressConfig> for OrchestratorSettings {
    fn from(config: &ProgressConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            handoff_delay: Duration::from_millis(config.handoff_delay_ms),
            analyze_ceiling: config.analyze_ceiling,
        }
    }
}

/// Mutable state behind the lock
struct Shared {
    generation: u64,
    session: Session,
    clock: ElapsedClock,
    handoff: Option<CancellationToken>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Tear down every local timer (clock and pending hand-off)
    fn stop_timers(&mut self) {
        self.clock.stop();
        if let Some(token) = self.handoff.take() {
            token.cancel();
        }
    }
}

struct Inner {
    backend: Arc<dyn ContractBackend>,
    strategy: Arc<dyn AnalyzeStageStrategy>,
    settings: OrchestratorSettings,
    event_bus: EventBus,
    on_complete: Option<CompletionCallback>,
    shared: Mutex<Shared>,
}

/// Upload/analyze orchestrator
///
/// Owns exactly one [`Session`]. The presentation layer polls
/// [`snapshot`](Self::snapshot) and issues `start` / `reset`.
pub struct UploadOrchestrator {
    inner: Arc<Inner>,
}

/// Builder for [`UploadOrchestrator`]
pub struct UploadOrchestratorBuilder {
    backend: Arc<dyn ContractBackend>,
    event_bus: EventBus,
    settings: OrchestratorSettings,
    strategy: Arc<dyn AnalyzeStageStrategy>,
    on_complete: Option<CompletionCallback>,
}

impl UploadOrchestratorBuilder {
    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the default threshold schedule
    pub fn strategy(mut self, strategy: Arc<dyn AnalyzeStageStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> UploadOrchestrator {
        let clock = ElapsedClock::new(self.settings.tick_interval);
        UploadOrchestrator {
            inner: Arc::new(Inner {
                backend: self.backend,
                strategy: self.strategy,
                settings: self.settings,
                event_bus: self.event_bus,
                on_complete: self.on_complete,
                shared: Mutex::new(Shared {
                    generation: 0,
                    session: Session::idle(),
                    clock,
                    handoff: None,
                }),
            }),
        }
    }
}

impl UploadOrchestrator {
    pub fn builder(backend: Arc<dyn ContractBackend>, event_bus: EventBus) -> UploadOrchestratorBuilder {
        UploadOrchestratorBuilder {
            backend,
            event_bus,
            settings: OrchestratorSettings::default(),
            strategy: Arc::new(ThresholdSchedule::default()),
            on_complete: None,
        }
    }

    /// Begin a new upload-through-analysis session
    ///
    /// Fails with `InvalidTransition` (leaving the current session untouched)
    /// unless the orchestrator is idle; call [`reset`](Self::reset) after a
    /// finished or failed session. Must be called within a tokio runtime.
    pub fn start(&self, request: UploadRequest) -> Result<Uuid, UploadError> {
        let mut shared = self.inner.lock();
        let stage = shared.session.current_stage();
        if stage != ProcessingStage::Idle {
            tracing::warn!(stage = %stage, "Rejected start: session already active");
            return Err(UploadError::InvalidTransition {
                command: "start",
                stage,
            });
        }

        shared.generation += 1;
        let generation = shared.generation;
        let transition = shared
            .session
            .begin_upload(generation, &request.contract_name)?;
        let session_id = shared.session.session_id();

        let weak = Arc::downgrade(&self.inner);
        shared.clock.start(move |elapsed| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_tick(generation, elapsed);
            }
        });

        tracing::info!(
            session_id = %session_id,
            generation,
            contract_name = %request.contract_name,
            file = %request.file.file_name,
            size_bytes = request.file.size_bytes(),
            "Upload session started"
        );
        self.inner.event_bus.emit_lossy(UploadEvent::SessionStarted {
            session_id,
            generation,
            contract_name: request.contract_name.clone(),
            timestamp: Utc::now(),
        });
        self.inner.emit_transitions(std::slice::from_ref(&transition));
        drop(shared);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_pipeline(generation, request).await;
        });

        Ok(session_id)
    }

    /// Discard the current session and return to idle
    ///
    /// Always succeeds. Local timers stop immediately; in-flight backend
    /// calls keep running but their results are ignored.
    pub fn reset(&self) {
        let mut shared = self.inner.lock();
        shared.stop_timers();
        shared.generation += 1;

        let previous = shared.session.session_id();
        let previous_session_id = (!previous.is_nil()).then_some(previous);
        shared.session = Session::idle();

        tracing::info!(
            previous_session_id = ?previous_session_id,
            generation = shared.generation,
            "Upload session reset"
        );
        self.inner.event_bus.emit_lossy(UploadEvent::SessionReset {
            previous_session_id,
            timestamp: Utc::now(),
        });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().session.snapshot()
    }

    pub fn current_stage(&self) -> ProcessingStage {
        self.inner.lock().session.current_stage()
    }

    pub fn upload_progress(&self) -> u8 {
        self.inner.lock().session.upload_progress()
    }

    pub fn analyze_progress(&self) -> u8 {
        self.inner.lock().session.analyze_progress()
    }

    pub fn elapsed_time(&self) -> u64 {
        self.inner.lock().session.elapsed_time()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().session.error().map(str::to_string)
    }

    pub fn contract_id(&self) -> Option<String> {
        self.inner.lock().session.contract_id().map(str::to_string)
    }

    pub fn analysis_summary(&self) -> Option<AnalysisSummary> {
        self.inner.lock().session.analysis_summary().cloned()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock().session.is_processing()
    }

    /// Whether the elapsed-time clock is currently ticking
    pub fn is_clock_running(&self) -> bool {
        self.inner.lock().clock.is_running()
    }
}

impl Drop for UploadOrchestrator {
    fn drop(&mut self) {
        self.inner.lock().stop_timers();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        // Session updates are single assignments; a panic elsewhere cannot
        // leave it half-written, so a poisoned lock is still usable.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_pipeline(self: Arc<Self>, generation: u64, request: UploadRequest) {
        let contract_id = match self.backend.ingest(&request).await {
            Ok(receipt) => {
                if !self.settle_ingest(generation, receipt.contract_id.clone()) {
                    return;
                }
                receipt.contract_id
            }
            Err(e) => {
                self.settle_failure(generation, UploadError::IngestFailure(e.user_message()));
                return;
            }
        };

        match self.backend.analyze(&contract_id).await {
            Ok(summary) => self.settle_analysis(generation, contract_id, summary),
            Err(e) => {
                self.settle_failure(generation, UploadError::AnalyzeFailure(e.user_message()))
            }
        }
    }

    fn handle_tick(&self, generation: u64, elapsed: u64) {
        let mut shared = self.lock();
        if !shared.is_current(generation) || !shared.session.is_processing() {
            return;
        }

        let transition =
            shared
                .session
                .apply_tick(elapsed, self.strategy.as_ref(), self.settings.analyze_ceiling);
        if let Some(transition) = transition {
            self.emit_transitions(&[transition]);
        }

        let session = &shared.session;
        tracing::debug!(
            session_id = %session.session_id(),
            stage = %session.current_stage(),
            upload = session.upload_progress(),
            analyze = session.analyze_progress(),
            elapsed = %format_clock(session.elapsed_time()),
            "Progress tick"
        );
        self.event_bus.emit_lossy(UploadEvent::ProgressUpdate {
            session_id: session.session_id(),
            stage: session.current_stage().to_string(),
            upload_progress: session.upload_progress(),
            analyze_progress: session.analyze_progress(),
            elapsed_seconds: session.elapsed_time(),
            estimated_remaining_seconds: session.estimated_remaining_seconds(),
            timestamp: Utc::now(),
        });
    }

    /// Returns whether the pipeline should go on to analyze
    fn settle_ingest(&self, generation: u64, contract_id: String) -> bool {
        let mut shared = self.lock();
        if !shared.is_current(generation) {
            tracing::warn!(generation, contract_id = %contract_id, "Discarding stale ingest result");
            return false;
        }

        let elapsed = shared.clock.elapsed_secs();
        match shared.session.complete_ingest(contract_id.clone(), elapsed) {
            Ok(transitions) => {
                let session_id = shared.session.session_id();
                tracing::info!(
                    session_id = %session_id,
                    contract_id = %contract_id,
                    elapsed = %format_clock(elapsed),
                    "Ingest complete, starting analysis"
                );
                self.event_bus.emit_lossy(UploadEvent::ContractIngested {
                    session_id,
                    contract_id,
                    timestamp: Utc::now(),
                });
                self.emit_transitions(&transitions);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring ingest result");
                false
            }
        }
    }

    fn settle_analysis(self: &Arc<Self>, generation: u64, contract_id: String, summary: AnalysisSummary) {
        let mut shared = self.lock();
        if !shared.is_current(generation) {
            tracing::warn!(generation, contract_id = %contract_id, "Discarding stale analysis result");
            return;
        }

        let transition = match shared.session.complete_analysis(summary.clone()) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring analysis result");
                return;
            }
        };
        shared.clock.stop();

        let session_id = shared.session.session_id();
        tracing::info!(
            session_id = %session_id,
            contract_id = %contract_id,
            clauses = summary.clause_count,
            findings = summary.finding_count,
            elapsed = %format_clock(shared.session.elapsed_time()),
            "Analysis complete"
        );
        self.emit_transitions(&[transition]);
        self.event_bus.emit_lossy(UploadEvent::SessionCompleted {
            session_id,
            contract_id: contract_id.clone(),
            clause_count: summary.clause_count,
            finding_count: summary.finding_count,
            processing_duration_seconds: summary.processing_duration_seconds,
            timestamp: Utc::now(),
        });

        let token = CancellationToken::new();
        shared.handoff = Some(token.clone());
        drop(shared);

        let weak = Arc::downgrade(self);
        let delay = self.settings.handoff_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => fire_handoff(weak, generation, contract_id),
            }
        });
    }

    fn settle_failure(&self, generation: u64, failure: UploadError) {
        let mut shared = self.lock();
        if !shared.is_current(generation) {
            tracing::warn!(generation, error = %failure, "Discarding stale failure");
            return;
        }

        let result = match failure {
            UploadError::IngestFailure(_) => shared.session.fail_ingest(&failure),
            _ => shared.session.fail_analysis(&failure),
        };
        let transition = match result {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring failure");
                return;
            }
        };
        shared.clock.stop();

        let session = &shared.session;
        tracing::error!(
            session_id = %session.session_id(),
            stage = %transition.old_stage,
            error = %failure,
            "Upload session failed"
        );
        self.emit_transitions(&[transition.clone()]);
        self.event_bus.emit_lossy(UploadEvent::SessionFailed {
            session_id: session.session_id(),
            stage: transition.old_stage.to_string(),
            error: session.error().unwrap_or_default().to_string(),
            timestamp: Utc::now(),
        });
    }

    fn emit_transitions(&self, transitions: &[StateTransition]) {
        for t in transitions {
            tracing::debug!(
                session_id = %t.session_id,
                from = %t.old_stage,
                to = %t.new_stage,
                "Stage transition"
            );
            self.event_bus.emit_lossy(UploadEvent::StageChanged {
                session_id: t.session_id,
                old_stage: t.old_stage.to_string(),
                new_stage: t.new_stage.to_string(),
                timestamp: t.transitioned_at,
            });
        }
    }
}

/// Deliver the completion hand-off, at most once per session
fn fire_handoff(weak: Weak<Inner>, generation: u64, contract_id: String) {
    let Some(inner) = weak.upgrade() else {
        return;
    };

    let session_id = {
        let mut shared = inner.lock();
        let still_complete = shared.is_current(generation)
            && shared.session.current_stage() == ProcessingStage::Complete;
        if !still_complete || shared.handoff.take().is_none() {
            return;
        }
        shared.session.session_id()
    };

    tracing::info!(session_id = %session_id, contract_id = %contract_id, "Handing off completed contract");
    inner.event_bus.emit_lossy(UploadEvent::HandoffReady {
        session_id,
        contract_id: contract_id.clone(),
        redirect_path: format!("/contract/{}", contract_id),
        timestamp: Utc::now(),
    });

    // Outside the lock: the callback may read the orchestrator.
    if let Some(callback) = &inner.on_complete {
        callback(contract_id);
    }
}
