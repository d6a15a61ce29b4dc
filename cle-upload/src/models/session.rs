//! Upload session state machine
//!
//! IDLE → UPLOADING → UPLOAD_COMPLETE → EXTRACTING_TEXT → EXTRACTING_CLAUSES
//! → RULES_DETECTION → AI_DETECTION → COMPLETE, with ERROR reachable from any
//! processing stage.
//!
//! The session is pure state: no timers, no I/O. The orchestrator feeds it
//! clock ticks (whole seconds since the session started) and the settlement
//! of the ingest and analyze calls. Every transition method checks the
//! current stage and returns `InvalidTransition` instead of corrupting state,
//! which makes late or duplicate events harmless.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::UploadError;
use crate::models::stage::{estimated_secs_after, stage_info};
use crate::models::{AnalysisSummary, ProcessingStage};
use crate::services::progress_mapper::{map_stage_progress, AnalyzeStageStrategy};

/// Stage change record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_stage: ProcessingStage,
    pub new_stage: ProcessingStage,
    pub transitioned_at: DateTime<Utc>,
}

/// One upload-through-analysis attempt
#[derive(Debug, Clone)]
pub struct Session {
    session_id: Uuid,
    generation: u64,
    current_stage: ProcessingStage,
    contract_name: Option<String>,
    upload_progress: u8,
    analyze_progress: u8,
    /// Whole seconds since `begin_upload`
    elapsed_time: u64,
    /// `elapsed_time` when the current stage was entered
    stage_entered_at: u64,
    /// `elapsed_time` when the analyze call was issued
    analyze_started_at: Option<u64>,
    error: Option<String>,
    contract_id: Option<String>,
    analysis_summary: Option<AnalysisSummary>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

/// Read-only copy of a session for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub generation: u64,
    pub current_stage: ProcessingStage,
    pub stage_label: &'static str,
    pub stage_description: &'static str,
    /// Position in the dashboard's five-step stepper
    pub step_index: Option<usize>,
    pub contract_name: Option<String>,
    pub upload_progress: u8,
    pub analyze_progress: u8,
    /// 100 when complete, otherwise the larger of the two phase values
    pub overall_progress: u8,
    pub elapsed_time: u64,
    /// Heuristic; 0 when idle or finished
    pub estimated_remaining_seconds: u64,
    pub is_processing: bool,
    pub error: Option<String>,
    pub contract_id: Option<String>,
    pub analysis_summary: Option<AnalysisSummary>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::idle()
    }
}

impl Session {
    /// Fresh idle session; every field at its default
    pub fn idle() -> Self {
        Self {
            session_id: Uuid::nil(),
            generation: 0,
            current_stage: ProcessingStage::Idle,
            contract_name: None,
            upload_progress: 0,
            analyze_progress: 0,
            elapsed_time: 0,
            stage_entered_at: 0,
            analyze_started_at: None,
            error: None,
            contract_id: None,
            analysis_summary: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_stage(&self) -> ProcessingStage {
        self.current_stage
    }

    pub fn upload_progress(&self) -> u8 {
        self.upload_progress
    }

    pub fn analyze_progress(&self) -> u8 {
        self.analyze_progress
    }

    pub fn elapsed_time(&self) -> u64 {
        self.elapsed_time
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn contract_id(&self) -> Option<&str> {
        self.contract_id.as_deref()
    }

    pub fn analysis_summary(&self) -> Option<&AnalysisSummary> {
        self.analysis_summary.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.current_stage.is_terminal()
    }

    pub fn is_processing(&self) -> bool {
        self.current_stage.is_processing()
    }

    /// IDLE → UPLOADING
    pub fn begin_upload(
        &mut self,
        generation: u64,
        contract_name: &str,
    ) -> Result<StateTransition, UploadError> {
        self.require("start", |s| s == ProcessingStage::Idle)?;

        *self = Self::idle();
        self.session_id = Uuid::new_v4();
        self.generation = generation;
        self.contract_name = Some(contract_name.to_string());
        self.started_at = Some(Utc::now());

        Ok(self.transition_to(ProcessingStage::Uploading))
    }

    /// Clock tick: advance heuristic progress and the simulated analyze stage
    ///
    /// Returns the stage change caused by the tick, if any. Ticks outside a
    /// processing stage are ignored.
    pub fn apply_tick(
        &mut self,
        elapsed_secs: u64,
        strategy: &dyn AnalyzeStageStrategy,
        analyze_ceiling: u8,
    ) -> Option<StateTransition> {
        if !self.is_processing() {
            return None;
        }
        self.elapsed_time = self.elapsed_time.max(elapsed_secs);

        match self.current_stage {
            ProcessingStage::Uploading => {
                let estimate = map_stage_progress(
                    stage_info(ProcessingStage::Uploading),
                    self.elapsed_time as f64,
                );
                self.upload_progress = self.upload_progress.max(estimate);
                None
            }
            stage if stage.is_analyzing() => {
                let baseline = self.analyze_started_at.unwrap_or(self.elapsed_time);
                let simulated =
                    strategy.simulated_stage(self.elapsed_time.saturating_sub(baseline));
                // Only a settled analyze call may leave the analyze sequence.
                if !simulated.stage.is_analyzing() {
                    tracing::warn!(
                        stage = %simulated.stage,
                        "Ignoring simulated stage outside the analyze sequence"
                    );
                    return None;
                }

                let transition = if simulated.stage > self.current_stage {
                    Some(self.transition_to(simulated.stage))
                } else {
                    None
                };

                let estimate = map_stage_progress(
                    stage_info(simulated.stage),
                    simulated.time_within_stage as f64,
                )
                .min(analyze_ceiling);
                self.analyze_progress = self.analyze_progress.max(estimate);
                transition
            }
            _ => None,
        }
    }

    /// UPLOADING → UPLOAD_COMPLETE → EXTRACTING_TEXT
    ///
    /// The ingest call certified the upload: upload progress jumps to the end
    /// of the upload-complete range and the analyze phase clock starts now.
    pub fn complete_ingest(
        &mut self,
        contract_id: String,
        elapsed_secs: u64,
    ) -> Result<Vec<StateTransition>, UploadError> {
        self.require("complete ingest", |s| s == ProcessingStage::Uploading)?;

        self.elapsed_time = self.elapsed_time.max(elapsed_secs);
        self.upload_progress = stage_info(ProcessingStage::UploadComplete).progress_range_end;
        self.contract_id = Some(contract_id);
        self.analyze_started_at = Some(self.elapsed_time);

        Ok(vec![
            self.transition_to(ProcessingStage::UploadComplete),
            self.transition_to(ProcessingStage::ExtractingText),
        ])
    }

    /// UPLOADING → ERROR; upload progress keeps its value at failure time
    pub fn fail_ingest(&mut self, failure: &UploadError) -> Result<StateTransition, UploadError> {
        self.require("fail ingest", |s| s == ProcessingStage::Uploading)?;
        Ok(self.enter_error(failure.user_message()))
    }

    /// analyze stage → COMPLETE
    pub fn complete_analysis(
        &mut self,
        summary: AnalysisSummary,
    ) -> Result<StateTransition, UploadError> {
        self.require("complete analysis", ProcessingStage::is_analyzing)?;

        self.analyze_progress = 100;
        self.analysis_summary = Some(summary);
        self.ended_at = Some(Utc::now());
        Ok(self.transition_to(ProcessingStage::Complete))
    }

    /// analyze stage → ERROR; analyze progress resets to 0
    pub fn fail_analysis(&mut self, failure: &UploadError) -> Result<StateTransition, UploadError> {
        self.require("fail analysis", ProcessingStage::is_analyzing)?;
        self.analyze_progress = 0;
        Ok(self.enter_error(failure.user_message()))
    }

    /// Heuristic seconds left: rest of the current stage plus later stages
    pub fn estimated_remaining_seconds(&self) -> u64 {
        if !self.is_processing() {
            return 0;
        }
        let current = u64::from(stage_info(self.current_stage).estimated_duration_secs);
        let spent = self.elapsed_time.saturating_sub(self.stage_entered_at);
        current.saturating_sub(spent) + estimated_secs_after(self.current_stage)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let info = stage_info(self.current_stage);
        let overall_progress = if self.current_stage == ProcessingStage::Complete {
            100
        } else {
            self.upload_progress.max(self.analyze_progress)
        };

        SessionSnapshot {
            session_id: self.session_id,
            generation: self.generation,
            current_stage: self.current_stage,
            stage_label: info.label,
            stage_description: info.description,
            step_index: self.current_stage.step_index(),
            contract_name: self.contract_name.clone(),
            upload_progress: self.upload_progress,
            analyze_progress: self.analyze_progress,
            overall_progress,
            elapsed_time: self.elapsed_time,
            estimated_remaining_seconds: self.estimated_remaining_seconds(),
            is_processing: self.is_processing(),
            error: self.error.clone(),
            contract_id: self.contract_id.clone(),
            analysis_summary: self.analysis_summary.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    fn enter_error(&mut self, message: String) -> StateTransition {
        self.error = Some(message);
        self.ended_at = Some(Utc::now());
        self.transition_to(ProcessingStage::Error)
    }

    fn require(
        &self,
        command: &'static str,
        allowed: impl Fn(ProcessingStage) -> bool,
    ) -> Result<(), UploadError> {
        if allowed(self.current_stage) {
            Ok(())
        } else {
            Err(UploadError::InvalidTransition {
                command,
                stage: self.current_stage,
            })
        }
    }

    fn transition_to(&mut self, new_stage: ProcessingStage) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_stage: self.current_stage,
            new_stage,
            transitioned_at: Utc::now(),
        };
        self.current_stage = new_stage;
        self.stage_entered_at = self.elapsed_time;
        transition
    }
}
