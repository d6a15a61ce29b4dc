//! Time-based progress estimation
//!
//! The backend reports only "started" and "finished" for each call, so
//! progress inside a call is inferred from elapsed time:
//! - [`map_stage_progress`] interpolates within one stage's range
//! - [`AnalyzeStageStrategy`] picks which analyze sub-stage is "probably"
//!   running from the time spent in the analyze call
//!
//! Heuristic values never reach a stage's upper bound; only a real completion
//! event may certify a stage as done.

use crate::models::{ProcessingStage, StageInfo};
use cle_common::{Error, Result};

/// Floor for estimated durations so zero-length stages don't divide by zero
pub const DURATION_EPSILON_SECS: f64 = 0.001;

/// Percentage for `info` after `time_within_stage` seconds in that stage
///
/// Linear interpolation over the stage's range, capped one below the range
/// end.
pub fn map_stage_progress(info: &StageInfo, time_within_stage: f64) -> u8 {
    let duration = f64::from(info.estimated_duration_secs).max(DURATION_EPSILON_SECS);
    let fraction = (time_within_stage.max(0.0) / duration).min(1.0);

    let start = f64::from(info.progress_range_start);
    let span = f64::from(info.progress_range_end.saturating_sub(info.progress_range_start));
    let percentage = (start + span * fraction).round() as u8;

    percentage.min(info.progress_range_end.saturating_sub(1))
}

/// Simulated analyze sub-stage at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedStage {
    pub stage: ProcessingStage,
    /// Seconds since the simulated stage began
    pub time_within_stage: u64,
}

/// Maps time spent inside the analyze call to the sub-stage to display
///
/// Swappable so a backend that emits real progress can replace the
/// guesswork without touching the session state machine.
pub trait AnalyzeStageStrategy: Send + Sync {
    /// `phase_elapsed`: whole seconds since the analyze call was issued.
    /// Should return one of [`ProcessingStage::ANALYZE_SEQUENCE`] (the session
    /// ignores anything else) and be non-decreasing in `phase_elapsed`.
    fn simulated_stage(&self, phase_elapsed: u64) -> SimulatedStage;
}

/// Fixed time thresholds between analyze sub-stages
///
/// With the default `[10, 25, 35]`:
/// `<10s` extracting text, `<25s` extracting clauses, `<35s` rules
/// detection, then AI detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdSchedule {
    thresholds: [u64; 3],
}

impl ThresholdSchedule {
    /// Thresholds must be positive and strictly increasing
    pub fn new(thresholds: [u64; 3]) -> Result<Self> {
        let [a, b, c] = thresholds;
        if a == 0 || a >= b || b >= c {
            return Err(Error::InvalidInput(format!(
                "analyze thresholds must be positive and strictly increasing: {:?}",
                thresholds
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> [u64; 3] {
        self.thresholds
    }
}

impl Default for ThresholdSchedule {
    fn default() -> Self {
        Self {
            thresholds: [10, 25, 35],
        }
    }
}

impl AnalyzeStageStrategy for ThresholdSchedule {
    fn simulated_stage(&self, phase_elapsed: u64) -> SimulatedStage {
        let index = self
            .thresholds
            .iter()
            .take_while(|&&t| phase_elapsed >= t)
            .count();
        let stage_start = if index == 0 { 0 } else { self.thresholds[index - 1] };

        SimulatedStage {
            stage: ProcessingStage::ANALYZE_SEQUENCE[index],
            time_within_stage: phase_elapsed - stage_start,
        }
    }
}
