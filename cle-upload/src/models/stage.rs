//! Processing stages and the static stage table
//!
//! Each non-terminal stage owns a slice of the global 0–100 progress bar.
//! Ranges are contiguous and increase in declaration order:
//!
//! ```text
//! uploading 0–15 | upload_complete 15–20 | extracting_text 20–35
//! extracting_clauses 35–55 | rules_detection 55–70 | ai_detection 70–98
//! complete 100
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upload/analysis processing stage
///
/// Ordering follows display order; `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// No session running
    Idle,
    /// Ingest request in flight
    Uploading,
    /// Ingest confirmed; transient before analysis starts
    UploadComplete,
    /// OCR / text extraction (simulated)
    ExtractingText,
    /// Clause segmentation (simulated)
    ExtractingClauses,
    /// Rule-based leakage detection (simulated)
    RulesDetection,
    /// AI leakage detection (simulated)
    AiDetection,
    /// Analysis finished
    Complete,
    /// Ingest or analysis failed
    Error,
}

impl ProcessingStage {
    /// Stages the analyze phase walks through, in order
    pub const ANALYZE_SEQUENCE: [ProcessingStage; 4] = [
        ProcessingStage::ExtractingText,
        ProcessingStage::ExtractingClauses,
        ProcessingStage::RulesDetection,
        ProcessingStage::AiDetection,
    ];

    /// Every stage, in display order
    pub const ALL: [ProcessingStage; 9] = [
        ProcessingStage::Idle,
        ProcessingStage::Uploading,
        ProcessingStage::UploadComplete,
        ProcessingStage::ExtractingText,
        ProcessingStage::ExtractingClauses,
        ProcessingStage::RulesDetection,
        ProcessingStage::AiDetection,
        ProcessingStage::Complete,
        ProcessingStage::Error,
    ];

    /// Snake_case identifier, as serialized
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStage::Idle => "idle",
            ProcessingStage::Uploading => "uploading",
            ProcessingStage::UploadComplete => "upload_complete",
            ProcessingStage::ExtractingText => "extracting_text",
            ProcessingStage::ExtractingClauses => "extracting_clauses",
            ProcessingStage::RulesDetection => "rules_detection",
            ProcessingStage::AiDetection => "ai_detection",
            ProcessingStage::Complete => "complete",
            ProcessingStage::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStage::Complete | ProcessingStage::Error)
    }

    /// Session is doing work (neither idle nor finished)
    pub fn is_processing(self) -> bool {
        !matches!(self, ProcessingStage::Idle) && !self.is_terminal()
    }

    /// Stage belongs to the analyze call's simulated sequence
    pub fn is_analyzing(self) -> bool {
        Self::ANALYZE_SEQUENCE.contains(&self)
    }

    /// Position in the five-step stepper shown by the dashboard
    ///
    /// `UploadComplete` already counts as the first analyze step; `Complete`
    /// is one past the last step. `None` for idle and error.
    pub fn step_index(self) -> Option<usize> {
        match self {
            ProcessingStage::Uploading => Some(0),
            ProcessingStage::UploadComplete | ProcessingStage::ExtractingText => Some(1),
            ProcessingStage::ExtractingClauses => Some(2),
            ProcessingStage::RulesDetection => Some(3),
            ProcessingStage::AiDetection => Some(4),
            ProcessingStage::Complete => Some(5),
            ProcessingStage::Idle | ProcessingStage::Error => None,
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display and timing metadata for one stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageInfo {
    pub stage: ProcessingStage,
    pub label: &'static str,
    pub description: &'static str,
    /// Typical duration; heuristic only
    pub estimated_duration_secs: u32,
    pub progress_range_start: u8,
    pub progress_range_end: u8,
}

const STAGE_TABLE: [StageInfo; 9] = [
    StageInfo {
        stage: ProcessingStage::Idle,
        label: "Ready",
        description: "Waiting for a contract to upload",
        estimated_duration_secs: 0,
        progress_range_start: 0,
        progress_range_end: 0,
    },
    StageInfo {
        stage: ProcessingStage::Uploading,
        label: "Uploading",
        description: "Uploading the contract document",
        estimated_duration_secs: 5,
        progress_range_start: 0,
        progress_range_end: 15,
    },
    StageInfo {
        stage: ProcessingStage::UploadComplete,
        label: "Upload Complete",
        description: "Document stored, starting analysis",
        estimated_duration_secs: 1,
        progress_range_start: 15,
        progress_range_end: 20,
    },
    StageInfo {
        stage: ProcessingStage::ExtractingText,
        label: "Extracting Text",
        description: "Reading text from the document",
        estimated_duration_secs: 10,
        progress_range_start: 20,
        progress_range_end: 35,
    },
    StageInfo {
        stage: ProcessingStage::ExtractingClauses,
        label: "Extracting Clauses",
        description: "Segmenting the contract into clauses",
        estimated_duration_secs: 15,
        progress_range_start: 35,
        progress_range_end: 55,
    },
    StageInfo {
        stage: ProcessingStage::RulesDetection,
        label: "Rules Detection",
        description: "Checking clauses against leakage rules",
        estimated_duration_secs: 10,
        progress_range_start: 55,
        progress_range_end: 70,
    },
    StageInfo {
        stage: ProcessingStage::AiDetection,
        label: "AI Detection",
        description: "Running AI analysis for revenue leakage",
        estimated_duration_secs: 30,
        progress_range_start: 70,
        progress_range_end: 98,
    },
    StageInfo {
        stage: ProcessingStage::Complete,
        label: "Complete",
        description: "Analysis complete",
        estimated_duration_secs: 0,
        progress_range_start: 100,
        progress_range_end: 100,
    },
    StageInfo {
        stage: ProcessingStage::Error,
        label: "Error",
        description: "Processing failed",
        estimated_duration_secs: 0,
        progress_range_start: 0,
        progress_range_end: 0,
    },
];

/// Look up the table entry for `stage`
pub fn stage_info(stage: ProcessingStage) -> &'static StageInfo {
    // Table is laid out in enum declaration order.
    &STAGE_TABLE[stage as usize]
}

/// Sum of estimated durations of every non-terminal stage after `stage`
pub fn estimated_secs_after(stage: ProcessingStage) -> u64 {
    STAGE_TABLE
        .iter()
        .filter(|info| info.stage > stage && info.stage.is_processing())
        .map(|info| u64::from(info.estimated_duration_secs))
        .sum()
}
