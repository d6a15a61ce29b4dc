//! Contract upload inputs and analysis results

use serde::{Deserialize, Serialize};

/// File payload handed to the ingest call
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Build a payload, guessing the MIME type from the file extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Everything `start` needs to run one upload-through-analysis attempt
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: UploadFile,
    /// Display name of the contract
    pub contract_name: String,
    /// Operator email recorded as the uploader
    pub submitted_by: String,
    /// Free-form contract metadata (counterparty, dates, value...)
    pub metadata: Option<serde_json::Value>,
}

/// Result of a successful ingest call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub contract_id: String,
}

/// Findings count per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(rename = "CRITICAL", default)]
    pub critical: u32,
    #[serde(rename = "HIGH", default)]
    pub high: u32,
    #[serde(rename = "MEDIUM", default)]
    pub medium: u32,
    #[serde(rename = "LOW", default)]
    pub low: u32,
}

impl SeverityCounts {
    pub fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low
    }
}

/// Summary produced by a successful analyze call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub clause_count: u32,
    pub finding_count: u32,
    pub findings_by_severity: SeverityCounts,
    pub processing_duration_seconds: f64,
}
