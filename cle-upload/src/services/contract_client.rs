//! Contract analysis backend client
//!
//! The orchestrator only needs two opaque calls from the backend:
//! - `POST {base}/upload_contract` (multipart) → contract identifier
//! - `POST {base}/analyze_contract/{id}` → analysis summary
//!
//! [`ContractBackend`] is the seam; [`HttpContractBackend`] is the reqwest
//! implementation used in production.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::error::GENERIC_FAILURE_MESSAGE;
use crate::models::{AnalysisSummary, IngestReceipt, SeverityCounts, UploadRequest};
use cle_common::config::BackendConfig;

const USER_AGENT: &str = concat!("cle-upload/", env!("CARGO_PKG_VERSION"));

/// Backend client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connection, timeout, or request construction failure
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Success status but an unreadable body
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Text suitable for the operator: backend detail first, then the
    /// transport message, then a generic fallback
    pub fn user_message(&self) -> String {
        let message = match self {
            BackendError::Network(msg) | BackendError::Parse(msg) => msg,
            BackendError::Api { message, .. } => message,
        };
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message.clone()
        }
    }

    /// Build an `Api` error from a failed response body
    ///
    /// The backend's error body is `{ error, details?, status_code }`;
    /// `details` is preferred because `error` is usually a generic title.
    /// Anything else (proxy HTML, empty body) is reduced to the status line.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let from_body = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|parsed| {
                parsed
                    .details
                    .filter(|d| !d.trim().is_empty())
                    .or(parsed.error.filter(|e| !e.trim().is_empty()))
            });
        let message =
            from_body.unwrap_or_else(|| format!("Request failed with status code {}", status));
        BackendError::Api { status, message }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network(err.to_string())
    }
}

/// The two long-running backend operations
#[async_trait]
pub trait ContractBackend: Send + Sync {
    /// Store the document and create the contract record
    async fn ingest(&self, request: &UploadRequest) -> Result<IngestReceipt, BackendError>;

    /// Run text extraction, clause segmentation, rules and AI detection
    async fn analyze(&self, contract_id: &str) -> Result<AnalysisSummary, BackendError>;
}

/// Generic backend error body
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// POST /upload_contract response
#[derive(Debug, Deserialize)]
struct UploadContractResponse {
    contract_id: String,
}

/// POST /analyze_contract/{id} response
#[derive(Debug, Deserialize)]
struct AnalyzeContractResponse {
    total_clauses_extracted: u32,
    total_findings: u32,
    #[serde(default)]
    findings_by_severity: SeverityCounts,
    #[serde(default)]
    processing_time_seconds: f64,
}

impl From<AnalyzeContractResponse> for AnalysisSummary {
    fn from(r: AnalyzeContractResponse) -> Self {
        AnalysisSummary {
            clause_count: r.total_clauses_extracted,
            finding_count: r.total_findings,
            findings_by_severity: r.findings_by_severity,
            processing_duration_seconds: r.processing_time_seconds,
        }
    }
}

/// reqwest-backed [`ContractBackend`]
pub struct HttpContractBackend {
    http_client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpContractBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http_client.post(self.url(path));
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = BackendError::from_response_body(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), error = %err, "Backend request failed");
            return Err(err);
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    fn upload_form(request: &UploadRequest) -> Result<Form, BackendError> {
        let file_part = Part::bytes(request.file.bytes.clone())
            .file_name(request.file.file_name.clone())
            .mime_str(&request.file.content_type)
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("contract_name", request.contract_name.clone())
            .text("uploaded_by", request.submitted_by.clone());

        if let Some(metadata) = &request.metadata {
            let json = serde_json::to_string(metadata)
                .map_err(|e| BackendError::Parse(e.to_string()))?;
            form = form.text("metadata", json);
        }
        Ok(form)
    }
}

#[async_trait]
impl ContractBackend for HttpContractBackend {
    async fn ingest(&self, request: &UploadRequest) -> Result<IngestReceipt, BackendError> {
        tracing::debug!(
            file = %request.file.file_name,
            size_bytes = request.file.size_bytes(),
            "Uploading contract"
        );

        let response = self
            .post("upload_contract")
            .multipart(Self::upload_form(request)?)
            .send()
            .await?;
        let body: UploadContractResponse = Self::read_json(response).await?;

        tracing::info!(contract_id = %body.contract_id, "Contract uploaded");
        Ok(IngestReceipt {
            contract_id: body.contract_id,
        })
    }

    async fn analyze(&self, contract_id: &str) -> Result<AnalysisSummary, BackendError> {
        tracing::debug!(contract_id = %contract_id, "Requesting contract analysis");

        let response = self
            .post(&format!("analyze_contract/{}", contract_id))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let body: AnalyzeContractResponse = Self::read_json(response).await?;

        tracing::info!(
            contract_id = %contract_id,
            clauses = body.total_clauses_extracted,
            findings = body.total_findings,
            "Contract analysis finished"
        );
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_prefers_details() {
        let err = BackendError::from_response_body(
            413,
            r#"{"error":"Upload rejected","details":"file too large","status_code":413}"#,
        );
        assert_eq!(
            err,
            BackendError::Api {
                status: 413,
                message: "file too large".to_string()
            }
        );
        assert_eq!(err.user_message(), "file too large");
    }

    #[test]
    fn error_body_without_details_uses_error() {
        let err = BackendError::from_response_body(
            500,
            r#"{"error":"Analysis failed","status_code":500}"#,
        );
        assert_eq!(err.user_message(), "Analysis failed");
    }

    #[test]
    fn html_error_page_reduces_to_status_line() {
        let body = "<html><head><title>502 Bad Gateway</title></head>\n\
                    <body><center><h1>502 Bad Gateway</h1></center><hr><center>nginx</center></body></html>";
        let err = BackendError::from_response_body(502, body);
        let message = err.user_message();
        assert!(!message.contains("<html>"));
        assert_eq!(message, "Request failed with status code 502");
    }

    #[test]
    fn empty_or_blank_bodies_keep_the_status_code() {
        assert_eq!(
            BackendError::from_response_body(500, "").user_message(),
            "Request failed with status code 500"
        );
        assert_eq!(
            BackendError::from_response_body(503, r#"{"error":"  ","status_code":503}"#)
                .user_message(),
            "Request failed with status code 503"
        );
    }

    #[test]
    fn empty_messages_fall_back() {
        assert_eq!(
            BackendError::Network(String::new()).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
        let err = BackendError::Api {
            status: 504,
            message: " ".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn analyze_response_maps_to_summary() {
        let body = r#"{
            "message": "Analysis complete",
            "contract_id": "c-1",
            "session_id": "s-9",
            "total_clauses_extracted": 12,
            "total_findings": 4,
            "findings_by_severity": {"CRITICAL": 1, "HIGH": 2, "MEDIUM": 1, "LOW": 0},
            "processing_time_seconds": 48.2
        }"#;
        let parsed: AnalyzeContractResponse = serde_json::from_str(body).unwrap();
        let summary = AnalysisSummary::from(parsed);

        assert_eq!(summary.clause_count, 12);
        assert_eq!(summary.finding_count, 4);
        assert_eq!(summary.findings_by_severity.high, 2);
        assert_eq!(summary.processing_duration_seconds, 48.2);
    }

    #[test]
    fn client_normalizes_base_url() {
        let config = BackendConfig {
            base_url: "http://localhost:7071/api/".to_string(),
            timeout_secs: 5,
            auth_token: Some("  ".to_string()),
        };
        let client = HttpContractBackend::new(&config).unwrap();
        assert_eq!(client.url("upload_contract"), "http://localhost:7071/api/upload_contract");
        assert!(client.auth_token.is_none());
    }
}
