//! Shared test fixtures: a scripted backend and request builders

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use cle_upload::models::{
    AnalysisSummary, IngestReceipt, SeverityCounts, UploadFile, UploadRequest,
};
use cle_upload::services::{BackendError, ContractBackend};

type Reply<T> = oneshot::Receiver<Result<T, BackendError>>;

/// Backend whose calls resolve only when the test says so
///
/// Each call pops the next scripted reply. A call with nothing scripted
/// never resolves.
#[derive(Default)]
pub struct ScriptedBackend {
    ingest_replies: Mutex<VecDeque<Reply<IngestReceipt>>>,
    analyze_replies: Mutex<VecDeque<Reply<AnalysisSummary>>>,
    pub ingest_calls: Mutex<Vec<String>>,
    pub analyze_calls: Mutex<Vec<String>>,
}

/// Test-side handle resolving one scripted call
pub struct Resolver<T>(oneshot::Sender<Result<T, BackendError>>);

impl<T: Send + 'static> Resolver<T> {
    pub fn resolve(self, result: Result<T, BackendError>) {
        let _ = self.0.send(result);
    }

    /// Resolve after `delay` of (simulated) time
    pub fn resolve_after(self, delay: Duration, result: Result<T, BackendError>) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            self.resolve(result);
        });
    }
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_ingest(&self) -> Resolver<IngestReceipt> {
        let (tx, rx) = oneshot::channel();
        self.ingest_replies.lock().unwrap().push_back(rx);
        Resolver(tx)
    }

    pub fn script_analyze(&self) -> Resolver<AnalysisSummary> {
        let (tx, rx) = oneshot::channel();
        self.analyze_replies.lock().unwrap().push_back(rx);
        Resolver(tx)
    }
}

async fn await_reply<T>(reply: Option<Reply<T>>) -> Result<T, BackendError> {
    match reply {
        Some(rx) => rx
            .await
            .unwrap_or_else(|_| Err(BackendError::Network("connection closed".to_string()))),
        None => std::future::pending().await,
    }
}

#[async_trait]
impl ContractBackend for ScriptedBackend {
    async fn ingest(&self, request: &UploadRequest) -> Result<IngestReceipt, BackendError> {
        self.ingest_calls
            .lock()
            .unwrap()
            .push(request.contract_name.clone());
        let reply = self.ingest_replies.lock().unwrap().pop_front();
        await_reply(reply).await
    }

    async fn analyze(&self, contract_id: &str) -> Result<AnalysisSummary, BackendError> {
        self.analyze_calls
            .lock()
            .unwrap()
            .push(contract_id.to_string());
        let reply = self.analyze_replies.lock().unwrap().pop_front();
        await_reply(reply).await
    }
}

pub fn receipt(contract_id: &str) -> Result<IngestReceipt, BackendError> {
    Ok(IngestReceipt {
        contract_id: contract_id.to_string(),
    })
}

pub fn summary(clause_count: u32, finding_count: u32) -> Result<AnalysisSummary, BackendError> {
    Ok(AnalysisSummary {
        clause_count,
        finding_count,
        findings_by_severity: SeverityCounts {
            critical: 1,
            high: 1,
            medium: 1,
            low: finding_count.saturating_sub(3),
        },
        processing_duration_seconds: 48.0,
    })
}

pub fn api_failure(status: u16, message: &str) -> BackendError {
    BackendError::Api {
        status,
        message: message.to_string(),
    }
}

/// 2 MB contract upload request
pub fn upload_request(name: &str) -> UploadRequest {
    UploadRequest {
        file: UploadFile::new(format!("{}.pdf", name), vec![0u8; 2 * 1024 * 1024]),
        contract_name: name.to_string(),
        submitted_by: "ops@example.com".to_string(),
        metadata: Some(serde_json::json!({ "counterparty": "Acme Corp" })),
    }
}

/// Let spawned tasks run without moving simulated time
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
