//! HTTP contract backend against a local axum server
//!
//! The server records every request it sees so the tests can check paths,
//! headers and multipart field names as they go over the wire.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use cle_common::config::BackendConfig;
use cle_upload::models::{UploadFile, UploadRequest};
use cle_upload::services::{BackendError, ContractBackend, HttpContractBackend};

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    authorization: Option<String>,
    content_type: String,
    body: String,
}

type Recorder = Arc<Mutex<Vec<Recorded>>>;

fn record(recorder: &Recorder, path: String, headers: &HeaderMap, body: &Bytes) {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    recorder.lock().unwrap().push(Recorded {
        path,
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE).unwrap_or_default(),
        body: String::from_utf8_lossy(body).into_owned(),
    });
}

async fn upload_contract(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    record(&recorder, "/api/upload_contract".to_string(), &headers, &body);
    Json(json!({
        "message": "Contract uploaded",
        "contract_id": "c-42",
        "status": "uploaded"
    }))
}

async fn analyze_contract(
    State(recorder): State<Recorder>,
    Path(contract_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(
        &recorder,
        format!("/api/analyze_contract/{}", contract_id),
        &headers,
        &body,
    );

    match contract_id.as_str() {
        "rejected" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "Analysis failed",
                "details": "no extractable text",
                "status_code": 422
            })),
        )
            .into_response(),
        "gateway" => (
            StatusCode::BAD_GATEWAY,
            [(header::CONTENT_TYPE, "text/html")],
            "<html><body><h1>502 Bad Gateway</h1></body></html>",
        )
            .into_response(),
        _ => Json(json!({
            "message": "Analysis complete",
            "contract_id": contract_id,
            "total_clauses_extracted": 12,
            "total_findings": 4,
            "findings_by_severity": {"CRITICAL": 1, "HIGH": 1, "MEDIUM": 2, "LOW": 0},
            "processing_time_seconds": 41.5
        }))
        .into_response(),
    }
}

/// Serve the fake backend on an ephemeral port; returns its `/api` base URL
async fn spawn_backend(recorder: Recorder) -> String {
    let app = Router::new()
        .route("/api/upload_contract", post(upload_contract))
        .route("/api/analyze_contract/:contract_id", post(analyze_contract))
        .with_state(recorder);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/", addr)
}

fn client(base_url: String, auth_token: Option<&str>) -> HttpContractBackend {
    HttpContractBackend::new(&BackendConfig {
        base_url,
        timeout_secs: 5,
        auth_token: auth_token.map(str::to_string),
    })
    .unwrap()
}

fn nda_request(metadata: Option<Value>) -> UploadRequest {
    UploadRequest {
        file: UploadFile::new("mutual-nda.pdf".to_string(), b"%PDF-1.7 mutual nda".to_vec()),
        contract_name: "Mutual NDA".to_string(),
        submitted_by: "legal@example.com".to_string(),
        metadata,
    }
}

#[tokio::test]
async fn ingest_posts_multipart_form_with_bearer_token() {
    let recorder = Recorder::default();
    let backend = client(spawn_backend(recorder.clone()).await, Some("secret-token"));

    let receipt = backend
        .ingest(&nda_request(Some(json!({ "counterparty": "Acme Corp" }))))
        .await
        .unwrap();
    assert_eq!(receipt.contract_id, "c-42");

    let requests = recorder.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.path, "/api/upload_contract");
    assert_eq!(sent.authorization.as_deref(), Some("Bearer secret-token"));
    assert!(sent.content_type.starts_with("multipart/form-data; boundary="));

    assert!(sent.body.contains(r#"name="file"; filename="mutual-nda.pdf""#));
    assert!(sent.body.contains("application/pdf"));
    assert!(sent.body.contains("%PDF-1.7 mutual nda"));
    assert!(sent.body.contains(r#"name="contract_name""#));
    assert!(sent.body.contains("Mutual NDA"));
    assert!(sent.body.contains(r#"name="uploaded_by""#));
    assert!(sent.body.contains("legal@example.com"));
    assert!(sent.body.contains(r#"name="metadata""#));
    assert!(sent.body.contains(r#"{"counterparty":"Acme Corp"}"#));
}

#[tokio::test]
async fn ingest_without_metadata_or_token_omits_both() {
    let recorder = Recorder::default();
    let backend = client(spawn_backend(recorder.clone()).await, None);

    backend.ingest(&nda_request(None)).await.unwrap();

    let sent = recorder.lock().unwrap()[0].clone();
    assert!(sent.authorization.is_none());
    assert!(!sent.body.contains(r#"name="metadata""#));
    assert!(sent.body.contains(r#"name="contract_name""#));
}

#[tokio::test]
async fn analyze_posts_empty_json_and_maps_summary() {
    let recorder = Recorder::default();
    let backend = client(spawn_backend(recorder.clone()).await, Some("secret-token"));

    let summary = backend.analyze("c-42").await.unwrap();
    assert_eq!(summary.clause_count, 12);
    assert_eq!(summary.finding_count, 4);
    assert_eq!(summary.findings_by_severity.medium, 2);
    assert_eq!(summary.processing_duration_seconds, 41.5);

    let sent = recorder.lock().unwrap()[0].clone();
    assert_eq!(sent.path, "/api/analyze_contract/c-42");
    assert_eq!(sent.authorization.as_deref(), Some("Bearer secret-token"));
    assert!(sent.content_type.starts_with("application/json"));
    assert_eq!(sent.body, "{}");
}

#[tokio::test]
async fn non_success_replies_become_api_errors() {
    let recorder = Recorder::default();
    let backend = client(spawn_backend(recorder).await, None);

    let err = backend.analyze("rejected").await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Api {
            status: 422,
            message: "no extractable text".to_string(),
        }
    );

    let err = backend.analyze("gateway").await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Api {
            status: 502,
            message: "Request failed with status code 502".to_string(),
        }
    );
}
