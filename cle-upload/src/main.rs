//! cle-upload - Contract upload/analysis progress service
//!
//! Uploads contracts to the document-analysis backend, runs the analysis,
//! and serves a stage-aware progress snapshot (poll or SSE) to the dashboard.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cle_common::config::{ConfigOverrides, ConfigSource, TomlConfig};
use cle_common::events::EventBus;
use cle_upload::services::{
    HttpContractBackend, OrchestratorSettings, ThresholdSchedule, UploadOrchestrator,
};
use cle_upload::AppState;

/// Command-line arguments (highest configuration priority)
#[derive(Debug, Parser)]
#[command(name = "cle-upload", version, about = "Contract upload and analysis progress service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind the HTTP API to
    #[arg(long)]
    bind: Option<String>,

    /// Backend base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Backend bearer token
    #[arg(long)]
    auth_token: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = TomlConfig::load_or_default(args.config.as_deref())?;
    config.apply_env_overrides();
    config.apply_overrides(ConfigOverrides {
        bind_addr: args.bind,
        backend_url: args.backend_url,
        auth_token: args.auth_token,
        log_level: args.log_level,
    });

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting cle-upload (contract upload progress service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!("Configuration loaded from {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
    }
    config.validate()?;

    let backend = HttpContractBackend::new(&config.backend)
        .context("Failed to initialize backend client")?;
    info!("Backend: {}", config.backend.base_url);

    let strategy = ThresholdSchedule::new(config.progress.analyze_thresholds_secs)?;
    let event_bus = EventBus::new(100);

    let orchestrator = UploadOrchestrator::builder(Arc::new(backend), event_bus.clone())
        .settings(OrchestratorSettings::from(&config.progress))
        .strategy(Arc::new(strategy))
        .on_complete(|contract_id| {
            info!(contract_id = %contract_id, "Contract ready: /contract/{}", contract_id);
        })
        .build();

    let state = AppState::new(Arc::new(orchestrator), event_bus);
    let app = cle_upload::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("Listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
