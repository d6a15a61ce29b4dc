//! Configuration loading and resolution
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary via [`TomlConfig::apply_overrides`])
//! 2. Environment variables (`CLE_BIND_ADDR`, `CLE_BACKEND_URL`, `CLE_AUTH_TOKEN`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not fatal: the caller gets the compiled defaults and
//! a [`ConfigSource::Defaults`] marker so it can warn once logging is up.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the HTTP bind address
pub const ENV_BIND_ADDR: &str = "CLE_BIND_ADDR";
/// Environment variable overriding the backend base URL
pub const ENV_BACKEND_URL: &str = "CLE_BACKEND_URL";
/// Environment variable supplying the backend bearer token
pub const ENV_AUTH_TOKEN: &str = "CLE_AUTH_TOKEN";

/// Full service configuration as stored in TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub progress: ProgressConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the dashboard API binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5780".to_string(),
        }
    }
}

/// Document-analysis backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the REST backend (e.g. `http://localhost:7071/api`)
    pub base_url: String,
    /// Transport timeout for a single request; analysis can take minutes
    pub timeout_secs: u64,
    /// Optional bearer token sent with every request
    pub auth_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7071/api".to_string(),
            timeout_secs: 300,
            auth_token: None,
        }
    }
}

/// Progress indicator tuning
///
/// All values are heuristics for display; none of them affect what the
/// backend actually does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Elapsed-time clock period
    pub tick_interval_ms: u64,
    /// Delay between reaching 100% and invoking the completion hand-off
    pub handoff_delay_ms: u64,
    /// Analyze-phase seconds at which the simulated stage moves to
    /// clause extraction, rules detection and AI detection respectively
    pub analyze_thresholds_secs: [u64; 3],
    /// Highest analyze percentage the heuristic may ever report
    pub analyze_ceiling: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            handoff_delay_ms: 1000,
            analyze_thresholds_secs: [10, 25, 35],
            analyze_ceiling: 97,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this TOML file
    File(PathBuf),
    /// No file found; compiled defaults in use
    Defaults,
}

/// Command-line values that take precedence over everything else
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub backend_url: Option<String>,
    pub auth_token: Option<String>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
    }

    /// Load from `path` (or the platform default location), falling back to
    /// compiled defaults when no file exists
    ///
    /// A file that exists but cannot be parsed is an error: silently ignoring
    /// a typo would start the service against the wrong backend.
    pub fn load_or_default(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        match candidate {
            Some(p) if p.exists() => {
                let config = Self::from_file(&p)?;
                Ok((config, ConfigSource::File(p)))
            }
            Some(p) if path.is_some() => Err(Error::Config(format!(
                "Config file not found: {}",
                p.display()
            ))),
            _ => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Apply `CLE_*` environment variables on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Some(addr) = non_empty_env(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
        if let Some(url) = non_empty_env(ENV_BACKEND_URL) {
            self.backend.base_url = url;
        }
        if let Some(token) = non_empty_env(ENV_AUTH_TOKEN) {
            self.backend.auth_token = Some(token);
        }
    }

    /// Apply command-line values (highest priority)
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(addr) = overrides.bind_addr {
            self.server.bind_addr = addr;
        }
        if let Some(url) = overrides.backend_url {
            self.backend.base_url = url;
        }
        if let Some(token) = overrides.auth_token {
            self.backend.auth_token = Some(token);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Reject settings the progress orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(Error::Config("backend.base_url must not be empty".to_string()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(Error::Config("backend.timeout_secs must be positive".to_string()));
        }
        if self.progress.tick_interval_ms == 0 {
            return Err(Error::Config(
                "progress.tick_interval_ms must be positive".to_string(),
            ));
        }
        let [a, b, c] = self.progress.analyze_thresholds_secs;
        if !(a > 0 && a < b && b < c) {
            return Err(Error::Config(format!(
                "progress.analyze_thresholds_secs must be strictly increasing and positive, got [{}, {}, {}]",
                a, b, c
            )));
        }
        if self.progress.analyze_ceiling == 0 || self.progress.analyze_ceiling >= 100 {
            return Err(Error::Config(format!(
                "progress.analyze_ceiling must be within 1..=99, got {}",
                self.progress.analyze_ceiling
            )));
        }
        Ok(())
    }
}

/// Platform config location: `<config_dir>/cle/cle-upload.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cle").join("cle-upload.toml"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
