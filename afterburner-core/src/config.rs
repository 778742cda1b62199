use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Top-level exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Inbound scrape listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// MSI Afterburner remote server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// `host:port` of the Afterburner remote server.
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Per-attempt timeout.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Extra attempts after a transport failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Upper bound on a buffered upstream body, success or error.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_listen() -> String { "0.0.0.0:8090".into() }
fn default_target() -> String { "127.0.0.1:82".into() }
fn default_path() -> String { "/mahm".into() }
fn default_username() -> String { "MSIAfterburner".into() }
fn default_password() -> String { "17cc95b4017d496f82".into() }
fn default_timeout() -> u64 { 500 }
fn default_retries() -> u32 { 1 }
fn default_max_body_bytes() -> usize { 4 * 1024 * 1024 }

// ── Impls ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            path: default_path(),
            username: default_username(),
            password: default_password(),
            timeout_ms: default_timeout(),
            retries: default_retries(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl UpstreamConfig {
    /// Full request URL, e.g. `http://127.0.0.1:82/mahm`.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.target, self.path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total number of attempts a fetch may make.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl ExporterConfig {
    /// Load configuration from a YAML file + `AFTERBURNER_` env overrides.
    ///
    /// A missing file contributes nothing; nested keys use `__`
    /// (`AFTERBURNER_UPSTREAM__TIMEOUT_MS=800`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: ExporterConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("AFTERBURNER_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.trim().is_empty() {
            return Err(ConfigError::Invalid("server.listen must not be empty".into()));
        }
        if self.upstream.target.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.target must not be empty".into()));
        }
        if !self.upstream.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "upstream.path must start with '/', got {:?}",
                self.upstream.path
            )));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_ms must be positive".into()));
        }
        if self.upstream.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("upstream.max_body_bytes must be positive".into()));
        }
        Ok(())
    }
}
