//! User-level configuration.
//!
//! Loaded from a TOML file (by convention `~/.chairlift/config.toml`).
//! Optional sections disable their features when absent; only the
//! upstream token is required for core operation.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::defaults;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required config absent. Fatal at startup.
    #[error("missing required config field: {field}")]
    Missing { field: &'static str },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid base_url: {0}")]
    BadBaseUrl(#[from] url::ParseError),
}

/// Connection settings for the upstream conference-management service.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Bearer credential sent as `Authorization: Token <...>`.
    pub token: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Wire version pinned on every request.
    #[serde(default)]
    pub api_version: Option<String>,
    /// Per-request wall-clock deadline in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl UpstreamConfig {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .base_url
            .as_deref()
            .unwrap_or(defaults::DEFAULT_BASE_URL);
        Ok(Url::parse(raw)?)
    }

    pub fn api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .unwrap_or(defaults::DEFAULT_API_VERSION)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
            .unwrap_or(defaults::DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

/// Optional spreadsheet/storage provider section. Absence disables the
/// feature without affecting core operation.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    #[serde(default)]
    pub credentials_path: Option<String>,
}

/// Optional mail provider section.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub provider: String,
    #[serde(default)]
    pub sender: Option<String>,
}

/// Solver settings for the schedule optimizer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SolverConfig {
    #[serde(default)]
    pub binary: Option<String>,
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
}

impl SolverConfig {
    pub fn binary(&self) -> &str {
        self.binary.as_deref().unwrap_or(defaults::DEFAULT_SOLVER_BIN)
    }

    pub fn time_limit_secs(&self) -> u64 {
        self.time_limit_secs
            .unwrap_or(defaults::DEFAULT_SOLVER_TIME_LIMIT_SECS)
    }
}

/// Top-level user configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub mail: Option<MailConfig>,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Config {
    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, &path.display().to_string())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.token.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "upstream.token",
            });
        }
        Ok(())
    }
}
