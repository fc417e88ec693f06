//! Shared command context: configuration plus a ready upstream client.

use anyhow::{Context as _, Result};
use chairlift_client::{Fetcher, FetcherConfig, ReqwestTransport, UpstreamClient};
use chairlift_protocol::Config;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct CliContext {
    pub config: Config,
}

impl CliContext {
    /// Load the config file, failing when it is absent or invalid.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = override_path
            .map(Path::to_path_buf)
            .unwrap_or_else(chairlift_logging::default_config_path);
        let config = Config::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?;
        Ok(Self { config })
    }

    /// Load the config if present; commands that can run offline use
    /// defaults otherwise.
    pub fn load_optional(override_path: Option<&Path>) -> Option<Self> {
        Self::load(override_path).ok()
    }

    /// Build the upstream client from the configuration.
    pub fn client(&self) -> Result<UpstreamClient> {
        let upstream = &self.config.upstream;
        let base_url = upstream.base_url().context("invalid upstream.base_url")?;
        let transport =
            Arc::new(ReqwestTransport::new().map_err(|e| anyhow::anyhow!("transport: {e}"))?);
        let fetcher_config = FetcherConfig::new(base_url, upstream.token.clone())
            .with_api_version(upstream.api_version())
            .with_request_timeout(Duration::from_secs(upstream.timeout_secs()));
        Ok(UpstreamClient::new(Fetcher::new(transport, fetcher_config)))
    }
}
