//! Error taxonomy for the upstream client.
//!
//! Transport failures are retried internally; everything surfaced here
//! is terminal for the in-flight request. Schema mismatches carry the
//! request path so callers can diagnose without re-fetching.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpstreamError>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport kept failing after bounded retries.
    #[error("upstream unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },

    /// The per-request wall-clock deadline elapsed.
    #[error("request to {path} exceeded its deadline")]
    Timeout { path: String },

    /// The caller cancelled the fetch.
    #[error("request cancelled")]
    Cancelled,

    /// Upstream rejected the request with a non-retryable 4xx.
    #[error("upstream rejected {path}: HTTP {status}: {body}")]
    Client {
        path: String,
        status: u16,
        body: String,
    },

    /// 404 on a detail endpoint.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Response did not match the expected schema under the pinned
    /// wire version.
    #[error("wire format mismatch at {path}: {cause}")]
    Wire { path: String, cause: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl UpstreamError {
    pub fn wire(path: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        UpstreamError::Wire {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::NotFound { .. })
    }
}
