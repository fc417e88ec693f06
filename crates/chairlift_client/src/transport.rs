//! HTTP transport seam.
//!
//! The fetcher talks to the wire through [`HttpTransport`] so tests can
//! substitute an in-memory mock. The production implementation wraps
//! `reqwest` with a redirect policy that keeps the version header on
//! trailing-slash follows.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A single GET against the upstream. Headers are set by the fetcher;
/// the transport sends them verbatim.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    /// Per-request wall-clock deadline.
    pub deadline: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection-level failure; the fetcher retries these.
    #[error("transport failure: {0}")]
    Io(String),
    /// Deadline elapsed before the response arrived.
    #[error("deadline elapsed")]
    Timeout,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport over a shared `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        // Redirects are followed by reqwest's default policy; headers
        // (including the version pin) survive same-origin follows such
        // as the upstream's trailing-slash canonicalization.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .get(request.url.clone())
            .timeout(request.deadline);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Io(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Io(e.to_string())
            }
        })?;

        Ok(HttpResponse { status, body })
    }
}
