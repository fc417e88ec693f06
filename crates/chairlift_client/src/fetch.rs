//! Paginated fetcher: single-endpoint GET with throttling, retries,
//! version pinning, and blocking or lazy pagination.

use crate::error::{Result, UpstreamError};
use chairlift_protocol::cancel::CancelToken;
use crate::ratelimit::TokenBucket;
use crate::retry::{is_retryable_status, RetryPolicy};
use crate::transport::{HttpRequest, HttpTransport, TransportError};
use chairlift_protocol::defaults;
use chairlift_protocol::types::Page;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Query parameters passed through verbatim to the upstream.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Server-side lifecycle filter, e.g. `state=accepted`.
    pub fn state(self, state: impl Into<String>) -> Self {
        self.with("state", state)
    }

    /// Ask the upstream to inline all question answers.
    pub fn questions_all(self) -> Self {
        self.with("questions", "all")
    }

    /// Bound the query to at most `n` items.
    pub fn limit(self, n: u64) -> Self {
        self.with("limit", n.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The declared `limit`, if the caller bounded the query.
    pub fn declared_limit(&self) -> Option<u64> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == "limit")
            .and_then(|(_, v)| v.parse().ok())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// Connection settings the fetcher stamps onto every request.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: Url,
    pub token: String,
    pub api_version: String,
    pub request_timeout: Duration,
}

impl FetcherConfig {
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            base_url,
            token: token.into(),
            api_version: defaults::DEFAULT_API_VERSION.to_string(),
            request_timeout: Duration::from_secs(defaults::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Rate-limited, retrying GET client for one upstream instance.
///
/// Cloning is cheap; clones share the token bucket and cancel token so
/// pagination follow-ups stay under the same throttle.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    bucket: Arc<TokenBucket>,
    retry: RetryPolicy,
    config: Arc<FetcherConfig>,
    cancel: CancelToken,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("retry", &self.retry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: FetcherConfig) -> Self {
        Self {
            transport,
            bucket: Arc::new(TokenBucket::default_limits()),
            retry: RetryPolicy::default(),
            config: Arc::new(config),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limits(mut self, rate_per_sec: f64, burst: u32) -> Self {
        self.bucket = Arc::new(TokenBucket::new(rate_per_sec, burst));
        self
    }

    /// Token that aborts in-flight fetches and lazy sequences.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    /// Resolve a relative API path plus query against the base URL.
    pub fn endpoint(&self, path: &str, params: &QueryParams) -> Result<Url> {
        let mut url = self.config.base_url.join(path)?;
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params.pairs() {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Token {}", self.config.token)),
            (
                defaults::VERSION_HEADER,
                self.config.api_version.clone(),
            ),
            ("Accept", "application/json".to_string()),
        ]
    }

    /// One GET with throttling and bounded retries; returns the raw
    /// JSON document.
    pub async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        let path = url.path().to_string();
        let request = HttpRequest {
            url,
            headers: self.headers(),
            deadline: self.config.request_timeout,
        };

        let mut attempt: u32 = 0;
        let mut last_error = String::new();
        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                return Err(UpstreamError::Cancelled);
            }
            self.bucket.acquire().await;

            match self.transport.execute(&request).await {
                Ok(response) if response.is_success() => {
                    return serde_json::from_str(&response.body)
                        .map_err(|e| UpstreamError::wire(&path, e));
                }
                Ok(response) if is_retryable_status(response.status) => {
                    tracing::debug!(
                        status = response.status,
                        %path,
                        attempt,
                        "retryable upstream status"
                    );
                    last_error = format!("HTTP {}", response.status);
                }
                Ok(response) if response.status == 404 => {
                    return Err(UpstreamError::NotFound { path });
                }
                Ok(response) => {
                    return Err(UpstreamError::Client {
                        path,
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(TransportError::Timeout) => {
                    return Err(UpstreamError::Timeout { path });
                }
                Err(TransportError::Io(cause)) => {
                    tracing::debug!(%path, attempt, %cause, "transport failure");
                    last_error = cause;
                }
            }

            if !self.retry.has_budget(attempt) {
                return Err(UpstreamError::Unavailable {
                    attempts: attempt,
                    last_error,
                });
            }
            tokio::time::sleep(self.retry.delay_for(attempt)).await;
        }
    }

    /// Fetch a single resource and decode it.
    pub async fn fetch_detail<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<T> {
        let url = self.endpoint(path, params)?;
        let document = self.get_json(url).await?;
        serde_json::from_value(document).map_err(|e| UpstreamError::wire(path, e))
    }

    /// Fetch one page of a list endpoint. Elements stay as raw JSON so
    /// the lazy sequence can decode (and, in lenient mode, drop) them
    /// one at a time.
    async fn fetch_page(&self, url: Url) -> Result<Page<serde_json::Value>> {
        let path = url.path().to_string();
        let document = self.get_json(url).await?;
        serde_json::from_value(document).map_err(|e| UpstreamError::wire(&path, e))
    }

    /// Lazy mode: `(count, restartable lazy sequence)`. Advancing the
    /// sequence may trigger further page requests.
    pub async fn fetch_list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<(u64, Paginated<T>)> {
        let url = self.endpoint(path, params)?;
        let first = self.fetch_page(url).await?;
        let count = first.count;
        Ok((count, Paginated::from_first_page(self.clone(), path, first)))
    }

    /// Blocking mode: drain the cursor chain and materialize all pages.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<(u64, Vec<T>)> {
        let (count, sequence) = self.fetch_list(path, params).await?;
        let items = sequence.collect().await?;
        Ok((count, items))
    }
}

// ============================================================================
// Lazy pagination sequence
// ============================================================================

/// Pull-based lazy sequence over a paginated list endpoint.
///
/// Internal state is `(next_url, buffer, count)`: advancing drains the
/// buffer, then refills from `next_url`. An element is fully decoded
/// before the consumer observes it. Restartability is weak: only the
/// buffered remainder of the current page can be replayed.
pub struct Paginated<T> {
    fetcher: Fetcher,
    path: String,
    count: u64,
    yielded: u64,
    dropped: u64,
    buffer: VecDeque<serde_json::Value>,
    next: Option<String>,
    lenient: bool,
    finished: bool,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Paginated<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginated")
            .field("fetcher", &self.fetcher)
            .field("path", &self.path)
            .field("count", &self.count)
            .field("yielded", &self.yielded)
            .field("dropped", &self.dropped)
            .field("next", &self.next)
            .field("lenient", &self.lenient)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> Paginated<T> {
    fn from_first_page(fetcher: Fetcher, path: &str, first: Page<serde_json::Value>) -> Self {
        Self {
            fetcher,
            path: path.to_string(),
            count: first.count,
            yielded: 0,
            dropped: 0,
            buffer: first.results.into(),
            next: first.next,
            lenient: false,
            finished: false,
            _marker: std::marker::PhantomData,
        }
    }

    /// Drop malformed elements with a warning instead of terminating
    /// the sequence.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    /// Total record count the upstream declared.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Elements decoded and handed to the consumer so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Elements still buffered from the current page.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Advance the sequence. `None` marks exhaustion; a truncating
    /// upstream surfaces the count discrepancy as a final error.
    pub async fn next(&mut self) -> Option<Result<T>> {
        loop {
            if self.finished {
                return None;
            }
            if self.fetcher.cancel.is_cancelled() {
                self.finished = true;
                return Some(Err(UpstreamError::Cancelled));
            }

            if let Some(raw) = self.buffer.pop_front() {
                match serde_json::from_value::<T>(raw) {
                    Ok(item) => {
                        self.yielded += 1;
                        return Some(Ok(item));
                    }
                    Err(cause) if self.lenient => {
                        self.dropped += 1;
                        tracing::warn!(
                            path = %self.path,
                            %cause,
                            "dropping malformed record in lenient mode"
                        );
                        continue;
                    }
                    Err(cause) => {
                        self.finished = true;
                        return Some(Err(UpstreamError::wire(&self.path, cause)));
                    }
                }
            }

            let Some(next) = self.next.take() else {
                self.finished = true;
                let seen = self.yielded + self.dropped;
                if seen != self.count {
                    return Some(Err(UpstreamError::wire(
                        &self.path,
                        format!(
                            "upstream truncated list: declared {} records, received {}",
                            self.count, seen
                        ),
                    )));
                }
                return None;
            };

            let url = match Url::parse(&next) {
                Ok(url) => url,
                Err(cause) => {
                    self.finished = true;
                    return Some(Err(UpstreamError::wire(
                        &self.path,
                        format!("bad pagination cursor {next}: {cause}"),
                    )));
                }
            };
            match self.fetcher.fetch_page(url).await {
                Ok(page) => {
                    self.buffer = page.results.into();
                    self.next = page.next;
                }
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
    }

    /// Materialize the remainder of the sequence.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }
}
