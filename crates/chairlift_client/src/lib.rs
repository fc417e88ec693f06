//! Rate-limited, version-pinned client for the upstream
//! conference-management API.
//!
//! Three layers: the paginated [`fetch::Fetcher`] (throttling, retries,
//! blocking and lazy pagination), the [`cache::ExpansionCache`]
//! (process-local reference expansion with bulk pre-population), and
//! the [`client::UpstreamClient`] endpoint facade that stitches them
//! together so callers always see the nested entity form.

pub mod cache;
pub mod client;
pub mod error;
pub mod fetch;
pub mod ratelimit;
pub mod retry;
pub mod testing;
pub mod transport;

pub use cache::{CacheKind, ExpansionCache};
pub use chairlift_protocol::cancel::CancelToken;
pub use client::{ProposalStream, UpstreamClient};
pub use error::{Result, UpstreamError};
pub use fetch::{Fetcher, FetcherConfig, Paginated, QueryParams};
pub use ratelimit::TokenBucket;
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, ReqwestTransport};
