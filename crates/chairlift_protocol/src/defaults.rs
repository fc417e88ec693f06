//! Canonical default values shared across the client and engines.

/// Public pretalx-compatible instance used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://pretalx.com";

/// Wire schema version pinned on every request.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Header that carries the pinned wire version.
pub const VERSION_HEADER: &str = "Pretalx-Version";

/// Page size the upstream serves for list endpoints.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Desired number of reviews per proposal.
pub const DEFAULT_TARGET_REVIEWS: u32 = 3;

/// Extra reviewers assigned beyond target to tolerate no-shows.
pub const DEFAULT_ASSIGNMENT_BUFFER: u32 = 2;

/// Sustained request rate against the upstream (requests per second).
pub const DEFAULT_RATE_PER_SEC: f64 = 2.0;

/// Burst size of the request token bucket.
pub const DEFAULT_RATE_BURST: u32 = 5;

/// Per-request wall-clock deadline.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// List queries expecting fewer items than this skip bulk prepopulation.
pub const PREPOPULATE_MIN_QUERY: u64 = 5;

/// Solver binary looked up on PATH when none is configured.
pub const DEFAULT_SOLVER_BIN: &str = "cbc";

/// Wall-clock limit handed to the solver. Schedule solves are expected
/// to run long; two hours is the tested sweet spot for a three-day event.
pub const DEFAULT_SOLVER_TIME_LIMIT_SECS: u64 = 2 * 60 * 60;
