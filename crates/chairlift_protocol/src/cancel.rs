//! Cancellation shared by the client and the schedule solver.

use std::sync::Arc;
use std::sync::OnceLock;

/// A one-shot cancellation signal that carries the reason it fired.
///
/// Cancellation is sticky: the first `cancel_with` wins and later calls
/// are ignored, so every observer sees one consistent reason. Clones
/// observe the same signal. Checks are lock-free reads; the fetcher
/// polls before each request and each yielded element, the solver
/// driver between child polls.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    reason: Arc<OnceLock<String>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason.get().is_some()
    }

    /// Cancel with a generic reason.
    pub fn cancel(&self) {
        self.cancel_with("cancelled by caller");
    }

    /// Cancel, recording why. No-op if already cancelled.
    pub fn cancel_with(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
    }

    /// The recorded reason, once cancelled.
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }
}
