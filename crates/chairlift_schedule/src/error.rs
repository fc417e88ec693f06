//! Error taxonomy for scheduling runs.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScheduleError>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The model is infeasible, or the solver hit its wall-clock limit
    /// without an incumbent. Fatal for the run.
    #[error("no schedule: {reason}")]
    NoSchedule { reason: String },

    /// The solver process failed to start or exited non-zero.
    #[error("solver failure: {0}")]
    Solver(String),

    /// The run was cancelled; the solver child was terminated.
    #[error("scheduling run cancelled")]
    Cancelled,

    /// The solution file did not parse.
    #[error("malformed solution file at line {line}: {cause}")]
    Solution { line: usize, cause: String },

    /// The LP file did not parse.
    #[error("malformed LP input at line {line}: {cause}")]
    Lp { line: usize, cause: String },

    /// A solution references or omits model variables inconsistently.
    #[error("solution does not match model: {0}")]
    Mismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScheduleError {
    pub fn no_schedule(reason: impl Into<String>) -> Self {
        ScheduleError::NoSchedule {
            reason: reason.into(),
        }
    }
}
