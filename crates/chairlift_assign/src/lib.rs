//! Deterministic greedy reviewer assignment.
//!
//! Given proposals (with per-proposal review targets and completion
//! counts) and reviewers (with ordered track preferences), produces
//! the reviewer→proposals mapping uploaded to the upstream's
//! bulk-assignment endpoint. Identical inputs produce byte-identical
//! output.

pub mod artifact;
pub mod engine;

pub use artifact::{load_assignments, save_assignments};
pub use engine::{
    assign_reviewers, AssignError, AssignOptions, AssignOutcome, AssignWarning, ReviewItem,
    Reviewer,
};
