//! Greedy reviewer assignment.
//!
//! Distributes proposals to reviewers respecting topic preferences,
//! target review counts, completed reviews, and wants-all opt-ins.
//! The allocation is a deterministic function of its inputs: reviewer
//! selection ties break on input order, and every collection iterated
//! in the inner loop is ordered.

use chairlift_protocol::defaults;
use chairlift_protocol::types::{ProposalCode, ReviewerAssignments};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// ============================================================================
// Inputs
// ============================================================================

/// A proposal as the allocator sees it.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub code: ProposalCode,
    pub track: Option<String>,
    pub target_reviews: u32,
    pub completed_reviews: u32,
}

impl ReviewItem {
    pub fn new(code: impl Into<ProposalCode>, track: Option<&str>) -> Self {
        Self {
            code: code.into(),
            track: track.map(str::to_string),
            target_reviews: defaults::DEFAULT_TARGET_REVIEWS,
            completed_reviews: 0,
        }
    }

    pub fn with_targets(mut self, target: u32, completed: u32) -> Self {
        self.target_reviews = target;
        self.completed_reviews = completed;
        self
    }
}

/// A reviewer with ordered track preferences.
#[derive(Debug, Clone)]
pub struct Reviewer {
    pub name: String,
    pub email: String,
    pub preferred_tracks: Vec<String>,
    /// Proposal codes this reviewer already reviewed or holds.
    pub already_assigned: Vec<ProposalCode>,
    pub wants_all: bool,
}

impl Reviewer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            preferred_tracks: Vec::new(),
            already_assigned: Vec::new(),
            wants_all: false,
        }
    }

    pub fn preferring(mut self, tracks: &[&str]) -> Self {
        self.preferred_tracks = tracks.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn holding(mut self, proposals: &[&str]) -> Self {
        self.already_assigned = proposals.iter().map(|p| ProposalCode::from(*p)).collect();
        self
    }

    pub fn wants_all(mut self) -> Self {
        self.wants_all = true;
        self
    }
}

/// Allocation knobs. The alias table maps submission-track names to
/// reviewer-preference-track names to absorb taxonomy drift.
#[derive(Debug, Clone)]
pub struct AssignOptions {
    /// Extra reviewers assigned beyond target to tolerate no-shows.
    pub buffer: u32,
    pub track_aliases: BTreeMap<String, String>,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            buffer: defaults::DEFAULT_ASSIGNMENT_BUFFER,
            track_aliases: BTreeMap::new(),
        }
    }
}

impl AssignOptions {
    pub fn with_buffer(mut self, buffer: u32) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn alias(mut self, submission_track: &str, reviewer_track: &str) -> Self {
        self.track_aliases
            .insert(submission_track.to_string(), reviewer_track.to_string());
        self
    }

    fn canonical<'a>(&'a self, track: &'a str) -> &'a str {
        self.track_aliases
            .get(track)
            .map(String::as_str)
            .unwrap_or(track)
    }
}

// ============================================================================
// Errors & diagnostics
// ============================================================================

#[derive(Debug, Error)]
pub enum AssignError {
    /// The track taxonomies of submissions and reviewer preferences do
    /// not cover each other, even after aliasing.
    #[error("track mismatch: submissions-only {only_in_submissions:?}, reviewers-only {only_in_reviewers:?}")]
    TrackMismatch {
        only_in_submissions: Vec<String>,
        only_in_reviewers: Vec<String>,
    },
}

/// Non-fatal events recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignWarning {
    /// No preference-matching reviewer existed; a least-loaded
    /// reviewer was used instead.
    FallbackReviewer {
        proposal: ProposalCode,
        track: Option<String>,
    },
    /// Every reviewer already holds the proposal; it was dropped.
    NoReviewer { proposal: ProposalCode },
}

/// Allocation result: the upload artifact plus recorded warnings.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub assignments: ReviewerAssignments,
    pub warnings: Vec<AssignWarning>,
}

impl AssignOutcome {
    /// Review load per reviewer, in artifact order.
    pub fn load_summary(&self) -> Vec<(String, usize)> {
        self.assignments
            .entries()
            .iter()
            .map(|entry| (entry.email.clone(), entry.proposals.len()))
            .collect()
    }

    /// Count of proposals dropped because every reviewer already held
    /// them.
    pub fn dropped_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|warning| matches!(warning, AssignWarning::NoReviewer { .. }))
            .count()
    }
}

// ============================================================================
// Engine
// ============================================================================

struct ReviewerState<'a> {
    reviewer: &'a Reviewer,
    assigned: Vec<ProposalCode>,
    held: BTreeSet<ProposalCode>,
}

impl ReviewerState<'_> {
    fn load(&self) -> usize {
        self.held.len()
    }

    fn holds(&self, code: &ProposalCode) -> bool {
        self.held.contains(code)
    }

    fn take(&mut self, code: &ProposalCode) {
        self.assigned.push(code.clone());
        self.held.insert(code.clone());
    }
}

/// Distribute proposals over reviewers.
///
/// Proposals whose completed reviews meet the target receive no new
/// assignments. The buffer-subtracting remaining computation runs once
/// up front; the distribution loop then hands out one reviewer per
/// proposal per pass until every remaining counter reaches zero.
pub fn assign_reviewers(
    proposals: &[ReviewItem],
    reviewers: &[Reviewer],
    options: &AssignOptions,
) -> Result<AssignOutcome, AssignError> {
    check_track_coverage(proposals, reviewers, options)?;

    let mut states: Vec<ReviewerState> = reviewers
        .iter()
        .map(|reviewer| ReviewerState {
            reviewer,
            assigned: reviewer.already_assigned.clone(),
            held: reviewer.already_assigned.iter().cloned().collect(),
        })
        .collect();

    // remaining = clip(target - completed, 0), plus the buffer for
    // proposals nobody holds yet, minus current holders.
    let mut remaining: Vec<(usize, i64)> = proposals
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let base = i64::from(item.target_reviews.saturating_sub(item.completed_reviews));
            if base == 0 {
                // Target already met; the buffer never resurrects it.
                return (index, 0);
            }
            let holders = states.iter().filter(|s| s.holds(&item.code)).count() as i64;
            let buffer = if holders == 0 {
                i64::from(options.buffer)
            } else {
                0
            };
            (index, (base + buffer - holders).max(0))
        })
        .collect();

    // Largest demand first; ties keep input order (sort is stable).
    remaining.sort_by(|a, b| b.1.cmp(&a.1));

    let mut warnings = Vec::new();
    loop {
        let mut open = false;
        for (index, count) in remaining.iter_mut() {
            if *count == 0 {
                continue;
            }
            let item = &proposals[*index];
            match pick_reviewer(&states, item, options) {
                Pick::Preferred(chosen) => {
                    states[chosen].take(&item.code);
                    *count -= 1;
                }
                Pick::Fallback(chosen) => {
                    tracing::warn!(
                        proposal = %item.code,
                        track = item.track.as_deref().unwrap_or("-"),
                        reviewer = %states[chosen].reviewer.name,
                        "no preference-matching reviewer; using least-loaded fallback"
                    );
                    warnings.push(AssignWarning::FallbackReviewer {
                        proposal: item.code.clone(),
                        track: item.track.clone(),
                    });
                    states[chosen].take(&item.code);
                    *count -= 1;
                }
                Pick::Exhausted => {
                    tracing::warn!(
                        proposal = %item.code,
                        "every reviewer already holds this proposal; dropping"
                    );
                    warnings.push(AssignWarning::NoReviewer {
                        proposal: item.code.clone(),
                    });
                    *count = 0;
                    continue;
                }
            }
            if *count > 0 {
                open = true;
            }
        }
        if !open {
            break;
        }
    }

    // wants-all reviewers take the full proposal set on top.
    for state in states.iter_mut() {
        if state.reviewer.wants_all {
            for item in proposals {
                if !state.holds(&item.code) {
                    state.take(&item.code);
                }
            }
        }
    }

    let mut assignments = ReviewerAssignments::new();
    for state in states {
        assignments.push(state.reviewer.email.clone(), state.assigned);
    }
    Ok(AssignOutcome {
        assignments,
        warnings,
    })
}

enum Pick {
    Preferred(usize),
    Fallback(usize),
    Exhausted,
}

/// Least-loaded reviewer preferring the proposal's track; least-loaded
/// overall when no preference matches. Ties break on reviewer input
/// order.
fn pick_reviewer(states: &[ReviewerState], item: &ReviewItem, options: &AssignOptions) -> Pick {
    let track = item.track.as_deref().map(|t| options.canonical(t));

    let mut preferred: Option<usize> = None;
    let mut anyone: Option<usize> = None;
    for (index, state) in states.iter().enumerate() {
        if state.holds(&item.code) {
            continue;
        }
        let better_than = |current: Option<usize>| {
            current.map_or(true, |held| state.load() < states[held].load())
        };
        if better_than(anyone) {
            anyone = Some(index);
        }
        let matches_track = track.is_some_and(|t| {
            state
                .reviewer
                .preferred_tracks
                .iter()
                .any(|pref| pref == t)
        });
        if matches_track && better_than(preferred) {
            preferred = Some(index);
        }
    }

    match (preferred, anyone) {
        (Some(index), _) => Pick::Preferred(index),
        (None, Some(index)) => Pick::Fallback(index),
        (None, None) => Pick::Exhausted,
    }
}

/// Every distinct proposal track must appear in some reviewer's
/// preference list and vice versa, after aliasing.
fn check_track_coverage(
    proposals: &[ReviewItem],
    reviewers: &[Reviewer],
    options: &AssignOptions,
) -> Result<(), AssignError> {
    let submission_tracks: BTreeSet<String> = proposals
        .iter()
        .filter_map(|item| item.track.as_deref())
        .map(|track| options.canonical(track).to_string())
        .collect();
    let reviewer_tracks: BTreeSet<String> = reviewers
        .iter()
        .flat_map(|reviewer| reviewer.preferred_tracks.iter().cloned())
        .collect();

    let only_in_submissions: Vec<String> = submission_tracks
        .difference(&reviewer_tracks)
        .cloned()
        .collect();
    let only_in_reviewers: Vec<String> = reviewer_tracks
        .difference(&submission_tracks)
        .cloned()
        .collect();

    if only_in_submissions.is_empty() && only_in_reviewers.is_empty() {
        Ok(())
    } else {
        Err(AssignError::TrackMismatch {
            only_in_submissions,
            only_in_reviewers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_applies_alias_table() {
        let options = AssignOptions::default().alias("Machine Learning", "ML");
        assert_eq!(options.canonical("Machine Learning"), "ML");
        assert_eq!(options.canonical("ML"), "ML");
        assert_eq!(options.canonical("Web"), "Web");
    }

    #[test]
    fn test_coverage_reports_both_directions() {
        let proposals = vec![
            ReviewItem::new("P1", Some("Security")),
            ReviewItem::new("P2", Some("ML")),
        ];
        let reviewers = vec![
            Reviewer::new("R1", "r1@example.org").preferring(&["ML", "Rust"]),
        ];
        let error =
            check_track_coverage(&proposals, &reviewers, &AssignOptions::default()).unwrap_err();
        match error {
            AssignError::TrackMismatch {
                only_in_submissions,
                only_in_reviewers,
            } => {
                assert_eq!(only_in_submissions, vec!["Security".to_string()]);
                assert_eq!(only_in_reviewers, vec!["Rust".to_string()]);
            }
        }
    }

    #[test]
    fn test_untracked_proposals_do_not_trip_coverage() {
        let proposals = vec![ReviewItem::new("P1", None)];
        let reviewers = vec![Reviewer::new("R1", "r1@example.org")];
        assert!(check_track_coverage(&proposals, &reviewers, &AssignOptions::default()).is_ok());
    }

    #[test]
    fn test_reviewer_state_tracks_load() {
        let reviewer = Reviewer::new("R1", "r1@example.org").holding(&["A", "B"]);
        let mut state = ReviewerState {
            reviewer: &reviewer,
            assigned: reviewer.already_assigned.clone(),
            held: reviewer.already_assigned.iter().cloned().collect(),
        };
        assert_eq!(state.load(), 2);
        assert!(state.holds(&ProposalCode::from("A")));
        state.take(&ProposalCode::from("C"));
        assert_eq!(state.load(), 3);
        assert_eq!(state.assigned.len(), 3);
    }
}
