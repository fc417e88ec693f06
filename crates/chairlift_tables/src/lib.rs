//! Tabular projections of wire records.
//!
//! Pure transformations from the nested entity form into flat rows the
//! assignment and scheduling engines consume, plus the review scoring
//! arithmetic (reviewer bias correction and public-vote scores).

pub mod rows;
pub mod scores;

pub use rows::{
    implode_proposal_rows, proposals_to_rows, reviews_to_rows, speakers_to_rows, split_track,
    ProposalRow, ProposalSummary, ReviewRow, SpeakerRow,
};
pub use scores::{
    aggregate_scores, debiased_scores, rank_proposals, reviewer_means, vote_score, vote_scores,
    ProposalRank,
};
