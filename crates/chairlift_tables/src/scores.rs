//! Review scoring arithmetic.
//!
//! Reviewers anchor their scales differently, so raw scores are
//! debiased against each reviewer's personal mean before aggregation.
//! Public votes use a separate scale where 1 means "indifferent".

use chairlift_protocol::types::{ProposalCode, Review};
use std::collections::BTreeMap;

/// Each reviewer's personal mean score. Reviews without a score do not
/// contribute.
pub fn reviewer_means(reviews: &[Review]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for review in reviews {
        if let Some(score) = review.score {
            let entry = sums.entry(review.user.clone()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(user, (sum, n))| (user, sum / f64::from(n)))
        .collect()
}

/// Debiased score per review: raw score minus the reviewer's mean.
/// Unscored reviews are skipped.
pub fn debiased_scores(reviews: &[Review]) -> Vec<(ProposalCode, String, f64)> {
    let means = reviewer_means(reviews);
    reviews
        .iter()
        .filter_map(|review| {
            let score = review.score?;
            let mean = means.get(&review.user)?;
            Some((review.submission.clone(), review.user.clone(), score - mean))
        })
        .collect()
}

/// Aggregate score per proposal: mean of its debiased review scores.
pub fn aggregate_scores(reviews: &[Review]) -> BTreeMap<ProposalCode, f64> {
    let mut sums: BTreeMap<ProposalCode, (f64, u32)> = BTreeMap::new();
    for (proposal, _, debiased) in debiased_scores(reviews) {
        let entry = sums.entry(proposal).or_insert((0.0, 0));
        entry.0 += debiased;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(proposal, (sum, n))| (proposal, sum / f64::from(n)))
        .collect()
}

/// Vote score for one proposal's public votes.
///
/// A value of exactly 1 means "indifferent" and is discarded; 2 is
/// normalized to 1 so that higher categories dominate; higher values
/// are retained as-is.
pub fn vote_score(votes: &[u32]) -> u64 {
    votes
        .iter()
        .filter(|&&vote| vote > 1)
        .map(|&vote| if vote == 2 { 1 } else { u64::from(vote) })
        .sum()
}

/// Vote scores per proposal.
pub fn vote_scores(votes: &BTreeMap<ProposalCode, Vec<u32>>) -> BTreeMap<ProposalCode, u64> {
    votes
        .iter()
        .map(|(proposal, values)| (proposal.clone(), vote_score(values)))
        .collect()
}

/// One proposal's standing after review aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalRank {
    pub proposal: ProposalCode,
    /// Mean of debiased review scores; 0 when unreviewed.
    pub aggregate: f64,
    /// Public-vote signal.
    pub votes: u64,
}

/// Rank proposals by aggregate review score, public votes breaking
/// ties, proposal code as the final tie-break. Proposals that appear
/// only in the vote table still rank (with aggregate 0).
pub fn rank_proposals(
    reviews: &[Review],
    votes: &BTreeMap<ProposalCode, Vec<u32>>,
) -> Vec<ProposalRank> {
    let aggregates = aggregate_scores(reviews);
    let vote_totals = vote_scores(votes);

    let mut codes: Vec<ProposalCode> = aggregates.keys().cloned().collect();
    for code in vote_totals.keys() {
        if !aggregates.contains_key(code) {
            codes.push(code.clone());
        }
    }

    let mut ranking: Vec<ProposalRank> = codes
        .into_iter()
        .map(|proposal| {
            let aggregate = aggregates.get(&proposal).copied().unwrap_or(0.0);
            let votes = vote_totals.get(&proposal).copied().unwrap_or(0);
            ProposalRank {
                proposal,
                aggregate,
                votes,
            }
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.aggregate
            .partial_cmp(&a.aggregate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.votes.cmp(&a.votes))
            .then(a.proposal.cmp(&b.proposal))
    });
    ranking
}
