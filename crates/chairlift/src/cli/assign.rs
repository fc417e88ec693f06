//! `chairlift assign` - run the reviewer allocator over a spec file.

use anyhow::{Context as _, Result};
use chairlift_assign::{assign_reviewers, save_assignments, AssignOptions, ReviewItem, Reviewer};
use chairlift_protocol::defaults;
use chairlift_protocol::types::ProposalCode;
use clap::Args;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Input spec (JSON; proposals, reviewers, aliases).
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the upload artifact.
    #[arg(long)]
    pub output: PathBuf,

    /// Extra reviewers beyond target per proposal.
    #[arg(long, default_value_t = defaults::DEFAULT_ASSIGNMENT_BUFFER)]
    pub buffer: u32,
}

/// On-disk shape of the assignment input.
#[derive(Debug, Deserialize)]
struct AssignSpec {
    proposals: Vec<ProposalSpec>,
    reviewers: Vec<ReviewerSpec>,
    #[serde(default)]
    track_aliases: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProposalSpec {
    code: String,
    #[serde(default)]
    track: Option<String>,
    #[serde(default = "default_target")]
    target_reviews: u32,
    #[serde(default)]
    completed_reviews: u32,
}

fn default_target() -> u32 {
    defaults::DEFAULT_TARGET_REVIEWS
}

#[derive(Debug, Deserialize)]
struct ReviewerSpec {
    name: String,
    email: String,
    #[serde(default)]
    tracks: Vec<String>,
    #[serde(default)]
    already_assigned: Vec<String>,
    #[serde(default)]
    wants_all: bool,
}

pub fn run(args: &AssignArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let spec: AssignSpec = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.input.display()))?;

    let proposals: Vec<ReviewItem> = spec
        .proposals
        .iter()
        .map(|p| {
            ReviewItem::new(p.code.as_str(), p.track.as_deref())
                .with_targets(p.target_reviews, p.completed_reviews)
        })
        .collect();
    let reviewers: Vec<Reviewer> = spec
        .reviewers
        .into_iter()
        .map(|r| Reviewer {
            name: r.name,
            email: r.email,
            preferred_tracks: r.tracks,
            already_assigned: r
                .already_assigned
                .iter()
                .map(|s| ProposalCode::from(s.as_str()))
                .collect(),
            wants_all: r.wants_all,
        })
        .collect();

    let mut options = AssignOptions::default().with_buffer(args.buffer);
    options.track_aliases = spec.track_aliases;

    let outcome = assign_reviewers(&proposals, &reviewers, &options)?;
    for warning in &outcome.warnings {
        tracing::warn!(?warning, "assignment warning");
    }
    for (email, load) in outcome.load_summary() {
        tracing::info!(%email, load, "reviewer load");
    }

    save_assignments(&outcome.assignments, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    eprintln!(
        "assigned {} proposals across {} reviewers -> {}",
        proposals.len(),
        reviewers.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_parses_with_defaults() {
        let spec: AssignSpec = serde_json::from_str(
            r#"{
                "proposals": [{"code": "A", "track": "ML"}],
                "reviewers": [{"name": "R1", "email": "r1@example.org", "tracks": ["ML"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.proposals[0].target_reviews, 3);
        assert_eq!(spec.proposals[0].completed_reviews, 0);
        assert!(!spec.reviewers[0].wants_all);
        assert!(spec.track_aliases.is_empty());
    }

    #[test]
    fn test_end_to_end_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("spec.json");
        let output = dir.path().join("assignments.json");
        std::fs::write(
            &input,
            r#"{
                "proposals": [
                    {"code": "P1", "track": "ML", "target_reviews": 1},
                    {"code": "P2", "track": "ML", "target_reviews": 1}
                ],
                "reviewers": [
                    {"name": "R1", "email": "r1@example.org", "tracks": ["ML"]}
                ]
            }"#,
        )
        .unwrap();

        let args = AssignArgs {
            input,
            output: output.clone(),
            buffer: 0,
        };
        run(&args).unwrap();

        let artifact = chairlift_assign::load_assignments(&output).unwrap();
        assert_eq!(
            artifact.proposals_for("r1@example.org").unwrap().len(),
            2
        );
    }
}
