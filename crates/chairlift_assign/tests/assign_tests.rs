//! Allocation scenarios and invariants.

use chairlift_assign::{
    assign_reviewers, AssignError, AssignOptions, AssignWarning, ReviewItem, Reviewer,
};
use chairlift_protocol::types::ProposalCode;

fn options(buffer: u32) -> AssignOptions {
    AssignOptions::default().with_buffer(buffer)
}

#[test]
fn two_proposals_two_reviewers_meet_target() {
    // 2 proposals in track "ML" (target=2 each), 2 reviewers both
    // preferring "ML", buffer=0: each proposal lands on both reviewers.
    let proposals = vec![
        ReviewItem::new("P1", Some("ML")).with_targets(2, 0),
        ReviewItem::new("P2", Some("ML")).with_targets(2, 0),
    ];
    let reviewers = vec![
        Reviewer::new("R1", "r1@example.org").preferring(&["ML"]),
        Reviewer::new("R2", "r2@example.org").preferring(&["ML"]),
    ];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap();
    assert!(outcome.warnings.is_empty());

    for email in ["r1@example.org", "r2@example.org"] {
        let assigned = outcome.assignments.proposals_for(email).unwrap();
        assert_eq!(assigned.len(), 2, "{email} should hold both proposals");
        assert!(assigned.contains(&ProposalCode::from("P1")));
        assert!(assigned.contains(&ProposalCode::from("P2")));
    }
}

#[test]
fn wants_all_reviewer_receives_everything() {
    let proposals = vec![
        ReviewItem::new("P1", Some("ML")).with_targets(2, 0),
        ReviewItem::new("P2", Some("ML")).with_targets(2, 0),
    ];
    let reviewers = vec![
        Reviewer::new("R1", "r1@example.org").preferring(&["ML"]),
        Reviewer::new("R2", "r2@example.org").preferring(&["ML"]),
        Reviewer::new("R3", "r3@example.org").wants_all(),
    ];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap();
    let r3 = outcome.assignments.proposals_for("r3@example.org").unwrap();
    assert_eq!(
        r3,
        &[ProposalCode::from("P1"), ProposalCode::from("P2")][..]
    );
    // R1 and R2 still meet the target between themselves.
    assert_eq!(
        outcome
            .assignments
            .proposals_for("r1@example.org")
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        outcome
            .assignments
            .proposals_for("r2@example.org")
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn empty_proposal_set_is_fine() {
    let reviewers = vec![Reviewer::new("R1", "r1@example.org")];
    let outcome = assign_reviewers(&[], &reviewers, &options(2)).unwrap();
    assert!(outcome.warnings.is_empty());
    assert_eq!(
        outcome.assignments.proposals_for("r1@example.org").unwrap(),
        &[] as &[ProposalCode]
    );
}

#[test]
fn single_reviewer_takes_each_proposal_once() {
    let proposals = vec![
        ReviewItem::new("P1", Some("ML")).with_targets(3, 0),
        ReviewItem::new("P2", Some("ML")).with_targets(3, 0),
    ];
    let reviewers = vec![Reviewer::new("R1", "r1@example.org").preferring(&["ML"])];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(2)).unwrap();
    let assigned = outcome.assignments.proposals_for("r1@example.org").unwrap();
    // A single reviewer cannot hold a proposal twice; the surplus
    // demand is dropped with a warning per proposal.
    assert_eq!(assigned.len(), 2);
    assert_eq!(
        outcome
            .warnings
            .iter()
            .filter(|w| matches!(w, AssignWarning::NoReviewer { .. }))
            .count(),
        2
    );
}

#[test]
fn completed_proposals_receive_no_new_assignments() {
    let proposals = vec![
        ReviewItem::new("DONE", Some("ML")).with_targets(2, 2),
        ReviewItem::new("OPEN", Some("ML")).with_targets(2, 1),
    ];
    let reviewers = vec![
        Reviewer::new("R1", "r1@example.org").preferring(&["ML"]),
        Reviewer::new("R2", "r2@example.org").preferring(&["ML"]),
    ];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap();
    for email in ["r1@example.org", "r2@example.org"] {
        let assigned = outcome.assignments.proposals_for(email).unwrap();
        assert!(!assigned.contains(&ProposalCode::from("DONE")));
    }
}

#[test]
fn already_reviewed_proposals_are_never_reassigned() {
    let proposals = vec![ReviewItem::new("P1", Some("ML")).with_targets(2, 0)];
    let reviewers = vec![
        Reviewer::new("R1", "r1@example.org")
            .preferring(&["ML"])
            .holding(&["P1"]),
        Reviewer::new("R2", "r2@example.org").preferring(&["ML"]),
    ];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap();
    let r1 = outcome.assignments.proposals_for("r1@example.org").unwrap();
    // R1 keeps exactly one copy of P1.
    assert_eq!(
        r1.iter().filter(|p| p.as_str() == "P1").count(),
        1
    );
    let r2 = outcome.assignments.proposals_for("r2@example.org").unwrap();
    assert!(r2.contains(&ProposalCode::from("P1")));
}

#[test]
fn least_loaded_reviewer_wins_with_stable_ties() {
    let proposals = vec![
        ReviewItem::new("P1", Some("ML")).with_targets(1, 0),
        ReviewItem::new("P2", Some("ML")).with_targets(1, 0),
    ];
    // R1 carries two prior assignments, so the least-loaded rule sends
    // both new proposals to R2.
    let reviewers = vec![
        Reviewer::new("R1", "r1@example.org")
            .preferring(&["ML"])
            .holding(&["OLD1", "OLD2"]),
        Reviewer::new("R2", "r2@example.org").preferring(&["ML"]),
    ];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap();
    let r2 = outcome.assignments.proposals_for("r2@example.org").unwrap();
    assert!(r2.contains(&ProposalCode::from("P1")));
    assert!(r2.contains(&ProposalCode::from("P2")));
}

#[test]
fn track_without_preference_falls_back_with_warning() {
    let proposals = vec![
        ReviewItem::new("P1", Some("ML")).with_targets(1, 0),
        ReviewItem::new("P2", None).with_targets(1, 0),
    ];
    let reviewers = vec![Reviewer::new("R1", "r1@example.org").preferring(&["ML"])];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap();
    assert!(outcome
        .warnings
        .contains(&AssignWarning::FallbackReviewer {
            proposal: ProposalCode::from("P2"),
            track: None,
        }));
    let r1 = outcome.assignments.proposals_for("r1@example.org").unwrap();
    assert_eq!(r1.len(), 2);
}

#[test]
fn track_mismatch_is_fatal() {
    let proposals = vec![ReviewItem::new("P1", Some("Security")).with_targets(1, 0)];
    let reviewers = vec![Reviewer::new("R1", "r1@example.org").preferring(&["ML"])];

    let error = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap_err();
    match error {
        AssignError::TrackMismatch {
            only_in_submissions,
            only_in_reviewers,
        } => {
            assert_eq!(only_in_submissions, vec!["Security".to_string()]);
            assert_eq!(only_in_reviewers, vec!["ML".to_string()]);
        }
    }
}

#[test]
fn alias_table_absorbs_taxonomy_drift() {
    let proposals = vec![ReviewItem::new("P1", Some("Machine Learning")).with_targets(1, 0)];
    let reviewers = vec![Reviewer::new("R1", "r1@example.org").preferring(&["ML"])];

    let options = options(0).alias("Machine Learning", "ML");
    let outcome = assign_reviewers(&proposals, &reviewers, &options).unwrap();
    assert!(outcome.warnings.is_empty());
    assert_eq!(
        outcome
            .assignments
            .proposals_for("r1@example.org")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn identical_inputs_yield_byte_identical_output() {
    let proposals: Vec<ReviewItem> = (0..20)
        .map(|i| {
            ReviewItem::new(format!("P{i:02}"), Some(if i % 2 == 0 { "ML" } else { "Web" }))
                .with_targets(3, (i % 3) as u32)
        })
        .collect();
    let reviewers: Vec<Reviewer> = (0..5)
        .map(|i| {
            let prefs: &[&str] = if i % 2 == 0 { &["ML", "Web"] } else { &["Web"] };
            Reviewer::new(format!("R{i}"), format!("r{i}@example.org")).preferring(prefs)
        })
        .collect();

    let first = assign_reviewers(&proposals, &reviewers, &options(2)).unwrap();
    let second = assign_reviewers(&proposals, &reviewers, &options(2)).unwrap();
    assert_eq!(
        first.assignments.to_json().unwrap(),
        second.assignments.to_json().unwrap()
    );
}

#[test]
fn coverage_invariant_holds_across_mixed_inputs() {
    // Every proposal with open demand ends with at least
    // min(target - completed, pool) distinct reviewers.
    let tracks = ["ML", "Web", "Systems"];
    let proposals: Vec<ReviewItem> = (0..30)
        .map(|i| {
            ReviewItem::new(
                format!("P{i:02}"),
                Some(tracks[i % tracks.len()]),
            )
            .with_targets(3, (i % 4) as u32)
        })
        .collect();
    let reviewers: Vec<Reviewer> = (0..7)
        .map(|i| {
            let prefs: &[&str] = match i % 3 {
                0 => &["ML", "Web"],
                1 => &["Web", "Systems"],
                _ => &["Systems", "ML"],
            };
            Reviewer::new(format!("R{i}"), format!("r{i}@example.org")).preferring(prefs)
        })
        .collect();

    let outcome = assign_reviewers(&proposals, &reviewers, &options(0)).unwrap();
    for item in &proposals {
        let holders = reviewers
            .iter()
            .filter(|reviewer| {
                outcome
                    .assignments
                    .proposals_for(&reviewer.email)
                    .unwrap()
                    .contains(&item.code)
            })
            .count();
        let needed = item
            .target_reviews
            .saturating_sub(item.completed_reviews)
            .min(reviewers.len() as u32) as usize;
        assert!(
            holders >= needed,
            "{} has {holders} reviewers, needs {needed}",
            item.code
        );
    }
    assert_eq!(outcome.dropped_count(), 0);
}

#[test]
fn buffer_adds_extra_reviewers_beyond_target() {
    let proposals = vec![ReviewItem::new("P1", Some("ML")).with_targets(1, 0)];
    let reviewers = vec![
        Reviewer::new("R1", "r1@example.org").preferring(&["ML"]),
        Reviewer::new("R2", "r2@example.org").preferring(&["ML"]),
        Reviewer::new("R3", "r3@example.org").preferring(&["ML"]),
    ];

    let outcome = assign_reviewers(&proposals, &reviewers, &options(2)).unwrap();
    let holders = ["r1@example.org", "r2@example.org", "r3@example.org"]
        .iter()
        .filter(|email| {
            outcome
                .assignments
                .proposals_for(email)
                .unwrap()
                .contains(&ProposalCode::from("P1"))
        })
        .count();
    // target 1 + buffer 2 = three distinct reviewers.
    assert_eq!(holders, 3);
}
