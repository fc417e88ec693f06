//! Flat row projections.
//!
//! Proposals explode to one speaker per row (with a re-implode step
//! back to one row per proposal); speakers explode to one proposal per
//! row; reviews map one to one.

use chairlift_protocol::types::{
    Expandable, Proposal, ProposalCode, ProposalState, Review, ReviewId, Speaker, SpeakerCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Split a track name into (main, sub) on the first colon.
///
/// `"PyData: Machine Learning"` -> `("PyData", Some("Machine Learning"))`.
pub fn split_track(name: &str) -> (String, Option<String>) {
    match name.split_once(':') {
        Some((main, sub)) => (main.trim().to_string(), Some(sub.trim().to_string())),
        None => (name.trim().to_string(), None),
    }
}

/// One (proposal, speaker) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalRow {
    pub code: ProposalCode,
    pub title: String,
    pub track: Option<String>,
    pub main_track: Option<String>,
    pub sub_track: Option<String>,
    pub submission_type: Option<String>,
    pub state: ProposalState,
    pub duration: u32,
    pub slot_count: u32,
    pub speaker_code: Option<SpeakerCode>,
    pub speaker_name: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// One row per proposal with speakers re-imploded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalSummary {
    pub code: ProposalCode,
    pub title: String,
    pub track: Option<String>,
    pub main_track: Option<String>,
    pub sub_track: Option<String>,
    pub submission_type: Option<String>,
    pub state: ProposalState,
    pub duration: u32,
    pub slot_count: u32,
    pub speaker_codes: Vec<SpeakerCode>,
    pub speaker_names: Vec<String>,
}

/// One (speaker, proposal) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerRow {
    pub code: SpeakerCode,
    pub name: String,
    pub proposal: Option<ProposalCode>,
}

/// One row per review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub proposal: ProposalCode,
    pub reviewer: String,
    pub score: Option<f64>,
    pub created: Option<DateTime<Utc>>,
}

fn track_columns(proposal: &Proposal) -> (Option<String>, Option<String>, Option<String>) {
    let name = proposal.track_name("en").map(str::to_string);
    match name {
        Some(full) => {
            let (main, sub) = split_track(&full);
            (Some(full), Some(main), sub)
        }
        None => (None, None, None),
    }
}

/// Explode proposals to one speaker per row. Proposals without
/// speakers still produce a single row with empty speaker columns.
pub fn proposals_to_rows(proposals: &[Proposal]) -> Vec<ProposalRow> {
    let mut rows = Vec::new();
    for proposal in proposals {
        let (track, main_track, sub_track) = track_columns(proposal);
        let submission_type = proposal
            .submission_type
            .as_full()
            .map(|t| t.name.localized("en").to_string());
        let base = ProposalRow {
            code: proposal.code.clone(),
            title: proposal.title.clone(),
            track,
            main_track,
            sub_track,
            submission_type,
            state: proposal.state,
            duration: proposal.duration,
            slot_count: proposal.slot_count,
            speaker_code: None,
            speaker_name: None,
            created: proposal.created,
        };

        if proposal.speakers.is_empty() {
            rows.push(base);
            continue;
        }
        for speaker in &proposal.speakers {
            let mut row = base.clone();
            match speaker {
                Expandable::Ref(code) => row.speaker_code = Some(code.clone()),
                Expandable::Full(full) => {
                    row.speaker_code = Some(full.code.clone());
                    row.speaker_name = Some(full.name.clone());
                }
            }
            rows.push(row);
        }
    }
    rows
}

/// Re-implode speaker-per-row output back to one row per proposal,
/// preserving first-appearance order of both proposals and speakers.
pub fn implode_proposal_rows(rows: &[ProposalRow]) -> Vec<ProposalSummary> {
    let mut summaries: Vec<ProposalSummary> = Vec::new();
    for row in rows {
        let summary = match summaries.iter_mut().find(|s| s.code == row.code) {
            Some(existing) => existing,
            None => {
                summaries.push(ProposalSummary {
                    code: row.code.clone(),
                    title: row.title.clone(),
                    track: row.track.clone(),
                    main_track: row.main_track.clone(),
                    sub_track: row.sub_track.clone(),
                    submission_type: row.submission_type.clone(),
                    state: row.state,
                    duration: row.duration,
                    slot_count: row.slot_count,
                    speaker_codes: Vec::new(),
                    speaker_names: Vec::new(),
                });
                summaries.last_mut().unwrap()
            }
        };
        if let Some(code) = &row.speaker_code {
            if !summary.speaker_codes.contains(code) {
                summary.speaker_codes.push(code.clone());
            }
        }
        if let Some(name) = &row.speaker_name {
            if !summary.speaker_names.contains(name) {
                summary.speaker_names.push(name.clone());
            }
        }
    }
    summaries
}

/// Explode speakers to one proposal per row.
pub fn speakers_to_rows(speakers: &[Speaker]) -> Vec<SpeakerRow> {
    let mut rows = Vec::new();
    for speaker in speakers {
        if speaker.submissions.is_empty() {
            rows.push(SpeakerRow {
                code: speaker.code.clone(),
                name: speaker.name.clone(),
                proposal: None,
            });
            continue;
        }
        for proposal in &speaker.submissions {
            rows.push(SpeakerRow {
                code: speaker.code.clone(),
                name: speaker.name.clone(),
                proposal: Some(proposal.clone()),
            });
        }
    }
    rows
}

pub fn reviews_to_rows(reviews: &[Review]) -> Vec<ReviewRow> {
    reviews
        .iter()
        .map(|review| ReviewRow {
            id: review.id,
            proposal: review.submission.clone(),
            reviewer: review.user.clone(),
            score: review.score,
            created: review.created,
        })
        .collect()
}
