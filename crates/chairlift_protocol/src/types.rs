//! Wire payload types for the upstream conference-management API.
//!
//! These mirror the upstream JSON schema under the pinned wire version.
//! Newer wire versions replace nested objects with identifier references;
//! [`Expandable`] models both forms so the client can reconstruct the
//! nested view from its expansion cache.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Identifier newtypes
// ============================================================================

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

numeric_id!(
    /// Track identifier.
    TrackId
);
numeric_id!(
    /// Submission type identifier.
    SubmissionTypeId
);
numeric_id!(
    /// Review identifier.
    ReviewId
);
numeric_id!(
    /// Room identifier.
    RoomId
);
numeric_id!(
    /// Question identifier.
    QuestionId
);
numeric_id!(
    /// Answer identifier.
    AnswerId
);
numeric_id!(
    /// Identifier of a closed answer option on a question.
    OptionId
);

macro_rules! string_code {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_code!(
    /// Opaque short code identifying a proposal.
    ProposalCode
);
string_code!(
    /// Opaque short code identifying a speaker within an event.
    SpeakerCode
);
string_code!(
    /// URL slug identifying an event.
    EventSlug
);

// ============================================================================
// MultiLingualString
// ============================================================================

/// Mapping from language tag to display string.
///
/// The upstream keys these by IETF language tag with `en` present by
/// convention. Equality is structural. The map is ordered so that
/// serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MultiLingualString(BTreeMap<String, String>);

impl MultiLingualString {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Construct with a single English value.
    pub fn en(value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert("en".to_string(), value.into());
        Self(map)
    }

    pub fn insert(&mut self, lang: impl Into<String>, value: impl Into<String>) {
        self.0.insert(lang.into(), value.into());
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    /// The value for `lang`, falling back to `en`, then to any entry.
    pub fn localized(&self, lang: &str) -> &str {
        self.get(lang)
            .or_else(|| self.get("en"))
            .or_else(|| self.0.values().next().map(String::as_str))
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MultiLingualString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.localized("en"))
    }
}

impl From<&str> for MultiLingualString {
    fn from(value: &str) -> Self {
        Self::en(value)
    }
}

// ============================================================================
// Expandable references
// ============================================================================

/// A nested entity that the wire may carry either as a bare identifier
/// reference or as the full record.
///
/// Older wire versions inline the full record; newer versions send the
/// identifier and expect clients to resolve it. Serialization is
/// untagged: a JSON scalar parses as `Ref`, an object as `Full`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<I, T> {
    Ref(I),
    Full(Box<T>),
}

impl<I, T> Expandable<I, T> {
    pub fn is_full(&self) -> bool {
        matches!(self, Expandable::Full(_))
    }

    /// The bare reference, if not yet expanded.
    pub fn as_ref_id(&self) -> Option<&I> {
        match self {
            Expandable::Ref(id) => Some(id),
            Expandable::Full(_) => None,
        }
    }

    /// The full record, if expanded.
    pub fn as_full(&self) -> Option<&T> {
        match self {
            Expandable::Ref(_) => None,
            Expandable::Full(record) => Some(record),
        }
    }

    /// Replace a `Ref` with the full record. Idempotent on `Full`.
    pub fn expand(&mut self, record: T) {
        *self = Expandable::Full(Box::new(record));
    }
}

// ============================================================================
// Proposal lifecycle
// ============================================================================

/// Lifecycle state of a proposal.
/// This is the CANONICAL definition - every crate matches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProposalState {
    #[default]
    Submitted,
    Accepted,
    Confirmed,
    Rejected,
    Withdrawn,
    Canceled,
    Deleted,
}

impl ProposalState {
    pub const ALL: &'static [ProposalState] = &[
        ProposalState::Submitted,
        ProposalState::Accepted,
        ProposalState::Confirmed,
        ProposalState::Rejected,
        ProposalState::Withdrawn,
        ProposalState::Canceled,
        ProposalState::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalState::Submitted => "submitted",
            ProposalState::Accepted => "accepted",
            ProposalState::Confirmed => "confirmed",
            ProposalState::Rejected => "rejected",
            ProposalState::Withdrawn => "withdrawn",
            ProposalState::Canceled => "canceled",
            ProposalState::Deleted => "deleted",
        }
    }

    /// States that place a proposal in the program.
    pub fn is_accepted_like(&self) -> bool {
        matches!(self, ProposalState::Accepted | ProposalState::Confirmed)
    }

    /// States from which no further transition happens.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Rejected
                | ProposalState::Withdrawn
                | ProposalState::Canceled
                | ProposalState::Deleted
        )
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProposalState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "submitted" => Ok(ProposalState::Submitted),
            "accepted" => Ok(ProposalState::Accepted),
            "confirmed" => Ok(ProposalState::Confirmed),
            "rejected" => Ok(ProposalState::Rejected),
            "withdrawn" => Ok(ProposalState::Withdrawn),
            "canceled" | "cancelled" => Ok(ProposalState::Canceled),
            "deleted" => Ok(ProposalState::Deleted),
            other => Err(StateParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown proposal state: {0}")]
pub struct StateParseError(pub String);

// ============================================================================
// Core entities
// ============================================================================

/// Auxiliary URLs the upstream exposes for a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProposalUrls {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub edit: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
}

/// A talk submission in any lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub code: ProposalCode,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub submission_type: Expandable<SubmissionTypeId, SubmissionType>,
    #[serde(default)]
    pub track: Option<Expandable<TrackId, Track>>,
    pub state: ProposalState,
    #[serde(default)]
    pub pending_state: Option<ProposalState>,
    /// Talk length in minutes. Always positive on the wire.
    pub duration: u32,
    /// Number of consecutive slots the talk occupies. Multi-part
    /// tutorials set this above 1.
    #[serde(default = "default_slot_count")]
    pub slot_count: u32,
    #[serde(default)]
    pub speakers: Vec<Expandable<SpeakerCode, Speaker>>,
    #[serde(default)]
    pub answers: Vec<Expandable<AnswerId, Answer>>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub urls: Option<ProposalUrls>,
    /// Published placement, if the upstream has released a schedule.
    #[serde(default)]
    pub slot: Option<WireSlot>,
}

fn default_slot_count() -> u32 {
    1
}

/// Placement of an already-published talk, as the upstream reports it.
/// Present on proposals only after a schedule release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSlot {
    #[serde(default)]
    pub room: Option<Expandable<RoomId, Room>>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl WireSlot {
    /// Scheduled length in minutes, when both ends are known.
    pub fn duration_minutes(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if end > start => {
                Some((end - start).num_minutes())
            }
            _ => None,
        }
    }
}

impl Proposal {
    /// Track name in the requested language, if the track is expanded.
    pub fn track_name(&self, lang: &str) -> Option<&str> {
        self.track
            .as_ref()
            .and_then(Expandable::as_full)
            .map(|t| t.name.localized(lang))
    }

    /// Speaker codes regardless of expansion state.
    pub fn speaker_codes(&self) -> Vec<SpeakerCode> {
        self.speakers
            .iter()
            .map(|s| match s {
                Expandable::Ref(code) => code.clone(),
                Expandable::Full(speaker) => speaker.code.clone(),
            })
            .collect()
    }
}

/// Time window during which a speaker or room is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AvailabilityWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// A person attached to one or more proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub code: SpeakerCode,
    pub name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default, alias = "avatar")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub submissions: Vec<ProposalCode>,
    #[serde(default)]
    pub answers: Vec<Expandable<AnswerId, Answer>>,
    #[serde(default)]
    pub availabilities: Vec<AvailabilityWindow>,
}

/// A review written by a reviewer against one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub submission: ProposalCode,
    /// Reviewer user code or free-form name, consistent within an event.
    pub user: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// A physical room talks are scheduled into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: MultiLingualString,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub availabilities: Vec<AvailabilityWindow>,
}

/// Taxonomic grouping of proposals.
///
/// Track names use a `main: sub` convention; the prefix before the
/// first colon is the main track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: MultiLingualString,
}

/// Kind of submission (talk, tutorial, keynote, sponsored, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionType {
    pub id: SubmissionTypeId,
    pub name: MultiLingualString,
    #[serde(default)]
    pub default_duration: Option<u32>,
}

/// Free-form label attached to proposals by organizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    #[serde(default)]
    pub description: Option<MultiLingualString>,
    #[serde(default)]
    pub color: Option<String>,
}

// ============================================================================
// Questions & answers
// ============================================================================

/// What a question is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionTarget {
    #[default]
    Submission,
    Speaker,
    Reviewer,
}

impl QuestionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionTarget::Submission => "submission",
            QuestionTarget::Speaker => "speaker",
            QuestionTarget::Reviewer => "reviewer",
        }
    }
}

impl fmt::Display for QuestionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One choice of a closed-set question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub answer: MultiLingualString,
}

/// A custom question organizers attach to proposals, speakers or reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub question: MultiLingualString,
    #[serde(default)]
    pub target: QuestionTarget,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
}

/// An answer binding (question, target, value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub question: Expandable<QuestionId, Question>,
    pub answer: String,
    #[serde(default)]
    pub submission: Option<ProposalCode>,
    #[serde(default)]
    pub person: Option<SpeakerCode>,
    #[serde(default)]
    pub review: Option<ReviewId>,
    #[serde(default)]
    pub options: Vec<OptionId>,
}

// ============================================================================
// Events & users
// ============================================================================

/// A conference edition hosted on the upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub slug: EventSlug,
    pub name: MultiLingualString,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl Event {
    /// Number of conference days, inclusive of both ends.
    pub fn day_count(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }
}

/// Profile returned by the authenticated-user endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Me {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

// ============================================================================
// Pagination envelope
// ============================================================================

/// Envelope the upstream wraps around list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Single-page envelope with no further cursor.
    pub fn single(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }
}

// ============================================================================
// Assignment upload artifact
// ============================================================================

/// One reviewer's worth of the bulk-assignment upload document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub email: String,
    pub proposals: Vec<ProposalCode>,
}

/// The bulk-assignment document uploaded verbatim to the upstream:
/// `[{"email": ..., "proposals": [...]}, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ReviewerAssignments(pub Vec<AssignmentEntry>);

impl ReviewerAssignments {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, email: impl Into<String>, proposals: Vec<ProposalCode>) {
        self.0.push(AssignmentEntry {
            email: email.into(),
            proposals,
        });
    }

    pub fn entries(&self) -> &[AssignmentEntry] {
        &self.0
    }

    pub fn proposals_for(&self, email: &str) -> Option<&[ProposalCode]> {
        self.0
            .iter()
            .find(|e| e.email == email)
            .map(|e| e.proposals.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
