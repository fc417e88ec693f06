//! Shared wire types, configuration, and defaults for Chairlift.
//!
//! Everything that crosses a process or crate boundary lives here:
//! the upstream JSON payload types, the paged response envelope, the
//! assignment upload artifact, and the user-level TOML configuration.

pub mod cancel;
pub mod config;
pub mod defaults;
pub mod types;

pub use cancel::CancelToken;
pub use config::{Config, ConfigError, SolverConfig, UpstreamConfig};
pub use types::{
    Answer, AnswerId, AnswerOption, AssignmentEntry, AvailabilityWindow, Event, EventSlug,
    Expandable, Me, MultiLingualString, OptionId, Page, Proposal, ProposalCode, ProposalState,
    ProposalUrls, Question, QuestionId, QuestionTarget, Review, ReviewId, ReviewerAssignments,
    Room, RoomId, Speaker, SpeakerCode, SubmissionType, SubmissionTypeId, Tag, Track, TrackId,
    WireSlot,
};
