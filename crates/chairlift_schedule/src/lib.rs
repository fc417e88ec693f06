//! Schedule optimization: lay accepted talks out across days,
//! sessions, slots, and rooms as a mixed-integer program.
//!
//! The model is built in-process ([`builder`]), exchanged with an
//! out-of-process solver as an LP file ([`model`], [`solver`]), and
//! the solution is folded back into a [`timetable::Timetable`]. The
//! [`run::ScheduleRun`] coordinator tracks the stage machine.

pub mod builder;
pub mod error;
pub mod model;
pub mod params;
pub mod run;
pub mod solver;
pub mod timetable;

pub use builder::build_model;
pub use error::{Result, ScheduleError};
pub use model::{ConstraintSense, MipModel, VarId};
pub use params::{RoomSpec, ScheduleGrid, ScheduleInput, SlotIndex, TalkSpec};
pub use run::{RunStage, ScheduleRun};
pub use chairlift_protocol::cancel::CancelToken;
pub use solver::{parse_solution, solve, SolverOptions};
pub use timetable::{
    session_label, timetable_from_solution, RoomDrift, Timetable, TimetableEntry,
};
