//! Scheduling run lifecycle.
//!
//! A run walks Collecting -> Building -> Writing -> Solving -> Loading
//! -> Emitting; any stage may drop to Failed. Terminal states are
//! Emitted and Failed.

use crate::builder::build_model;
use crate::error::Result;
use crate::params::ScheduleInput;
use crate::solver::{solve_written, write_model, SolverOptions};
use crate::timetable::{timetable_from_solution, Timetable};
use chairlift_protocol::cancel::CancelToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stage of a scheduling run.
/// This is the CANONICAL definition - progress reporting and the CLI
/// both display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    #[default]
    Collecting,
    Building,
    Writing,
    Solving,
    Loading,
    Emitting,
    Emitted,
    Failed,
}

impl RunStage {
    pub const ALL: &'static [RunStage] = &[
        RunStage::Collecting,
        RunStage::Building,
        RunStage::Writing,
        RunStage::Solving,
        RunStage::Loading,
        RunStage::Emitting,
        RunStage::Emitted,
        RunStage::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Collecting => "COLLECTING",
            RunStage::Building => "BUILDING",
            RunStage::Writing => "WRITING",
            RunStage::Solving => "SOLVING",
            RunStage::Loading => "LOADING",
            RunStage::Emitting => "EMITTING",
            RunStage::Emitted => "EMITTED",
            RunStage::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Emitted | RunStage::Failed)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COLLECTING" => Ok(RunStage::Collecting),
            "BUILDING" => Ok(RunStage::Building),
            "WRITING" => Ok(RunStage::Writing),
            "SOLVING" => Ok(RunStage::Solving),
            "LOADING" => Ok(RunStage::Loading),
            "EMITTING" => Ok(RunStage::Emitting),
            "EMITTED" => Ok(RunStage::Emitted),
            "FAILED" => Ok(RunStage::Failed),
            other => Err(format!("unknown run stage: {other}")),
        }
    }
}

/// Coordinator for one scheduling run. Re-runs regenerate from
/// scratch; there is no repair of a previous timetable.
pub struct ScheduleRun {
    stage: RunStage,
}

impl Default for ScheduleRun {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRun {
    pub fn new() -> Self {
        Self {
            stage: RunStage::Collecting,
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn advance(&mut self, next: RunStage) {
        tracing::info!(from = %self.stage, to = %next, "run stage");
        self.stage = next;
    }

    /// Execute the run end to end.
    pub async fn execute(
        &mut self,
        input: &ScheduleInput,
        options: &SolverOptions,
        cancel: &CancelToken,
    ) -> Result<Timetable> {
        match self.execute_inner(input, options, cancel).await {
            Ok(timetable) => {
                self.advance(RunStage::Emitted);
                Ok(timetable)
            }
            Err(error) => {
                self.advance(RunStage::Failed);
                Err(error)
            }
        }
    }

    async fn execute_inner(
        &mut self,
        input: &ScheduleInput,
        options: &SolverOptions,
        cancel: &CancelToken,
    ) -> Result<Timetable> {
        input.validate()?;
        if input.talks.is_empty() {
            // Nothing to place; skip the solver entirely.
            return Ok(Timetable::default());
        }

        self.advance(RunStage::Building);
        let model = build_model(input)?;
        tracing::info!(
            vars = model.var_count(),
            constraints = model.constraints().len(),
            talks = input.talks.len(),
            "built schedule model"
        );

        self.advance(RunStage::Writing);
        let run = write_model(&model, options)?;

        self.advance(RunStage::Solving);
        let values = match solve_written(&run, options, cancel).await {
            Ok(values) => {
                let _ = std::fs::remove_dir_all(&run.dir);
                values
            }
            Err(crate::error::ScheduleError::Cancelled) => {
                let _ = std::fs::remove_dir_all(&run.dir);
                return Err(crate::error::ScheduleError::Cancelled);
            }
            Err(error) => {
                tracing::warn!(dir = %run.dir.display(), "preserving solver scratch");
                return Err(error);
            }
        };

        self.advance(RunStage::Loading);
        let objective = model.objective_value(&values);
        tracing::info!(objective, "loaded solver solution");

        self.advance(RunStage::Emitting);
        timetable_from_solution(input, &values)
    }
}
