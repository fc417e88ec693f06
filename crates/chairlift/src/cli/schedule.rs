//! `chairlift schedule` - build the MIP, invoke the solver, emit the
//! timetable.

use super::CliContext;
use anyhow::{Context as _, Result};
use chairlift_protocol::types::{ProposalCode, RoomId};
use chairlift_schedule::{
    CancelToken, RoomSpec, ScheduleGrid, ScheduleInput, ScheduleRun, SlotIndex, SolverOptions,
    TalkSpec,
};
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Input spec (JSON; grid, talks, preferences, co-votes, pairs).
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the timetable JSON.
    #[arg(long)]
    pub output: PathBuf,

    /// Solver executable override.
    #[arg(long)]
    pub solver: Option<String>,

    /// Solver wall-clock limit in seconds.
    #[arg(long)]
    pub time_limit_secs: Option<u64>,

    /// Also render the timetable as a markdown grid here.
    #[arg(long)]
    pub markdown: Option<PathBuf>,
}

/// On-disk shape of the schedule input.
#[derive(Debug, Deserialize)]
struct ScheduleSpec {
    days: usize,
    sessions: usize,
    positions: usize,
    rooms: Vec<RoomFile>,
    slots: Vec<SlotFile>,
    talks: Vec<TalkFile>,
    #[serde(default)]
    prefs: Vec<PrefFile>,
    #[serde(default)]
    co_votes: Vec<CoVoteFile>,
    #[serde(default)]
    pairs: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct RoomFile {
    id: u64,
    name: String,
    #[serde(default)]
    capacity: u32,
}

#[derive(Debug, Deserialize)]
struct SlotFile {
    day: usize,
    session: usize,
    position: usize,
    room: usize,
    minutes: u32,
}

#[derive(Debug, Deserialize)]
struct TalkFile {
    code: String,
    duration: u32,
    #[serde(default)]
    main_track: Option<String>,
    #[serde(default)]
    sub_track: Option<String>,
    #[serde(default)]
    votes: u64,
    #[serde(default)]
    sponsored: bool,
}

#[derive(Debug, Deserialize)]
struct PrefFile {
    talk: String,
    day: usize,
    session: usize,
    position: usize,
    room: usize,
    pref: i8,
}

#[derive(Debug, Deserialize)]
struct CoVoteFile {
    a: String,
    b: String,
    voters: u64,
}

fn load_input(path: &PathBuf) -> Result<ScheduleInput> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let spec: ScheduleSpec =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let rooms: Vec<RoomSpec> = spec
        .rooms
        .iter()
        .map(|room| RoomSpec {
            id: RoomId::new(room.id),
            name: room.name.clone(),
            capacity: room.capacity,
        })
        .collect();
    let mut grid = ScheduleGrid::new(spec.days, spec.sessions, spec.positions, rooms);
    for slot in &spec.slots {
        grid.set_slot_length(
            SlotIndex {
                day: slot.day,
                session: slot.session,
                position: slot.position,
                room: slot.room,
            },
            slot.minutes,
        );
    }

    let talks: Vec<TalkSpec> = spec
        .talks
        .iter()
        .map(|talk| {
            let mut built = TalkSpec::new(talk.code.as_str(), talk.duration)
                .with_votes(talk.votes);
            built.main_track = talk.main_track.clone();
            built.sub_track = talk.sub_track.clone();
            built.sponsored = talk.sponsored;
            built
        })
        .collect();

    let mut input = ScheduleInput::new(grid, talks);
    for pref in &spec.prefs {
        input.set_pref(
            &ProposalCode::from(pref.talk.as_str()),
            SlotIndex {
                day: pref.day,
                session: pref.session,
                position: pref.position,
                room: pref.room,
            },
            pref.pref,
        );
    }
    for co in &spec.co_votes {
        input.set_co_votes(
            &ProposalCode::from(co.a.as_str()),
            &ProposalCode::from(co.b.as_str()),
            co.voters,
        );
    }
    for (first, second) in &spec.pairs {
        input.pair(
            &ProposalCode::from(first.as_str()),
            &ProposalCode::from(second.as_str()),
        );
    }
    Ok(input)
}

pub async fn run(context: Option<&CliContext>, args: &ScheduleArgs) -> Result<()> {
    let input = load_input(&args.input)?;

    let solver_config = context.map(|c| c.config.solver.clone()).unwrap_or_default();
    let options = SolverOptions {
        binary: args
            .solver
            .clone()
            .unwrap_or_else(|| solver_config.binary().to_string()),
        time_limit: Duration::from_secs(
            args.time_limit_secs
                .unwrap_or_else(|| solver_config.time_limit_secs()),
        ),
        scratch_root: chairlift_logging::runs_dir(),
    };

    let mut run = ScheduleRun::new();
    let timetable = run.execute(&input, &options, &CancelToken::new()).await?;

    let json = timetable.to_json()?;
    std::fs::write(&args.output, &json)
        .with_context(|| format!("writing {}", args.output.display()))?;
    if let Some(markdown) = &args.markdown {
        std::fs::write(markdown, timetable.render_markdown())
            .with_context(|| format!("writing {}", markdown.display()))?;
    }
    eprintln!(
        "scheduled {} talks -> {}",
        timetable.len(),
        args.output.display()
    );
    Ok(())
}
