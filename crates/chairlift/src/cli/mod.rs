//! CLI surface: fetch, assign, schedule, config.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod assign;
mod config;
mod context;
mod fetch;
mod schedule;
mod timetable;

pub use context::CliContext;

#[derive(Parser, Debug)]
#[command(
    name = "chairlift",
    about = "Program management for technical conferences",
    version
)]
pub struct Cli {
    /// Mirror the full log filter onto stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Config file path (default: ~/.chairlift/config.toml).
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pull data from the upstream conference service.
    Fetch(fetch::FetchArgs),
    /// Distribute proposals to reviewers.
    Assign(assign::AssignArgs),
    /// Lay accepted talks out across days, sessions, and rooms.
    Schedule(schedule::ScheduleArgs),
    /// Render an emitted timetable as a markdown grid.
    Timetable(timetable::TimetableArgs),
    /// Inspect the user configuration.
    Config(config::ConfigArgs),
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fetch(ref args) => {
            let context = CliContext::load(cli.config.as_deref())?;
            fetch::run(&context, args).await
        }
        Command::Assign(ref args) => assign::run(args),
        Command::Schedule(ref args) => {
            let context = CliContext::load_optional(cli.config.as_deref());
            schedule::run(context.as_ref(), args).await
        }
        Command::Timetable(ref args) => timetable::run(args),
        Command::Config(ref args) => config::run(cli.config.as_deref(), args),
    }
}
