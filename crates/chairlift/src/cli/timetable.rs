//! `chairlift timetable` - render a previously emitted timetable.

use anyhow::{Context as _, Result};
use chairlift_schedule::Timetable;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TimetableArgs {
    /// Timetable JSON emitted by `chairlift schedule`.
    #[arg(long)]
    pub input: PathBuf,

    /// Write the markdown grid here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &TimetableArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let timetable: Timetable =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", args.input.display()))?;

    let rendered = timetable.render_markdown();
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
