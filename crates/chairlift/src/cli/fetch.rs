//! `chairlift fetch` - pull upstream data and emit JSON.

use super::CliContext;
use anyhow::{Context as _, Result};
use chairlift_client::QueryParams;
use chairlift_protocol::types::EventSlug;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Resource {
    Submissions,
    Talks,
    Speakers,
    Reviews,
    Rooms,
    Questions,
    Tracks,
    Me,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Wire records as returned by the upstream.
    #[default]
    Raw,
    /// Flat row projections (submissions, talks, speakers, reviews).
    Rows,
    /// Debiased aggregate scores per proposal (reviews only).
    Scores,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Event slug on the upstream, e.g. `rustconf-2026`. Required for
    /// everything except `me`.
    #[arg(long)]
    pub event: Option<String>,

    #[arg(value_enum)]
    pub resource: Resource,

    /// Server-side state filter (repeatable), e.g. `accepted`.
    #[arg(long)]
    pub state: Vec<String>,

    /// Ask the upstream to inline all question answers.
    #[arg(long)]
    pub questions_all: bool,

    /// Bound the query to at most N records.
    #[arg(long)]
    pub limit: Option<u64>,

    /// Drop malformed records instead of failing the listing.
    #[arg(long)]
    pub lenient: bool,

    /// Output shape.
    #[arg(long, value_enum, default_value = "raw")]
    pub format: Format,

    /// Write JSON here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(context: &CliContext, args: &FetchArgs) -> Result<()> {
    let client = context.client()?.lenient(args.lenient);
    let event = match (&args.event, args.resource) {
        (_, Resource::Me) => EventSlug::default(),
        (Some(event), _) => EventSlug::from(event.as_str()),
        (None, _) => anyhow::bail!("--event is required for this resource"),
    };

    let mut params = QueryParams::new();
    for state in &args.state {
        params = params.state(state.clone());
    }
    if args.questions_all {
        params = params.questions_all();
    }
    if let Some(limit) = args.limit {
        params = params.limit(limit);
    }

    let json = match args.resource {
        Resource::Submissions => {
            let (count, stream) = client.submissions(&event, &params).await?;
            let proposals = stream.collect().await?;
            tracing::info!(count, fetched = proposals.len(), "fetched submissions");
            render_proposals(&proposals, args.format)?
        }
        Resource::Talks => {
            let (count, stream) = client.talks(&event, &params).await?;
            let talks = stream.collect().await?;
            tracing::info!(
                count,
                fetched = talks.len(),
                alias_fallback = client.talks_alias_recorded(),
                "fetched talks"
            );
            render_proposals(&talks, args.format)?
        }
        Resource::Speakers => {
            let (_, sequence) = client.speakers(&event, &params).await?;
            let speakers = sequence.collect().await?;
            if args.format == Format::Rows {
                serde_json::to_string_pretty(&chairlift_tables::speakers_to_rows(&speakers))?
            } else {
                serde_json::to_string_pretty(&speakers)?
            }
        }
        Resource::Reviews => {
            let (_, sequence) = client.reviews(&event, &params).await?;
            let reviews = sequence.collect().await?;
            match args.format {
                Format::Rows => {
                    serde_json::to_string_pretty(&chairlift_tables::reviews_to_rows(&reviews))?
                }
                Format::Scores => {
                    serde_json::to_string_pretty(&chairlift_tables::aggregate_scores(&reviews))?
                }
                Format::Raw => serde_json::to_string_pretty(&reviews)?,
            }
        }
        Resource::Rooms => {
            let (_, sequence) = client.rooms(&event, &params).await?;
            serde_json::to_string_pretty(&sequence.collect().await?)?
        }
        Resource::Questions => {
            let (_, sequence) = client.questions(&event, &params).await?;
            serde_json::to_string_pretty(&sequence.collect().await?)?
        }
        Resource::Tracks => {
            let (_, sequence) = client.tracks(&event, &params).await?;
            serde_json::to_string_pretty(&sequence.collect().await?)?
        }
        Resource::Me => {
            let me = client.me().await?;
            serde_json::to_string_pretty(&me)?
        }
    };

    write_output(&json, args)?;
    Ok(())
}

/// Proposals render raw or as one-speaker-per-row projections.
fn render_proposals(
    proposals: &[chairlift_protocol::types::Proposal],
    format: Format,
) -> Result<String> {
    let json = match format {
        Format::Rows => {
            serde_json::to_string_pretty(&chairlift_tables::proposals_to_rows(proposals))?
        }
        _ => serde_json::to_string_pretty(proposals)?,
    };
    Ok(json)
}

fn write_output(json: &str, args: &FetchArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
