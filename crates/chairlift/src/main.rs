//! Chairlift: program management for technical conferences.

use clap::Parser;

mod cli;

fn main() {
    let args = cli::Cli::parse();

    if let Err(error) = chairlift_logging::init_logging(chairlift_logging::LogOptions {
        app_name: "chairlift",
        verbose: args.verbose,
    }) {
        eprintln!("warning: logging unavailable: {error:#}");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("error: failed to start runtime: {error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = runtime.block_on(cli::run(args)) {
        tracing::error!(%error, "command failed");
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
