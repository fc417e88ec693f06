//! `chairlift config` - inspect the user configuration.

use anyhow::Result;
use chairlift_protocol::Config;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Validate the file and report what is enabled.
    #[arg(long)]
    pub check: bool,
}

pub fn run(override_path: Option<&Path>, args: &ConfigArgs) -> Result<()> {
    let path = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(chairlift_logging::default_config_path);
    println!("config file: {}", path.display());

    if !path.exists() {
        println!("status: missing");
        if args.check {
            anyhow::bail!("config file not found at {}", path.display());
        }
        return Ok(());
    }

    match Config::load(&path) {
        Ok(config) => {
            println!("status: ok");
            println!("upstream.base_url: {}", config.upstream.base_url()?);
            println!("upstream.api_version: {}", config.upstream.api_version());
            println!(
                "storage: {}",
                config
                    .storage
                    .as_ref()
                    .map(|s| s.provider.as_str())
                    .unwrap_or("disabled")
            );
            println!(
                "mail: {}",
                config
                    .mail
                    .as_ref()
                    .map(|m| m.provider.as_str())
                    .unwrap_or("disabled")
            );
            println!("solver.binary: {}", config.solver.binary());
            Ok(())
        }
        Err(error) => {
            println!("status: invalid");
            if args.check {
                return Err(error.into());
            }
            eprintln!("error: {error}");
            Ok(())
        }
    }
}
