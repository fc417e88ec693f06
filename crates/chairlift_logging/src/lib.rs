//! Shared logging and home-directory utilities for Chairlift binaries.
//!
//! File output goes through `tracing-appender`'s daily roller; since
//! the roller never deletes anything, startup prunes dated log files
//! beyond a small retention window.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str =
    "chairlift=info,chairlift_client=info,chairlift_assign=info,chairlift_schedule=info";

/// Dated log files kept after the startup sweep.
const KEEP_LOG_DAYS: usize = 5;

/// Logging options shared by Chairlift binaries.
pub struct LogOptions<'a> {
    pub app_name: &'a str,
    /// Mirror the full file filter onto stderr instead of warnings only.
    pub verbose: bool,
}

/// Initialize tracing with a daily-rolling file layer plus a stderr
/// layer. The file always gets the full filter; stderr gets warnings
/// unless `verbose`.
pub fn init_logging(options: LogOptions<'_>) -> Result<()> {
    let dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let stem = log_stem(options.app_name);
    let pruned = prune_dated_logs(&dir, &stem, KEEP_LOG_DAYS)
        .context("Failed to prune old log files")?;
    if pruned > 0 {
        eprintln!("pruned {pruned} old log file(s)");
    }

    let file_writer = tracing_appender::rolling::daily(&dir, format!("{stem}.log"));

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let stderr_filter = if options.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(stderr_filter),
        )
        .init();

    Ok(())
}

// ============================================================================
// Home directory layout
// ============================================================================

/// The Chairlift home directory: `~/.chairlift`, or `$CHAIRLIFT_HOME`.
pub fn chairlift_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("CHAIRLIFT_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .expect("Could not determine home directory")
        .join(".chairlift")
}

/// Logs directory: `~/.chairlift/logs`.
pub fn logs_dir() -> PathBuf {
    chairlift_home().join("logs")
}

/// Per-run solver scratch root: `~/.chairlift/runs`.
pub fn runs_dir() -> PathBuf {
    chairlift_home().join("runs")
}

/// Default user config file: `~/.chairlift/config.toml`.
pub fn default_config_path() -> PathBuf {
    chairlift_home().join("config.toml")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

// ============================================================================
// Log retention
// ============================================================================

/// App name reduced to a filesystem-safe stem. Anything outside
/// `[A-Za-z0-9_-]` is dropped.
fn log_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if stem.is_empty() {
        "chairlift".to_string()
    } else {
        stem
    }
}

/// Remove dated log files beyond the newest `keep`. The daily roller
/// names files `<stem>.log.YYYY-MM-DD`, so lexicographic order is
/// chronological order. Returns how many files were removed.
pub fn prune_dated_logs(dir: &Path, stem: &str, keep: usize) -> std::io::Result<usize> {
    let prefix = format!("{stem}.log.");
    let mut dated: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .collect();
    dated.sort();

    let excess = dated.len().saturating_sub(keep);
    for stale in &dated[..excess] {
        fs::remove_file(stale)?;
    }
    Ok(excess)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_stem_drops_unsafe_chars() {
        assert_eq!(log_stem("chairlift"), "chairlift");
        assert_eq!(log_stem("chair lift!"), "chairlift");
        assert_eq!(log_stem("run_2026-04"), "run_2026-04");
        assert_eq!(log_stem("!!!"), "chairlift");
    }

    #[test]
    fn test_prune_keeps_newest_dated_files() {
        let dir = tempfile::tempdir().unwrap();
        for date in ["2026-04-20", "2026-04-21", "2026-04-22", "2026-04-23"] {
            fs::write(dir.path().join(format!("app.log.{date}")), date).unwrap();
        }
        // An unrelated file and a different stem survive untouched.
        fs::write(dir.path().join("app.log"), "current").unwrap();
        fs::write(dir.path().join("other.log.2026-04-01"), "other").unwrap();

        let removed = prune_dated_logs(dir.path(), "app", 2).unwrap();
        assert_eq!(removed, 2);
        assert!(!dir.path().join("app.log.2026-04-20").exists());
        assert!(!dir.path().join("app.log.2026-04-21").exists());
        assert!(dir.path().join("app.log.2026-04-22").exists());
        assert!(dir.path().join("app.log.2026-04-23").exists());
        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("other.log.2026-04-01").exists());
    }

    #[test]
    fn test_prune_with_nothing_to_remove() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log.2026-04-23"), "x").unwrap();
        assert_eq!(prune_dated_logs(dir.path(), "app", 5).unwrap(), 0);
        assert!(dir.path().join("app.log.2026-04-23").exists());
    }

    #[test]
    fn test_home_override() {
        std::env::set_var("CHAIRLIFT_HOME", "/tmp/chairlift-test-home");
        assert_eq!(
            chairlift_home(),
            PathBuf::from("/tmp/chairlift-test-home")
        );
        assert_eq!(
            default_config_path(),
            PathBuf::from("/tmp/chairlift-test-home/config.toml")
        );
        std::env::remove_var("CHAIRLIFT_HOME");
    }
}
