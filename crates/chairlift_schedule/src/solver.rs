//! Out-of-process solver driver.
//!
//! The model is written to a per-run scratch directory and handed to a
//! solver binary (CBC-compatible command line). The child is waited on
//! with a wall-clock backstop and a cancellation flag; cancellation
//! sends SIGTERM and cleans the scratch directory. Scratch files are
//! deleted on success and preserved on failure for inspection.

use crate::error::{Result, ScheduleError};
use crate::model::MipModel;
use chairlift_protocol::cancel::CancelToken;
use chairlift_protocol::defaults;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Solver invocation settings.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Solver executable; must accept `model.lp sec N solve solu out`.
    pub binary: String,
    pub time_limit: Duration,
    /// Root under which each run gets its own scratch directory.
    pub scratch_root: PathBuf,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            binary: defaults::DEFAULT_SOLVER_BIN.to_string(),
            time_limit: Duration::from_secs(defaults::DEFAULT_SOLVER_TIME_LIMIT_SECS),
            scratch_root: std::env::temp_dir().join("chairlift-runs"),
        }
    }
}

/// Scratch paths for one run.
#[derive(Debug, Clone)]
pub struct SolverRun {
    pub dir: PathBuf,
    pub lp_path: PathBuf,
    pub solution_path: PathBuf,
}

/// Write the model into a fresh per-run scratch directory.
pub fn write_model(model: &MipModel, options: &SolverOptions) -> Result<SolverRun> {
    let dir = options
        .scratch_root
        .join(format!("run-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;
    let lp_path = dir.join("model.lp");
    let solution_path = dir.join("solution.txt");
    std::fs::write(&lp_path, model.to_lp())?;
    tracing::debug!(path = %lp_path.display(), vars = model.var_count(), "wrote model");
    Ok(SolverRun {
        dir,
        lp_path,
        solution_path,
    })
}

/// How the child ended.
#[derive(Debug)]
pub enum SolverExit {
    Finished { code: i32 },
    DeadlineExceeded,
    Cancelled,
}

/// Run the solver to completion, the deadline backstop, or
/// cancellation. The solver also receives the time limit on its own
/// command line, so the backstop only fires when the child misbehaves.
pub async fn invoke_solver(
    run: &SolverRun,
    options: &SolverOptions,
    cancel: &CancelToken,
) -> Result<SolverExit> {
    let log = std::fs::File::create(run.dir.join("solver.log"))?;
    let mut child = Command::new(&options.binary)
        .arg(&run.lp_path)
        .arg("sec")
        .arg(options.time_limit.as_secs().to_string())
        .arg("solve")
        .arg("solu")
        .arg(&run.solution_path)
        .current_dir(&run.dir)
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ScheduleError::Solver(format!("failed to spawn {}: {e}", options.binary)))?;

    // Backstop beyond the solver's own limit. Child::wait is cancel
    // safe, so polling it under a short timeout loses nothing.
    let deadline = tokio::time::Instant::now() + options.time_limit + Duration::from_secs(60);
    loop {
        let waited = tokio::time::timeout(Duration::from_millis(250), child.wait()).await;
        match waited {
            Ok(status) => {
                let status =
                    status.map_err(|e| ScheduleError::Solver(format!("wait failed: {e}")))?;
                let code = status.code().unwrap_or(-1);
                return Ok(SolverExit::Finished { code });
            }
            Err(_) => {
                if cancel.is_cancelled() {
                    tracing::info!(
                        reason = cancel.reason().unwrap_or("unknown"),
                        "terminating solver"
                    );
                    terminate(&mut child).await;
                    return Ok(SolverExit::Cancelled);
                }
                if tokio::time::Instant::now() >= deadline {
                    tracing::warn!("solver exceeded wall-clock backstop; terminating");
                    terminate(&mut child).await;
                    return Ok(SolverExit::DeadlineExceeded);
                }
            }
        }
    }
}

/// SIGTERM first; escalate to SIGKILL if the child lingers. Non-unix
/// targets have no SIGTERM and go straight to the kill.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        if tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .is_ok()
        {
            return;
        }
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}

/// Parse a solution file into variable values.
///
/// Accepts CBC-style rows (`index name value [reduced-cost]`) and
/// plain `name value` pairs. A header line carrying the solve status
/// is recognized; an infeasible status fails the run.
pub fn parse_solution(content: &str) -> Result<HashMap<String, f64>> {
    let mut values = HashMap::new();
    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let lowered = line.to_lowercase();
        if lowered.contains("objective value") || lowered.starts_with("solution") {
            if lowered.contains("infeasible") {
                return Err(ScheduleError::no_schedule("solver reported infeasible"));
            }
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let parsed = match tokens.as_slice() {
            [name, value] => value.parse::<f64>().ok().map(|v| (*name, v)),
            [index, name, value, ..] if index.parse::<u64>().is_ok() => {
                value.parse::<f64>().ok().map(|v| (*name, v))
            }
            _ => None,
        };
        match parsed {
            Some((name, value)) => {
                values.insert(name.to_string(), value);
            }
            None => {
                return Err(ScheduleError::Solution {
                    line: line_no + 1,
                    cause: format!("unrecognized row: {line}"),
                });
            }
        }
    }
    Ok(values)
}

/// Full solve: write, invoke, ingest. Scratch is removed on success
/// and on cancellation, preserved on failure.
pub async fn solve(
    model: &MipModel,
    options: &SolverOptions,
    cancel: &CancelToken,
) -> Result<HashMap<String, f64>> {
    let run = write_model(model, options)?;
    let outcome = solve_written(&run, options, cancel).await;
    match &outcome {
        Ok(_) => {
            let _ = std::fs::remove_dir_all(&run.dir);
        }
        Err(ScheduleError::Cancelled) => {
            let _ = std::fs::remove_dir_all(&run.dir);
        }
        Err(_) => {
            tracing::warn!(dir = %run.dir.display(), "preserving solver scratch for inspection");
        }
    }
    outcome
}

/// Invoke and ingest against an already-written run directory.
pub async fn solve_written(
    run: &SolverRun,
    options: &SolverOptions,
    cancel: &CancelToken,
) -> Result<HashMap<String, f64>> {
    match invoke_solver(run, options, cancel).await? {
        SolverExit::Cancelled => Err(ScheduleError::Cancelled),
        SolverExit::DeadlineExceeded => match std::fs::read_to_string(&run.solution_path) {
            Ok(content) if !content.trim().is_empty() => {
                tracing::warn!("using incumbent written before the deadline");
                parse_solution(&content)
            }
            _ => Err(ScheduleError::no_schedule(
                "solver exceeded its time limit without an incumbent",
            )),
        },
        SolverExit::Finished { code } if code != 0 => Err(ScheduleError::Solver(format!(
            "{} exited with status {code}",
            options.binary
        ))),
        SolverExit::Finished { .. } => {
            let content = std::fs::read_to_string(&run.solution_path).map_err(|e| {
                ScheduleError::Solver(format!("solver wrote no solution file: {e}"))
            })?;
            parse_solution(&content)
        }
    }
}
