//! Stage execution.
//!
//! A stage is one external scraper program. The runner launches it as a
//! child process, waits for it to terminate, and folds every failure mode
//! into the returned exit code: whether a stage's outcome aborts anything
//! is not decided here.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::StageConfig;
use crate::state::StageResult;

/// Exit code recorded when a stage program cannot be launched, or when the
/// child was terminated by a signal and left no exit code.
pub const EXIT_CODE_LAUNCH_FAILED: i32 = -1;

/// Exit code recorded when a stage exceeds its configured timeout.
pub const EXIT_CODE_TIMED_OUT: i32 = -2;

/// Executes pipeline stages one at a time in the work directory.
pub struct StageRunner {
    work_dir: PathBuf,
}

impl StageRunner {
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// Run one stage to completion and report its outcome.
    ///
    /// Never fails out of the pipeline: launch errors and timeouts are
    /// folded into the exit code so the cycle can move on to the next
    /// stage.
    pub async fn run(&self, stage: &StageConfig) -> StageResult {
        info!(stage = %stage.name, command = %stage.command, "starting stage");
        let start = Instant::now();

        let exit_code = self.execute(stage).await;

        let duration = start.elapsed();
        info!(
            stage = %stage.name,
            exit_code,
            duration_secs = duration.as_secs_f64(),
            "stage finished"
        );

        StageResult {
            name: stage.name.clone(),
            exit_code,
            duration_seconds: duration.as_secs_f64(),
            completed_at: Utc::now(),
        }
    }

    async fn execute(&self, stage: &StageConfig) -> i32 {
        let mut child = match Command::new(&stage.command)
            .args(&stage.args)
            .current_dir(&self.work_dir)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(stage = %stage.name, command = %stage.command, error = %e, "failed to launch stage");
                return EXIT_CODE_LAUNCH_FAILED;
            }
        };

        let waited = match stage.timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(stage = %stage.name, timeout_secs = secs, "stage timed out, killing it");
                    if let Err(e) = child.kill().await {
                        warn!(stage = %stage.name, error = %e, "failed to kill timed-out stage");
                    }
                    return EXIT_CODE_TIMED_OUT;
                }
            },
            None => child.wait().await,
        };

        match waited {
            Ok(status) => status.code().unwrap_or(EXIT_CODE_LAUNCH_FAILED),
            Err(e) => {
                warn!(stage = %stage.name, error = %e, "failed to wait for stage");
                EXIT_CODE_LAUNCH_FAILED
            }
        }
    }
}
