//! Supervisor state threaded through the daemon loop.
//!
//! One `DaemonState` value exists per process. The daemon loop owns it and
//! hands out references; the publisher snapshots it into the status
//! artifact after every transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one pipeline stage within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage identifier, matching the configured stage name.
    pub name: String,
    /// Exit code of the stage process. Zero means success; the runner's
    /// sentinel codes mark launch failures and timeouts.
    pub exit_code: i32,
    /// Wall-clock time the stage took.
    pub duration_seconds: f64,
    pub completed_at: DateTime<Utc>,
}

impl StageResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Progress of a single pass over the configured pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleState {
    /// Monotonically increasing across the daemon's lifetime; first cycle is 1.
    pub cycle_number: u64,
    /// Results of completed stages, in execution order. Append-only within
    /// a cycle.
    pub stages: Vec<StageResult>,
    /// Name of the stage presently executing; `None` while idle.
    pub current_stage: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Set when the cycle ends; `None` while the cycle is in progress.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Process-wide supervisor state.
#[derive(Debug, Clone)]
pub struct DaemonState {
    /// True while a cycle is actively executing stages.
    pub running: bool,
    /// The active or most recently completed cycle; `None` before the
    /// first cycle starts.
    pub cycle: Option<CycleState>,
    /// When the next cycle is due; set only while idle between cycles.
    pub next_run_at: Option<DateTime<Utc>>,
    /// Latched once a termination signal is observed; never reverts.
    pub shutdown_requested: bool,
    /// Number of configured stages, for progress display.
    pub total_stages: usize,
}

impl DaemonState {
    pub fn new(total_stages: usize) -> Self {
        Self {
            running: false,
            cycle: None,
            next_run_at: None,
            shutdown_requested: false,
            total_stages,
        }
    }

    /// Cycle number of the most recent cycle, or 0 before the first one.
    pub fn last_cycle_number(&self) -> u64 {
        self.cycle.as_ref().map(|c| c.cycle_number).unwrap_or(0)
    }

    /// Start a fresh cycle and return its number.
    pub fn begin_cycle(&mut self, now: DateTime<Utc>) -> u64 {
        let cycle_number = self.last_cycle_number() + 1;
        self.running = true;
        self.next_run_at = None;
        self.cycle = Some(CycleState {
            cycle_number,
            stages: Vec::new(),
            current_stage: None,
            started_at: now,
            finished_at: None,
        });
        cycle_number
    }

    pub fn set_current_stage(&mut self, name: &str) {
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.current_stage = Some(name.to_string());
        }
    }

    /// Record a completed stage and clear the current-stage marker.
    pub fn record_stage(&mut self, result: StageResult) {
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.current_stage = None;
            cycle.stages.push(result);
        }
    }

    pub fn finish_cycle(&mut self, now: DateTime<Utc>) {
        self.running = false;
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.current_stage = None;
            cycle.finished_at = Some(now);
        }
    }

    pub fn set_next_run(&mut self, at: DateTime<Utc>) {
        self.next_run_at = Some(at);
    }

    /// Mirror the shutdown flag into the published state. Latching only.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Terminal transition on daemon exit.
    pub fn mark_stopped(&mut self) {
        self.running = false;
        self.next_run_at = None;
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.current_stage = None;
        }
    }
}
