//! The supervisor loop.
//!
//! One `Daemon` drives everything: it owns the state value, runs the
//! configured stages in order once per cycle, publishes status around
//! every transition, sleeps the configured interval between cycles, and
//! drains cooperatively on shutdown. There is exactly one writer of
//! `DaemonState`, so no locking is involved anywhere.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::shutdown::ShutdownFlag;
use crate::stage::StageRunner;
use crate::state::DaemonState;
use crate::status::StatusPublisher;

/// When the next cycle is due, given when the current one finished.
pub fn next_run_after(finished: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    finished + chrono::Duration::seconds(interval.as_secs() as i64)
}

/// The long-running scraper pipeline supervisor.
pub struct Daemon {
    config: Config,
    runner: StageRunner,
    publisher: StatusPublisher,
    shutdown: ShutdownFlag,
}

impl Daemon {
    pub fn new(config: Config, shutdown: ShutdownFlag) -> Self {
        let runner = StageRunner::new(&config.work_dir);
        let publisher = StatusPublisher::new(&config.status_file);
        Self {
            config,
            runner,
            publisher,
            shutdown,
        }
    }

    /// The top-level loop: run a cycle immediately, then sleep the
    /// configured interval between cycles until shutdown is requested.
    pub async fn run(self) {
        let mut state = DaemonState::new(self.config.stages.len());
        // Publish an idle document up front so readers have something to
        // poll before the first cycle completes a transition.
        self.publisher.publish(&state);

        info!(
            stages = self.config.stages.len(),
            interval_secs = self.config.interval.as_secs(),
            "supervisor started"
        );

        loop {
            self.run_cycle(&mut state).await;

            if self.shutdown.is_requested() {
                break;
            }

            let next = next_run_after(Utc::now(), self.config.interval);
            state.set_next_run(next);
            self.publisher.publish(&state);
            info!(next_run_at = %next, "cycle complete, sleeping until next run");

            if self.sleep_between_cycles().await {
                break;
            }
        }

        state.request_shutdown();
        state.mark_stopped();
        self.publisher.publish(&state);
        info!("supervisor stopped");
    }

    /// Run exactly one cycle and return. Used by `harvest run --once`.
    pub async fn run_once(self) {
        let mut state = DaemonState::new(self.config.stages.len());
        self.run_cycle(&mut state).await;
    }

    /// One ordered pass over all configured stages.
    ///
    /// Every stage is attempted regardless of earlier exit codes: later
    /// stages can still do useful work on whatever the earlier ones left
    /// on disk. The shutdown flag is honored at stage boundaries only; an
    /// in-flight stage always runs to completion and its result is
    /// recorded before the cycle ends.
    pub async fn run_cycle(&self, state: &mut DaemonState) {
        let cycle_number = state.begin_cycle(Utc::now());
        info!(cycle = cycle_number, "starting cycle");
        self.publisher.publish(state);

        for stage in &self.config.stages {
            if self.shutdown.is_requested() {
                state.request_shutdown();
                info!(
                    cycle = cycle_number,
                    "shutdown requested, not starting further stages"
                );
                break;
            }

            state.set_current_stage(&stage.name);
            self.publisher.publish(state);

            let result = self.runner.run(stage).await;
            state.record_stage(result);
            self.publisher.publish(state);
        }

        state.finish_cycle(Utc::now());
        let completed = state.cycle.as_ref().map(|c| c.stages.len()).unwrap_or(0);
        info!(
            cycle = cycle_number,
            stages_completed = completed,
            "cycle finished"
        );
        self.publisher.publish(state);
    }

    /// Sleep the inter-cycle interval. Returns true when the sleep was
    /// interrupted by a shutdown request.
    async fn sleep_between_cycles(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.config.interval) => false,
            _ = self.shutdown.notified() => true,
        }
    }
}
