//! Status poller
//!
//! Refreshes one job on a fixed interval until it reaches a terminal state.
//! A failed refresh is only a warning; the poller gives up after a run of
//! consecutive failures.

use anyhow::{Result, bail};
use batchbridge_client::{RefreshOutcome, RemoteExecutor};
use batchbridge_core::{Job, JobState};
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, warn};

/// Default number of consecutive refresh failures tolerated
pub const DEFAULT_MAX_FAILURES: u32 = 10;

/// Polls a job until it completes, fails, or is canceled
pub struct StatusPoller {
    executor: RemoteExecutor,
    interval: Duration,
    max_failures: u32,
}

impl StatusPoller {
    pub fn new(executor: RemoteExecutor, interval: Duration) -> Self {
        Self {
            executor,
            interval,
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    /// Runs the polling loop
    ///
    /// `on_change` is called with the previous and new state on every
    /// transition. Returns the terminal state.
    pub async fn run<F>(&self, job: &mut Job, mut on_change: F) -> Result<JobState>
    where
        F: FnMut(&Job, JobState, JobState),
    {
        if job.native_id().is_none() {
            bail!("Job {} has no native id; nothing to poll", job.id());
        }
        if job.state().is_terminal() {
            return Ok(job.state());
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0;

        loop {
            ticker.tick().await;

            match self.executor.refresh(job).await {
                RefreshOutcome::Unchanged(state) => {
                    failures = 0;
                    debug!("Job {} still {}", job.native_id().unwrap_or("?"), state);
                    if state.is_terminal() {
                        return Ok(state);
                    }
                }
                RefreshOutcome::Updated { from, to } => {
                    failures = 0;
                    on_change(job, from, to);
                    if to.is_terminal() {
                        return Ok(to);
                    }
                }
                RefreshOutcome::Failed(e) => {
                    failures += 1;
                    warn!(
                        "Status refresh failed ({}/{}): {}",
                        failures, self.max_failures, e
                    );
                    if failures >= self.max_failures {
                        bail!(
                            "Giving up on job {} after {} failed status refreshes: {}",
                            job.native_id().unwrap_or("?"),
                            failures,
                            e
                        );
                    }
                }
            }
        }
    }
}
