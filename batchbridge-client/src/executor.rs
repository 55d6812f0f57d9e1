//! Remote lifecycle adapter
//!
//! Submit, cancel, list, attach and refresh orchestration shared by every
//! backend driver. The adapter keeps no state of its own: it mutates the job
//! handle it is given and delegates all I/O to the driver. It never retries.

use std::sync::Arc;

use batchbridge_core::{DriverDescriptor, Job, JobState};

use crate::driver::BackendDriver;
use crate::error::{ExecutorError, Result};
use crate::observer::{Observer, TracingObserver};

/// Result of a single status refresh
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The job kept its state (terminal, or the scheduler reported the same one)
    Unchanged(JobState),
    /// The job moved between states
    Updated { from: JobState, to: JobState },
    /// The status fetch failed; the job kept its last known state
    Failed(ExecutorError),
}

impl RefreshOutcome {
    pub fn error(&self) -> Option<&ExecutorError> {
        match self {
            RefreshOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Drives job handles through a backend driver
#[derive(Clone)]
pub struct RemoteExecutor {
    driver: Arc<dyn BackendDriver>,
    observer: Arc<dyn Observer>,
}

impl RemoteExecutor {
    pub fn new(driver: Arc<dyn BackendDriver>, observer: Arc<dyn Observer>) -> Self {
        Self { driver, observer }
    }

    /// Creates an adapter that reports through `tracing`
    pub fn with_tracing(driver: Arc<dyn BackendDriver>) -> Self {
        Self::new(driver, TracingObserver::shared())
    }

    pub fn descriptor(&self) -> DriverDescriptor {
        self.driver.descriptor()
    }

    pub fn driver(&self) -> &Arc<dyn BackendDriver> {
        &self.driver
    }

    /// Submits a job
    ///
    /// The job is expected to be in `New`. On success it carries the native
    /// id and moves to `Queued`; on failure it is left untouched.
    pub async fn submit(&self, job: &mut Job) -> Result<()> {
        let native_id = match self.driver.submit_job(job.spec()).await {
            Ok(id) if id.trim().is_empty() => {
                let err = ExecutorError::protocol("scheduler returned an empty job id");
                self.observer
                    .error(&format!("Failed to submit job {}: {}", job.id(), err));
                return Err(err);
            }
            Ok(id) => id,
            Err(e) => {
                self.observer
                    .error(&format!("Failed to submit job {}: {}", job.id(), e));
                return Err(e);
            }
        };

        job.bind_native_id(native_id.as_str());
        job.transition(JobState::Queued);
        self.observer
            .info(&format!("Job {} submitted as {}", job.id(), native_id));

        Ok(())
    }

    /// Requests cancellation
    ///
    /// Does not touch the job's state: the next refresh tells whether the
    /// cancellation registered.
    pub async fn cancel(&self, job: &Job) -> Result<()> {
        let Some(native_id) = job.native_id() else {
            return Err(ExecutorError::precondition(
                "Cannot cancel a job without a native ID",
            ));
        };

        if let Err(e) = self.driver.cancel_job(native_id).await {
            self.observer
                .error(&format!("Failed to cancel job {}: {}", native_id, e));
            return Err(e);
        }

        self.observer
            .info(&format!("Cancellation requested for job {}", native_id));
        Ok(())
    }

    /// Lists the native ids of all jobs the scheduler shows to this credential
    pub async fn list(&self) -> Result<Vec<String>> {
        self.driver.list_jobs().await.inspect_err(|e| {
            self.observer.error(&format!("Failed to list jobs: {}", e));
        })
    }

    /// Binds a fresh job to an existing native job and fetches its state
    ///
    /// Only valid for a job in `New` that has never been submitted or
    /// attached. If the status fetch fails the job is left untouched.
    pub async fn attach(&self, job: &mut Job, native_id: &str) -> Result<()> {
        if job.state() != JobState::New || job.native_id().is_some() {
            return Err(ExecutorError::precondition(format!(
                "Job {} must be in NEW state and unbound to be attached (state {}, native id {:?})",
                job.id(),
                job.state(),
                job.native_id()
            )));
        }
        if native_id.trim().is_empty() {
            return Err(ExecutorError::precondition(
                "Cannot attach to an empty native ID",
            ));
        }

        let state = match self.driver.get_job_status(native_id).await {
            Ok(state) => state,
            Err(e) => {
                self.observer
                    .error(&format!("Failed to attach to job {}: {}", native_id, e));
                return Err(e);
            }
        };

        job.bind_native_id(native_id);
        job.transition(state);
        self.observer.info(&format!(
            "Job {} attached to {} in state {}",
            job.id(),
            native_id,
            job.state()
        ));

        Ok(())
    }

    /// Fetches the current state and applies it to the job
    ///
    /// A job that was never submitted or attached has nothing to refresh and
    /// comes back `Unchanged`, as does a terminal job; neither is fetched.
    /// Fetch failures are reported as warnings and leave the last known state
    /// in place.
    pub async fn refresh(&self, job: &mut Job) -> RefreshOutcome {
        let from = job.state();
        let Some(native_id) = job.native_id().map(str::to_owned) else {
            return RefreshOutcome::Unchanged(from);
        };

        if from.is_terminal() {
            return RefreshOutcome::Unchanged(from);
        }

        match self.driver.get_job_status(&native_id).await {
            Ok(to) => {
                if job.transition(to) {
                    tracing::debug!("Job {} moved {} -> {}", native_id, from, to);
                    RefreshOutcome::Updated { from, to }
                } else {
                    RefreshOutcome::Unchanged(job.state())
                }
            }
            Err(e) => {
                self.observer.warning(&format!(
                    "Failed to update status for job {}: {}",
                    native_id, e
                ));
                RefreshOutcome::Failed(e)
            }
        }
    }
}
