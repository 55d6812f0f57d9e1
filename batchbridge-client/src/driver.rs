//! Backend driver interface
//!
//! A driver speaks one scheduler's REST dialect. It is stateless with respect
//! to jobs: every call performs exactly one request and never retries.

use async_trait::async_trait;
use batchbridge_core::{DriverDescriptor, JobSpec, JobState};

use crate::error::Result;
use crate::state_map::StateTable;

/// The four operations every remote scheduler binding provides
#[async_trait]
pub trait BackendDriver: Send + Sync {
    /// Name, label and version this driver registers under
    fn descriptor(&self) -> DriverDescriptor;

    /// Native-status mapping table used by [`BackendDriver::get_job_status`]
    fn state_table(&self) -> &StateTable;

    /// Submits a job and returns the scheduler-assigned identifier
    ///
    /// Fails with a protocol error if the scheduler does not return one.
    async fn submit_job(&self, spec: &JobSpec) -> Result<String>;

    /// Requests cancellation of a job
    ///
    /// The scheduler's own idempotency semantics are surfaced unchanged.
    async fn cancel_job(&self, native_id: &str) -> Result<()>;

    /// Lists the native ids of all jobs visible to the configured credential
    ///
    /// Order is whatever the scheduler returns.
    async fn list_jobs(&self) -> Result<Vec<String>>;

    /// Fetches the current state of a job
    ///
    /// Fails with [`crate::ExecutorError::NotFound`] if the scheduler has no
    /// such job.
    async fn get_job_status(&self, native_id: &str) -> Result<JobState>;
}
