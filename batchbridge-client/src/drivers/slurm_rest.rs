//! Slurm REST driver
//!
//! Talks to `slurmrestd`. Every request carries the `X-SLURM-USER-TOKEN` and
//! `X-SLURM-USER-NAME` headers. Unknown job states are rejected rather than
//! guessed, since a misread terminal state would leave callers polling forever.

use std::sync::Arc;

use async_trait::async_trait;
use batchbridge_core::{DriverDescriptor, JobSpec, JobState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{batch_script, native_id_from_value};
use crate::config::DriverConfig;
use crate::driver::BackendDriver;
use crate::error::{ExecutorError, Result};
use crate::http::HttpTransport;
use crate::observer::Observer;
use crate::state_map::{FallbackPolicy, StateTable};

pub const NAME: &str = "slurm-rest";
pub const DEFAULT_URL: &str = "http://localhost:6820";
const DEFAULT_USER: &str = "root";

const SUBMIT_PATH: &str = "slurm/v0.0.41/job/submit";
const JOB_PATH: &str = "slurm/v0.0.40/job";
const JOBS_PATH: &str = "slurm/v0.0.40/jobs";

static STATES: StateTable = StateTable::new(
    NAME,
    &[
        ("PENDING", JobState::Queued),
        ("CONFIGURING", JobState::New),
        ("REQUEUED", JobState::Queued),
        ("RESIZING", JobState::Queued),
        ("SUSPENDED", JobState::Queued),
        ("RUNNING", JobState::Active),
        ("COMPLETING", JobState::Active),
        ("COMPLETED", JobState::Completed),
        ("CANCELLED", JobState::Canceled),
        ("FAILED", JobState::Failed),
        ("TIMEOUT", JobState::Failed),
        ("PREEMPTED", JobState::Failed),
        ("NODE_FAIL", JobState::Failed),
        ("BOOT_FAIL", JobState::Failed),
        ("DEADLINE", JobState::Failed),
        ("OUT_OF_MEMORY", JobState::Failed),
    ],
    FallbackPolicy::FailOnUnknown,
);

/// Driver for the Slurm REST API
pub struct SlurmRestDriver {
    transport: HttpTransport,
    token: String,
    user_name: String,
    observer: Arc<dyn Observer>,
}

impl SlurmRestDriver {
    pub fn new(config: DriverConfig, observer: Arc<dyn Observer>) -> Result<Self> {
        let transport = HttpTransport::new(&config, DEFAULT_URL)?;
        Ok(Self {
            transport,
            user_name: config
                .user_name
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            token: config.token,
            observer,
        })
    }

    pub fn describe() -> DriverDescriptor {
        DriverDescriptor::new(
            NAME,
            "Slurm REST API",
            "0.0.1",
            "Executor for the Slurm REST API",
        )
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    fn request<U: reqwest::IntoUrl>(&self, method: reqwest::Method, url: U) -> reqwest::RequestBuilder {
        self.transport
            .client()
            .request(method, url)
            .header("X-SLURM-USER-TOKEN", &self.token)
            .header("X-SLURM-USER-NAME", &self.user_name)
    }
}

#[async_trait]
impl BackendDriver for SlurmRestDriver {
    fn descriptor(&self) -> DriverDescriptor {
        Self::describe()
    }

    fn state_table(&self) -> &StateTable {
        &STATES
    }

    async fn submit_job(&self, spec: &JobSpec) -> Result<String> {
        self.observer.info(&format!(
            "Submitting job {} to Slurm",
            spec.name.as_deref().unwrap_or("<unnamed>")
        ));

        let request = SubmitRequest::from_spec(spec);
        let response = self
            .request(reqwest::Method::POST, self.transport.url(SUBMIT_PATH))
            .json(&request)
            .send()
            .await?;
        let body: SubmitResponse = self.transport.handle_response(response).await?;

        check_errors(&body.errors, "Slurm rejected the submission")?;

        let native_id = body
            .job_id
            .as_ref()
            .and_then(native_id_from_value)
            .ok_or_else(|| ExecutorError::protocol("Slurm submit response has no job_id"))?;

        self.observer.info(&format!("Job submitted: {}", native_id));
        Ok(native_id)
    }

    async fn cancel_job(&self, native_id: &str) -> Result<()> {
        self.observer.info(&format!("Cancelling job {}", native_id));

        let response = self
            .request(reqwest::Method::DELETE, self.transport.segment_url(JOB_PATH, native_id)?)
            .send()
            .await?;

        self.transport
            .handle_empty_response(response)
            .await
            .map_err(|e| not_found(e, native_id))
    }

    async fn list_jobs(&self) -> Result<Vec<String>> {
        self.observer.info("Listing all jobs");

        let response = self
            .request(reqwest::Method::GET, self.transport.url(JOBS_PATH))
            .send()
            .await?;
        let body: JobsResponse = self.transport.handle_response(response).await?;

        Ok(body
            .jobs("Slurm failed to list jobs")?
            .iter()
            .filter_map(|job| job.job_id.as_ref().and_then(native_id_from_value))
            .collect())
    }

    async fn get_job_status(&self, native_id: &str) -> Result<JobState> {
        self.observer
            .info(&format!("Getting status for job {}", native_id));

        let response = self
            .request(reqwest::Method::GET, self.transport.segment_url(JOB_PATH, native_id)?)
            .send()
            .await?;
        let body: JobsResponse = self
            .transport
            .handle_response(response)
            .await
            .map_err(|e| not_found(e, native_id))?;

        let job = body
            .jobs(&format!("Slurm failed to look up job {}", native_id))?
            .first()
            .ok_or_else(|| ExecutorError::NotFound(native_id.to_string()))?;

        let token = job
            .job_state
            .as_ref()
            .and_then(StateField::primary)
            .ok_or_else(|| {
                ExecutorError::protocol(format!("Slurm job {} has no job_state", native_id))
            })?;

        STATES.map(token)
    }
}

/// slurmrestd reports many failures as a 2xx with a non-empty `errors` array
fn check_errors(errors: &[SlurmError], context: &str) -> Result<()> {
    match errors.first() {
        Some(err) => Err(ExecutorError::protocol(format!("{}: {}", context, err.message()))),
        None => Ok(()),
    }
}

fn not_found(err: ExecutorError, native_id: &str) -> ExecutorError {
    if err.is_not_found() {
        ExecutorError::NotFound(native_id.to_string())
    } else {
        err
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct SubmitRequest {
    job: SubmitJob,
}

#[derive(Debug, Serialize)]
struct SubmitJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    nodes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks_per_node: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tres_per_node: Option<String>,
    time_limit: TimeLimit,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_working_directory: Option<String>,
    environment: Vec<String>,
    script: String,
}

#[derive(Debug, Serialize)]
struct TimeLimit {
    set: bool,
    number: u64,
}

impl SubmitRequest {
    fn from_spec(spec: &JobSpec) -> Self {
        // slurmrestd refuses a submission with an empty environment
        let environment = if spec.environment.is_empty() {
            vec!["PATH=/bin:/usr/bin".to_string()]
        } else {
            spec.environment
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect()
        };

        Self {
            job: SubmitJob {
                name: spec.name.clone(),
                nodes: spec.resources.node_count.max(1).to_string(),
                tasks_per_node: spec.resources.processes_per_node,
                tres_per_node: spec
                    .resources
                    .gpus_per_node
                    .map(|gpus| format!("gres/gpu:{}", gpus)),
                time_limit: TimeLimit {
                    set: true,
                    number: spec.duration_minutes(),
                },
                current_working_directory: spec
                    .directory
                    .as_ref()
                    .map(|d| d.to_string_lossy().into_owned()),
                environment,
                script: batch_script(spec),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    job_id: Option<Value>,
    #[serde(default)]
    errors: Vec<SlurmError>,
}

#[derive(Debug, Deserialize)]
struct SlurmError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl SlurmError {
    fn message(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.error.as_deref())
            .unwrap_or("unknown error")
    }
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Option<Vec<JobInfo>>,
    #[serde(default)]
    errors: Vec<SlurmError>,
}

impl JobsResponse {
    fn jobs(&self, context: &str) -> Result<&[JobInfo]> {
        check_errors(&self.errors, context)?;
        self.jobs
            .as_deref()
            .ok_or_else(|| ExecutorError::protocol(format!("{}: response has no jobs field", context)))
    }
}

#[derive(Debug, Deserialize)]
struct JobInfo {
    #[serde(default)]
    job_id: Option<Value>,
    #[serde(default)]
    job_state: Option<StateField>,
}

/// Newer slurmrestd versions send a list of state flags, older ones a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StateField {
    One(String),
    Many(Vec<String>),
}

impl StateField {
    fn primary(&self) -> Option<&str> {
        let token = match self {
            StateField::One(s) => Some(s.as_str()),
            StateField::Many(v) => v.first().map(String::as_str),
        };
        token.filter(|s| !s.is_empty())
    }
}
