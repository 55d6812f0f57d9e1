//! NERSC Superfacility driver
//!
//! Submits to the Superfacility API compute endpoints of one machine
//! (Perlmutter by default) with a bearer token. Unknown job states resolve
//! to `New`: the API reports a handful of site-specific states that are all
//! pre-run.

use std::sync::Arc;

use async_trait::async_trait;
use batchbridge_core::{DriverDescriptor, JobSpec, JobState};
use serde::Deserialize;
use serde_json::Value;

use super::{native_id_from_value, sbatch_script};
use crate::config::DriverConfig;
use crate::driver::BackendDriver;
use crate::error::{ExecutorError, Result};
use crate::http::HttpTransport;
use crate::observer::Observer;
use crate::state_map::{FallbackPolicy, StateTable};

pub const NAME: &str = "nersc";
pub const DEFAULT_URL: &str = "https://api.nersc.gov/api/v1.2";
pub const DEFAULT_MACHINE: &str = "perlmutter";

static STATES: StateTable = StateTable::new(
    NAME,
    &[
        ("PENDING", JobState::Queued),
        ("SUSPENDED", JobState::Queued),
        ("RUNNING", JobState::Active),
        ("COMPLETED", JobState::Completed),
        ("CANCELLED", JobState::Canceled),
        ("FAILED", JobState::Failed),
        ("TIMEOUT", JobState::Failed),
        ("PREEMPTED", JobState::Failed),
        ("NODE_FAIL", JobState::Failed),
    ],
    FallbackPolicy::DefaultTo(JobState::New),
);

/// Driver for the NERSC Superfacility API
pub struct NerscDriver {
    transport: HttpTransport,
    token: String,
    machine: String,
    observer: Arc<dyn Observer>,
}

impl NerscDriver {
    pub fn new(config: DriverConfig, observer: Arc<dyn Observer>) -> Result<Self> {
        let transport = HttpTransport::new(&config, DEFAULT_URL)?;
        Ok(Self {
            transport,
            token: config.token,
            machine: DEFAULT_MACHINE.to_string(),
            observer,
        })
    }

    /// Targets another compute resource than Perlmutter
    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = machine.into();
        self
    }

    pub fn describe() -> DriverDescriptor {
        DriverDescriptor::new(
            NAME,
            "NERSC",
            "0.1.0",
            "Executor for the NERSC computing facility",
        )
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn machine(&self) -> &str {
        &self.machine
    }

    /// Fetches general facility status from the `/status` endpoint
    pub async fn facility_status(&self) -> Result<Value> {
        let response = self
            .transport
            .client()
            .get(self.transport.url("status"))
            .header("accept", "application/json")
            .send()
            .await?;

        self.transport.handle_response(response).await
    }

    fn jobs_url(&self) -> String {
        self.transport.url(&format!("compute/jobs/{}", self.machine))
    }

    fn job_url(&self, native_id: &str) -> Result<reqwest::Url> {
        self.transport
            .segment_url(&format!("compute/jobs/{}", self.machine), native_id)
    }

    fn request<U: reqwest::IntoUrl>(&self, method: reqwest::Method, url: U) -> reqwest::RequestBuilder {
        self.transport
            .client()
            .request(method, url)
            .header("accept", "application/json")
            .bearer_auth(&self.token)
    }
}

#[async_trait]
impl BackendDriver for NerscDriver {
    fn descriptor(&self) -> DriverDescriptor {
        Self::describe()
    }

    fn state_table(&self) -> &StateTable {
        &STATES
    }

    async fn submit_job(&self, spec: &JobSpec) -> Result<String> {
        self.observer.info(&format!(
            "Submitting job {} to NERSC {}",
            spec.name.as_deref().unwrap_or("<unnamed>"),
            self.machine
        ));

        let response = self
            .request(reqwest::Method::POST, self.jobs_url())
            .form(&submit_form(spec))
            .send()
            .await?;
        let body: SubmitResponse = self.transport.handle_response(response).await?;

        let native_id = body
            .jobid
            .as_ref()
            .and_then(native_id_from_value)
            .ok_or_else(|| ExecutorError::protocol("Failed to get job ID from NERSC"))?;

        self.observer.info(&format!(
            "Job submitted to NERSC, received native_id: {}",
            native_id
        ));
        Ok(native_id)
    }

    async fn cancel_job(&self, native_id: &str) -> Result<()> {
        self.observer
            .info(&format!("Cancelling job {} on NERSC.", native_id));

        let response = self
            .request(reqwest::Method::DELETE, self.job_url(native_id)?)
            .send()
            .await?;

        self.transport.handle_empty_response(response).await
    }

    async fn list_jobs(&self) -> Result<Vec<String>> {
        self.observer.info("Listing jobs on NERSC.");

        let response = self
            .request(reqwest::Method::GET, self.jobs_url())
            .query(&[("index", "0"), ("sacct", "false"), ("cached", "true")])
            .send()
            .await?;
        let body: ListResponse = self.transport.handle_response(response).await?;

        let ids: Vec<String> = body
            .records()?
            .iter()
            .filter_map(|r| r.jobid.as_ref().and_then(native_id_from_value))
            .collect();

        self.observer.info(&format!("Found {} jobs.", ids.len()));
        Ok(ids)
    }

    async fn get_job_status(&self, native_id: &str) -> Result<JobState> {
        self.observer.info(&format!(
            "Getting status for job {} from NERSC.",
            native_id
        ));

        let response = self
            .request(reqwest::Method::GET, self.job_url(native_id)?)
            .send()
            .await?;
        let body: StatusResponse = self
            .transport
            .handle_response(response)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ExecutorError::NotFound(native_id.to_string())
                } else {
                    e
                }
            })?;

        if let Some(message) = body.error_message() {
            return Err(ExecutorError::protocol(format!(
                "NERSC reported an error for job {}: {}",
                native_id, message
            )));
        }

        let token = match (&body.output, &body.status) {
            (Some(records), _) => records
                .first()
                .ok_or_else(|| ExecutorError::NotFound(native_id.to_string()))?
                .state
                .clone()
                .ok_or_else(|| {
                    ExecutorError::protocol(format!("NERSC job {} record has no state", native_id))
                })?,
            (None, Some(status)) => status.clone(),
            (None, None) => {
                return Err(ExecutorError::protocol(format!(
                    "NERSC response for job {} has no status",
                    native_id
                )));
            }
        };

        STATES.map(&token)
    }
}

/// Form fields for a job submission
///
/// The job is always sent as a script body (`isPath=false`) so that the
/// resources, wall time and environment travel with it as `#SBATCH`
/// directives and exports. Arguments are baked into the script.
fn submit_form(spec: &JobSpec) -> Vec<(&'static str, String)> {
    vec![
        ("isPath", "false".to_string()),
        ("job", sbatch_script(spec)),
        ("callbackTimeout", "0".to_string()),
    ]
}

/// Superfacility replies `{"status": "ERROR", "error": ...}` with a 200 on
/// failures such as an expired token
fn reported_error(status: Option<&str>, error: Option<&str>) -> Option<String> {
    match status {
        Some(status) if status.eq_ignore_ascii_case("ERROR") => {
            Some(error.unwrap_or("unknown error").to_string())
        }
        _ => None,
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    jobid: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JobRecord {
    #[serde(default)]
    jobid: Option<Value>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Records(Vec<JobRecord>),
    Wrapped {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        output: Option<Vec<JobRecord>>,
    },
}

impl ListResponse {
    fn records(&self) -> Result<&[JobRecord]> {
        match self {
            ListResponse::Records(r) => Ok(r.as_slice()),
            ListResponse::Wrapped {
                status,
                error,
                output,
            } => {
                if let Some(message) = reported_error(status.as_deref(), error.as_deref()) {
                    return Err(ExecutorError::protocol(format!(
                        "NERSC failed to list jobs: {}",
                        message
                    )));
                }
                output
                    .as_deref()
                    .ok_or_else(|| ExecutorError::protocol("NERSC job list has no output"))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    output: Option<Vec<JobRecord>>,
}

impl StatusResponse {
    fn error_message(&self) -> Option<String> {
        reported_error(self.status.as_deref(), self.error.as_deref())
    }
}
