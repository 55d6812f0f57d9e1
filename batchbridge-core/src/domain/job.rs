//! Job domain types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::spec::JobSpec;

/// Canonical job state
///
/// Every backend-native status is reduced to one of these. `Completed`,
/// `Canceled` and `Failed` are terminal: once reached, a job never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    New,
    Queued,
    Active,
    Completed,
    Canceled,
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 6] = [
        JobState::New,
        JobState::Queued,
        JobState::Active,
        JobState::Completed,
        JobState::Canceled,
        JobState::Failed,
    ];

    /// Returns `true` for `Completed`, `Canceled` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Canceled | JobState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::New => "NEW",
            JobState::Queued => "QUEUED",
            JobState::Active => "ACTIVE",
            JobState::Completed => "COMPLETED",
            JobState::Canceled => "CANCELED",
            JobState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a canonical state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseJobStateError(pub String);

impl fmt::Display for ParseJobStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job state: {}", self.0)
    }
}

impl std::error::Error for ParseJobStateError {}

impl FromStr for JobState {
    type Err = ParseJobStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseJobStateError(s.to_string()))
    }
}

/// Job handle
///
/// Created by the caller in state `New`. The lifecycle adapter only ever
/// touches the native identifier and the state; the specification and the
/// local id are fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    id: Uuid,
    spec: JobSpec,
    state: JobState,
    native_id: Option<String>,
    updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a new job handle in state `New`
    pub fn new(spec: JobSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            spec,
            state: JobState::New,
            native_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Local identifier, unrelated to the scheduler's native id
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Identifier assigned by the remote scheduler, if submitted or attached
    pub fn native_id(&self) -> Option<&str> {
        self.native_id.as_deref()
    }

    /// Time of the last state change
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records the scheduler-assigned identifier
    pub fn bind_native_id(&mut self, native_id: impl Into<String>) {
        self.native_id = Some(native_id.into());
    }

    /// Moves the job to `state`
    ///
    /// Terminal states are absorbing, and a job that has left `New` cannot
    /// go back to it. Returns `true` if the state actually changed.
    pub fn transition(&mut self, state: JobState) -> bool {
        if self.state == state || self.state.is_terminal() {
            return false;
        }
        if state == JobState::New {
            return false;
        }
        self.state = state;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(JobSpec::new("/bin/hostname"))
    }

    #[test]
    fn test_new_job_starts_unsubmitted() {
        let job = job();
        assert_eq!(job.state(), JobState::New);
        assert!(job.native_id().is_none());
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = JobState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![JobState::Completed, JobState::Canceled, JobState::Failed]
        );
    }

    #[test]
    fn test_terminal_state_is_absorbing() {
        let mut job = job();
        assert!(job.transition(JobState::Queued));
        assert!(job.transition(JobState::Failed));

        assert!(!job.transition(JobState::Active));
        assert!(!job.transition(JobState::Completed));
        assert_eq!(job.state(), JobState::Failed);
    }

    #[test]
    fn test_queued_and_active_oscillate() {
        let mut job = job();
        assert!(job.transition(JobState::Queued));
        assert!(job.transition(JobState::Active));
        assert!(job.transition(JobState::Queued));
        assert_eq!(job.state(), JobState::Queued);
    }

    #[test]
    fn test_cannot_return_to_new() {
        let mut job = job();
        job.transition(JobState::Queued);
        assert!(!job.transition(JobState::New));
        assert_eq!(job.state(), JobState::Queued);
    }

    #[test]
    fn test_same_state_is_not_a_change() {
        let mut job = job();
        assert!(!job.transition(JobState::New));
    }

    #[test]
    fn test_parse_state_case_insensitive() {
        assert_eq!("active".parse::<JobState>(), Ok(JobState::Active));
        assert_eq!(" CANCELED ".parse::<JobState>(), Ok(JobState::Canceled));
        assert!("cancelled".parse::<JobState>().is_err());
    }

    #[test]
    fn test_state_serde_uppercase() {
        let json = serde_json::to_string(&JobState::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let back: JobState = serde_json::from_str("\"QUEUED\"").unwrap();
        assert_eq!(back, JobState::Queued);
    }
}
