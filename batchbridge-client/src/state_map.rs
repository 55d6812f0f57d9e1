//! State mapping
//!
//! Each driver owns a static table of native status tokens plus a fallback
//! policy for tokens outside that table. Matching is case-insensitive.

use batchbridge_core::JobState;

use crate::error::{ExecutorError, Result};

/// What to do with a token the table does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Resolve unknown tokens to a fixed non-terminal state
    DefaultTo(JobState),
    /// Reject unknown tokens with [`ExecutorError::UnmappedState`]
    FailOnUnknown,
}

/// A driver's native-status → canonical-state table
#[derive(Debug, Clone, Copy)]
pub struct StateTable {
    driver: &'static str,
    entries: &'static [(&'static str, JobState)],
    fallback: FallbackPolicy,
}

impl StateTable {
    pub const fn new(
        driver: &'static str,
        entries: &'static [(&'static str, JobState)],
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            driver,
            entries,
            fallback,
        }
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    pub fn entries(&self) -> &'static [(&'static str, JobState)] {
        self.entries
    }

    /// Looks `token` up without applying the fallback
    pub fn lookup(&self, token: &str) -> Option<JobState> {
        let token = token.trim();
        self.entries
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(token))
            .map(|(_, state)| *state)
    }

    /// Maps `token` to a canonical state, applying the fallback policy
    pub fn map(&self, token: &str) -> Result<JobState> {
        match (self.lookup(token), self.fallback) {
            (Some(state), _) => Ok(state),
            (None, FallbackPolicy::DefaultTo(state)) => Ok(state),
            (None, FallbackPolicy::FailOnUnknown) => Err(ExecutorError::UnmappedState {
                driver: self.driver.to_string(),
                token: token.to_string(),
            }),
        }
    }
}
