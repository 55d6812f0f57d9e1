//! Job specification types

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-time limit when a specification does not set one
pub const DEFAULT_DURATION: Duration = Duration::from_secs(600);

/// Canonical job specification
///
/// Passed opaquely to backend drivers, which translate it into their own
/// submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub name: Option<String>,
    /// Path to an executable, or a whole script body starting with `#!`
    pub executable: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Wall-time limit
    #[serde(default = "default_duration", with = "duration_secs")]
    pub duration: Duration,
    #[serde(default)]
    pub resources: ResourceSpec,
}

/// Resource request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Never below one when deserialised
    #[serde(default = "one", deserialize_with = "at_least_one")]
    pub node_count: u32,
    #[serde(default)]
    pub processes_per_node: Option<u32>,
    #[serde(default)]
    pub gpus_per_node: Option<u32>,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            node_count: 1,
            processes_per_node: None,
            gpus_per_node: None,
        }
    }
}

impl JobSpec {
    /// Creates a specification running `executable` on one node
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            name: None,
            executable: executable.into(),
            arguments: Vec::new(),
            directory: None,
            environment: BTreeMap::new(),
            duration: DEFAULT_DURATION,
            resources: ResourceSpec::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_argument(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Sets an environment variable, replacing any earlier value for `key`
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the node count; zero is raised to one
    pub fn with_node_count(mut self, node_count: u32) -> Self {
        self.resources.node_count = node_count.max(1);
        self
    }

    /// Whether `executable` holds a script body rather than a path
    pub fn is_inline_script(&self) -> bool {
        self.executable.trim_start().starts_with("#!")
    }

    /// Wall time rounded down to whole minutes, never below one
    pub fn duration_minutes(&self) -> u64 {
        (self.duration.as_secs() / 60).max(1)
    }
}

fn default_duration() -> Duration {
    DEFAULT_DURATION
}

fn one() -> u32 {
    1
}

fn at_least_one<'de, D: serde::Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    u32::deserialize(d).map(|n| n.max(1))
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
