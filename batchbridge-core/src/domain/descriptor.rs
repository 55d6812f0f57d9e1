//! Driver descriptor

use serde::{Deserialize, Serialize};

/// Identity a backend driver advertises to the host registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDescriptor {
    /// Stable name used to select the driver (e.g., "slurm-rest")
    pub name: String,
    /// Human-readable label
    pub nice_name: String,
    /// Semantic version of the driver
    pub version: String,
    pub description: String,
}

impl DriverDescriptor {
    pub fn new(
        name: impl Into<String>,
        nice_name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            nice_name: nice_name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}
