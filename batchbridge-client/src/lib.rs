//! Batchbridge Client
//!
//! Submits, cancels, lists and tracks jobs on remote batch schedulers that are
//! only reachable over REST.
//!
//! The crate is split into:
//! - [`BackendDriver`]: one implementation per scheduler (Slurm REST, NERSC)
//! - [`StateTable`]: each driver's native status → [`JobState`] mapping
//! - [`RemoteExecutor`]: the lifecycle logic shared by every driver
//! - [`DriverRegistry`]: driver lookup by name
//!
//! # Example
//!
//! ```no_run
//! use batchbridge_client::{DriverConfig, DriverRegistry, TracingObserver};
//! use batchbridge_core::{Job, JobSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = DriverRegistry::builtin().executor(
//!         "slurm-rest",
//!         DriverConfig::new("my-token").with_base_url("http://localhost:6820"),
//!         TracingObserver::shared(),
//!     )?;
//!
//!     let mut job = Job::new(JobSpec::new("/bin/hostname"));
//!     executor.submit(&mut job).await?;
//!     executor.refresh(&mut job).await;
//!
//!     println!("{} is {}", job.native_id().unwrap_or("?"), job.state());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod http;
pub mod observer;
pub mod registry;
pub mod state_map;

// Re-export commonly used types
pub use batchbridge_core::{DriverDescriptor, Job, JobSpec, JobState};
pub use config::DriverConfig;
pub use driver::BackendDriver;
pub use drivers::{NerscDriver, SlurmRestDriver};
pub use error::{ExecutorError, Result};
pub use executor::{RefreshOutcome, RemoteExecutor};
pub use observer::{Level, Observer, RecordingObserver, TracingObserver};
pub use registry::{DriverFactory, DriverRegistry};
pub use state_map::{FallbackPolicy, StateTable};
