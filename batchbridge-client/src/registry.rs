//! Driver registry
//!
//! Lets callers pick a backend driver by its stable name at runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use batchbridge_core::DriverDescriptor;

use crate::config::DriverConfig;
use crate::driver::BackendDriver;
use crate::drivers::{NerscDriver, SlurmRestDriver};
use crate::error::{ExecutorError, Result};
use crate::executor::RemoteExecutor;
use crate::observer::Observer;

/// Constructs a driver from its configuration
pub type DriverFactory =
    fn(DriverConfig, Arc<dyn Observer>) -> Result<Arc<dyn BackendDriver>>;

struct Entry {
    descriptor: DriverDescriptor,
    factory: DriverFactory,
}

/// Name-indexed set of available drivers
#[derive(Default)]
pub struct DriverRegistry {
    entries: BTreeMap<String, Entry>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bundled Slurm REST and NERSC drivers
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SlurmRestDriver::describe(), |config, observer| {
            Ok(Arc::new(SlurmRestDriver::new(config, observer)?))
        });
        registry.register(NerscDriver::describe(), |config, observer| {
            Ok(Arc::new(NerscDriver::new(config, observer)?))
        });
        registry
    }

    /// Registers a driver, replacing any earlier one with the same name
    pub fn register(&mut self, descriptor: DriverDescriptor, factory: DriverFactory) {
        tracing::debug!("Registering driver {} ({})", descriptor.name, descriptor.version);
        self.entries.insert(
            descriptor.name.clone(),
            Entry {
                descriptor,
                factory,
            },
        );
    }

    /// All registered descriptors, sorted by name
    pub fn descriptors(&self) -> Vec<DriverDescriptor> {
        self.entries
            .values()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&DriverDescriptor> {
        self.entries.get(name).map(|e| &e.descriptor)
    }

    /// Builds the driver registered under `name`
    pub fn create(
        &self,
        name: &str,
        config: DriverConfig,
        observer: Arc<dyn Observer>,
    ) -> Result<Arc<dyn BackendDriver>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ExecutorError::UnknownDriver(name.to_string()))?;
        (entry.factory)(config, observer)
    }

    /// Builds the driver registered under `name` and wraps it in an adapter
    pub fn executor(
        &self,
        name: &str,
        config: DriverConfig,
        observer: Arc<dyn Observer>,
    ) -> Result<RemoteExecutor> {
        let driver = self.create(name, config, observer.clone())?;
        Ok(RemoteExecutor::new(driver, observer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::TracingObserver;

    #[test]
    fn test_builtin_drivers() {
        let registry = DriverRegistry::builtin();
        let names: Vec<_> = registry
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["nersc".to_string(), "slurm-rest".to_string()]);

        let slurm = registry.descriptor("slurm-rest").unwrap();
        assert_eq!(slurm.nice_name, "Slurm REST API");
        assert_eq!(slurm.version, "0.0.1");
    }

    #[test]
    fn test_create_by_name() {
        let registry = DriverRegistry::builtin();
        let driver = registry
            .create("nersc", DriverConfig::new("tok"), TracingObserver::shared())
            .unwrap();
        assert_eq!(driver.descriptor().name, "nersc");
    }

    #[test]
    fn test_unknown_driver() {
        let registry = DriverRegistry::builtin();
        let err = registry
            .create("pbs", DriverConfig::default(), TracingObserver::shared())
            .err()
            .unwrap();
        assert!(matches!(err, ExecutorError::UnknownDriver(name) if name == "pbs"));
    }

    #[test]
    fn test_invalid_config_is_rejected_at_construction() {
        let registry = DriverRegistry::builtin();
        let config = DriverConfig::default().with_base_url("slurm:6820");
        let err = registry
            .executor("slurm-rest", config, TracingObserver::shared())
            .err()
            .unwrap();
        assert!(matches!(err, ExecutorError::InvalidConfig(_)));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = DriverRegistry::builtin();
        registry.register(
            DriverDescriptor::new("nersc", "NERSC (patched)", "0.2.0", ""),
            |config, observer| Ok(Arc::new(NerscDriver::new(config, observer)?)),
        );
        assert_eq!(registry.descriptors().len(), 2);
        assert_eq!(registry.descriptor("nersc").unwrap().version, "0.2.0");
    }
}
