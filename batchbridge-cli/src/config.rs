//! Configuration module
//!
//! Starts from the `BATCHBRIDGE_*` environment, applies command-line flags on
//! top, and builds the lifecycle adapter for the selected driver.

use std::time::Duration;

use anyhow::{Context, Result};
use batchbridge_client::{DriverConfig, DriverRegistry, RemoteExecutor, TracingObserver};
use clap::Args;

/// Connection flags; each one overrides its `BATCHBRIDGE_*` variable
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionFlags {
    /// Scheduler base URL (BATCHBRIDGE_URL; defaults to the driver's own)
    #[arg(long)]
    pub url: Option<String>,

    /// API token (BATCHBRIDGE_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// User name header for schedulers that need one (BATCHBRIDGE_USER_NAME)
    #[arg(long)]
    pub user_name: Option<String>,

    /// Skip TLS certificate verification (BATCHBRIDGE_VERIFY_TLS=false)
    #[arg(long)]
    pub insecure: bool,

    /// Request timeout in seconds (BATCHBRIDGE_TIMEOUT; default 30)
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the selected driver
    pub driver: String,
    pub driver_config: DriverConfig,
}

impl Config {
    pub fn new(driver: String, driver_config: DriverConfig) -> Self {
        Self {
            driver,
            driver_config,
        }
    }

    /// Loads the driver configuration from the environment
    pub fn from_env(driver: String) -> Result<Self> {
        let driver_config =
            DriverConfig::from_env().context("Invalid BATCHBRIDGE_* environment")?;
        Ok(Self::new(driver, driver_config))
    }

    /// Applies command-line flags over the current settings
    pub fn with_flags(mut self, flags: &ConnectionFlags) -> Self {
        let config = &mut self.driver_config;

        if let Some(url) = &flags.url {
            config.base_url = Some(url.clone()).filter(|u| !u.is_empty());
        }
        if let Some(token) = &flags.token {
            config.token = token.clone();
        }
        if let Some(user_name) = &flags.user_name {
            config.user_name = Some(user_name.clone()).filter(|u| !u.is_empty());
        }
        if flags.insecure {
            config.verify_tls = false;
        }
        if let Some(timeout) = flags.timeout {
            config.timeout = Duration::from_secs(timeout);
        }

        self
    }

    /// Builds the adapter for the configured driver
    pub fn executor(&self, registry: &DriverRegistry) -> Result<RemoteExecutor> {
        registry
            .executor(
                &self.driver,
                self.driver_config.clone(),
                TracingObserver::shared(),
            )
            .with_context(|| format!("Failed to set up driver {}", self.driver))
    }
}
