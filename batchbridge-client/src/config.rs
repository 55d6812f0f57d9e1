//! Driver configuration
//!
//! Connection settings shared by every backend driver: base URL override,
//! credential, TLS verification and request timeout. A driver clones the
//! configuration at construction and never changes it afterwards.

use std::time::Duration;

use crate::error::{ExecutorError, Result};

/// Default timeout applied to every request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Overrides the driver's default base URL when set
    pub base_url: Option<String>,

    /// Bearer token (or the scheduler's equivalent)
    pub token: String,

    /// Verify the server certificate
    pub verify_tls: bool,

    /// Identity header for schedulers that want one (e.g., Slurm's user name)
    pub user_name: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl DriverConfig {
    /// Creates a configuration carrying only a token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates configuration from environment variables
    ///
    /// Recognised variables:
    /// - BATCHBRIDGE_URL (optional)
    /// - BATCHBRIDGE_TOKEN (optional, default: empty)
    /// - BATCHBRIDGE_VERIFY_TLS (optional, default: true)
    /// - BATCHBRIDGE_USER_NAME (optional)
    /// - BATCHBRIDGE_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DriverConfig::from_env`] with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let verify_tls = match lookup("BATCHBRIDGE_VERIFY_TLS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ExecutorError::InvalidConfig(format!("BATCHBRIDGE_VERIFY_TLS is not a boolean: {raw}"))
            })?,
            None => true,
        };

        let timeout = match lookup("BATCHBRIDGE_TIMEOUT") {
            Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ExecutorError::InvalidConfig(format!("BATCHBRIDGE_TIMEOUT is not a number of seconds: {raw}"))
            })?,
            None => DEFAULT_TIMEOUT,
        };

        let config = Self {
            base_url: lookup("BATCHBRIDGE_URL").filter(|s| !s.is_empty()),
            token: lookup("BATCHBRIDGE_TOKEN").unwrap_or_default(),
            verify_tls,
            user_name: lookup("BATCHBRIDGE_USER_NAME").filter(|s| !s.is_empty()),
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ExecutorError::InvalidConfig(format!(
                    "base URL must start with http:// or https://: {url}"
                )));
            }
        }

        if self.timeout.is_zero() {
            return Err(ExecutorError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolves the base URL against a driver default, without a trailing slash
    pub fn resolve_base_url(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: String::new(),
            verify_tls: true,
            user_name: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
