//! Error types for the Batchbridge client

use thiserror::Error;

/// Result type alias for adapter and driver operations
pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Errors that can occur while talking to a remote scheduler
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The HTTP request itself failed (connection, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The scheduler answered with a non-success status code
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, or a placeholder if it could not be read
        message: String,
    },

    /// The scheduler answered successfully but the payload lacked an expected field
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The scheduler does not know the job
    #[error("Job not found: {0}")]
    NotFound(String),

    /// A native status token outside the driver's mapping table
    #[error("Driver {driver} cannot map job state {token:?}")]
    UnmappedState { driver: String, token: String },

    /// The caller violated a precondition; no request was sent
    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Invalid driver configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),
}

impl ExecutorError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::Api { status: 404, .. })
    }

    /// Check if the failure happened on the wire rather than in the payload
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Api { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }
}
