// Error types for target requests

use thiserror::Error;

/// Result type alias for target client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the target service.
///
/// Scenario code never propagates these; they are absorbed into the failure
/// registers. The pre-run health check is the one place a ClientError is
/// fatal.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect error, timeout, TLS, ...)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Target answered with a non-success status
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the documented envelope shape
    #[error("unexpected response shape: {0}")]
    Envelope(String),

    /// Base URL or client options are invalid
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn envelope(msg: impl Into<String>) -> Self {
        ClientError::Envelope(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ClientError::Config(msg.into())
    }

    /// Whether this failure was a request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Http(e) if e.is_timeout())
    }
}
