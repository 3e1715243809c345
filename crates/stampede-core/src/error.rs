// Error types for the core engine

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building or analyzing a run
#[derive(Debug, Error)]
pub enum CoreError {
    /// Stage plan is structurally invalid (zero-duration stage, etc.)
    #[error("Invalid stage plan: {0}")]
    InvalidPlan(String),

    /// Threshold or profile configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Create an invalid-plan error
    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        CoreError::InvalidPlan(msg.into())
    }

    /// Create an invalid-configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        CoreError::InvalidConfig(msg.into())
    }
}
