//! Alerting Error Types

use thiserror::Error;

/// Errors raised while setting up the debounce engine
#[derive(Debug, Clone, Error)]
pub enum AlertingError {
    /// Configuration value rejected at startup
    #[error("Invalid debounce configuration: {0}")]
    InvalidConfig(String),
}
