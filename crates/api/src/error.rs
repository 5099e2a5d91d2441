//! API Error Types

use thiserror::Error;

/// Errors that stop the relay from starting or serving
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Alerting(#[from] alerting::AlertingError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Failed to install metrics recorder: {0}")]
    Metrics(String),
}
