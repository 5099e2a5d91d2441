//! Notification Error Types

use thiserror::Error;

/// Errors that can occur when delivering a notification
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Chat API answered but refused the message
    #[error("Chat API rejected message (status {status}): {description}")]
    Api { status: u16, description: String },

    /// Channel is missing required settings
    #[error("Channel not configured: {0}")]
    NotConfigured(String),
}
