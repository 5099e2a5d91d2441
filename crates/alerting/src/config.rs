//! Debounce Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::AlertingError;

/// Longest accepted debounce window: one week
pub const MAX_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Debounce engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiet period after the last event for a key before it fires (seconds)
    pub window_seconds: u64,
    /// Maximum number of keys with a pending notification
    pub max_pending_entries: usize,
    /// Fired alerts buffered between the timers and the notifier
    pub dispatch_queue_capacity: usize,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_pending_entries: 1000,
            dispatch_queue_capacity: 1024,
        }
    }
}

impl DebounceConfig {
    /// Debounce window as a duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), AlertingError> {
        if self.window_seconds == 0 {
            return Err(AlertingError::InvalidConfig(
                "window_seconds must be greater than zero".to_string(),
            ));
        }
        if self.window_seconds > MAX_WINDOW_SECONDS {
            return Err(AlertingError::InvalidConfig(format!(
                "window_seconds must be at most {MAX_WINDOW_SECONDS}, got {}",
                self.window_seconds
            )));
        }
        if self.dispatch_queue_capacity == 0 {
            return Err(AlertingError::InvalidConfig(
                "dispatch_queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
