//! Notification channel implementations.

pub mod telegram;

use alerting::AlertEvent;
use async_trait::async_trait;

use crate::error::ChannelError;

/// A chat destination alerts can be delivered to.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Render and deliver one alert.
    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError>;
}
