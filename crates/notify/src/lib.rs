//! Alert Notification
//!
//! Renders debounced alerts as chat messages and delivers them to every
//! configured channel. Delivery is fire-and-forget: failures are logged
//! and counted, never reported back to the debouncer.
//!
//! # Architecture
//!
//! - [`NotifyChannel`] is the interface every chat destination implements
//! - [`TelegramChannel`] posts through the Telegram Bot API
//! - [`Notifier`] fans an alert out to all enabled channels, and
//!   [`Notifier::run`] drains the debouncer's fired-alert queue

pub mod channels;
pub mod error;
pub mod format;

pub use channels::telegram::{TelegramChannel, TelegramConfig};
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use format::{LinkConfig, MessageFormatter};

use alerting::{AlertEvent, FiredAlert};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Central notification dispatcher.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
}

impl Notifier {
    /// Create a notifier from channel settings, keeping only enabled channels.
    #[must_use]
    pub fn from_config(telegram: &TelegramConfig, links: &LinkConfig) -> Self {
        let formatter = MessageFormatter::new(links);
        let candidates: Vec<Arc<dyn NotifyChannel>> =
            vec![Arc::new(TelegramChannel::new(telegram.clone(), formatter))];

        let channels: Vec<_> = candidates.into_iter().filter(|c| c.enabled()).collect();
        if channels.is_empty() {
            warn!("No notification channels configured, fired alerts will only be logged");
        } else {
            info!(channel_count = channels.len(), "Notification system initialized");
        }

        Self { channels }
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self { channels }
    }

    /// Get the number of channels alerts are sent to.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver an alert to every channel in turn.
    ///
    /// Failures are logged and counted per channel; they never stop the
    /// remaining channels and are not retried.
    pub async fn notify(&self, event: &AlertEvent) {
        if self.channels.is_empty() {
            debug!(target_id = event.target.id_or_unknown(), "No channels configured, skipping alert");
            return;
        }

        for channel in &self.channels {
            deliver(channel.as_ref(), event).await;
        }
    }

    /// Drain fired alerts until the debouncer side of the queue is dropped.
    ///
    /// Each alert is delivered on its own task so a slow channel does not
    /// hold up the queue. Returns once the queue is closed and every
    /// delivery already started has finished.
    pub async fn run(self: Arc<Self>, mut fired: mpsc::Receiver<FiredAlert>) {
        info!("Starting alert dispatcher");
        let mut deliveries = JoinSet::new();

        loop {
            tokio::select! {
                alert = fired.recv() => {
                    let Some(alert) = alert else { break };
                    info!(key = %alert.key, "Dispatching debounced alert");
                    let notifier = Arc::clone(&self);
                    deliveries.spawn(async move { notifier.notify(&alert.event).await });
                }
                Some(finished) = deliveries.join_next(), if !deliveries.is_empty() => {
                    log_delivery_task(finished);
                }
            }
        }

        if !deliveries.is_empty() {
            info!(in_flight = deliveries.len(), "Waiting for in-flight deliveries");
        }
        while let Some(finished) = deliveries.join_next().await {
            log_delivery_task(finished);
        }
        info!("Alert dispatcher stopped");
    }
}

fn log_delivery_task(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        error!(error = %e, "Delivery task ended abnormally");
    }
}

async fn deliver(channel: &dyn NotifyChannel, event: &AlertEvent) {
    let channel_name = channel.name();
    match channel.send(event).await {
        Ok(()) => {
            debug!(channel = channel_name, "Notification sent");
            metrics::counter!("alert_relay_notifications_total", "channel" => channel_name, "outcome" => "sent")
                .increment(1);
        }
        Err(e) => {
            error!(channel = channel_name, error = %e, "Failed to send notification");
            metrics::counter!("alert_relay_notifications_total", "channel" => channel_name, "outcome" => "failed")
                .increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertKey, AlertTarget, DebounceConfig, Debouncer};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Records every alert it is asked to send
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<AlertEvent>>,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
            tokio::time::sleep(self.delay).await;
            self.sent.lock().await.push(event.clone());
            if self.fail {
                Err(ChannelError::NotConfigured("recording".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn alert(id: &str) -> AlertEvent {
        AlertEvent {
            level: Some("CRITICAL".to_string()),
            target: AlertTarget::new("Server", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_unconfigured_notifier_has_no_channels() {
        let notifier = Notifier::from_config(&TelegramConfig::default(), &LinkConfig::default());
        assert_eq!(notifier.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_reaches_every_channel_despite_failures() {
        let failing = Arc::new(RecordingChannel {
            fail: true,
            ..Default::default()
        });
        let ok = Arc::new(RecordingChannel::default());
        let notifier = Notifier::with_channels(vec![
            failing.clone() as Arc<dyn NotifyChannel>,
            ok.clone() as Arc<dyn NotifyChannel>,
        ]);

        notifier.notify(&alert("s1")).await;
        assert_eq!(failing.sent.lock().await.len(), 1);
        assert_eq!(ok.sent.lock().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_finishes_slow_deliveries_after_queue_closes() {
        let channel = Arc::new(RecordingChannel {
            delay: Duration::from_secs(30),
            ..Default::default()
        });
        let notifier = Arc::new(Notifier::with_channels(vec![channel.clone() as Arc<dyn NotifyChannel>]));
        let (tx, rx) = mpsc::channel(4);
        let dispatcher = tokio::spawn(Arc::clone(&notifier).run(rx));

        for id in ["s1", "s2"] {
            tx.send(FiredAlert {
                key: AlertKey::from(format!("Server:{id}:CRITICAL").as_str()),
                event: alert(id),
            })
            .await
            .unwrap();
        }
        drop(tx);

        dispatcher.await.unwrap();
        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_delivers_fired_alerts_once() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = Arc::new(Notifier::with_channels(vec![channel.clone() as Arc<dyn NotifyChannel>]));
        let (debouncer, fired) = Debouncer::new(&DebounceConfig {
            window_seconds: 60,
            ..Default::default()
        })
        .unwrap();
        let dispatcher = tokio::spawn(Arc::clone(&notifier).run(fired));

        let mut last = alert("s1");
        debouncer.admit(alert("s1")).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        last.ts = Some(42);
        debouncer.admit(last.clone()).await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let sent = channel.sent.lock().await.clone();
        assert_eq!(sent, vec![last]);

        drop(debouncer);
        dispatcher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delivery_does_not_requeue() {
        let channel = Arc::new(RecordingChannel {
            fail: true,
            ..Default::default()
        });
        let notifier = Arc::new(Notifier::with_channels(vec![channel.clone() as Arc<dyn NotifyChannel>]));
        let (debouncer, fired) = Debouncer::new(&DebounceConfig::default()).unwrap();
        tokio::spawn(Arc::clone(&notifier).run(fired));

        debouncer.admit(alert("s1")).await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(channel.sent.lock().await.len(), 1);
        assert_eq!(debouncer.pending_count().await, 0);
    }
}
