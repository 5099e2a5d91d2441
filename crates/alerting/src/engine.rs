//! Coalescing Policy Engine

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::DebounceConfig;
use crate::event::AlertEvent;
use crate::key::{derive_key, state_family_prefix, AlertKey};
use crate::scheduler::{FiredAlert, Scheduler};
use crate::table::{DebounceTable, PendingSnapshot};
use crate::AlertingError;

/// Why an event was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// The event reports its own alert as resolved
    Resolved,
}

/// Why an event was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The table already holds the maximum number of pending keys
    Capacity,
}

/// Outcome of admitting one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A notification will fire after the debounce window
    Scheduled {
        /// An earlier pending notification for the same key was replaced
        superseded: bool,
    },
    Suppressed(SuppressReason),
    /// A recovery cancelled this many pending state alerts
    BulkCancelled(usize),
    Rejected(RejectReason),
}

impl Decision {
    /// Machine-readable status
    pub fn status(&self) -> &'static str {
        match self {
            Self::Scheduled { .. } => "scheduled",
            Self::Suppressed(_) => "suppressed",
            Self::BulkCancelled(_) => "bulk_cancelled",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Human-readable explanation
    pub fn detail(&self) -> String {
        match self {
            Self::Scheduled { superseded: false } => "notification scheduled".to_string(),
            Self::Scheduled { superseded: true } => {
                "pending notification superseded, debounce window restarted".to_string()
            }
            Self::Suppressed(SuppressReason::Resolved) => {
                "alert resolved, pending notification cancelled".to_string()
            }
            Self::BulkCancelled(count) => {
                format!("target recovered, {count} pending state alert(s) cancelled")
            }
            Self::Rejected(RejectReason::Capacity) => {
                "pending alert capacity reached, alert dropped".to_string()
            }
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status())
    }
}

struct Inner {
    table: Arc<Mutex<DebounceTable>>,
    scheduler: Scheduler,
}

/// Debounces and coalesces alerts before they reach the notifier.
///
/// Cheap to clone; all clones share one table. Every mutation runs under
/// the table lock, including the removal performed by an expiring timer.
/// Fired alerts come out of the receiver returned by [`Debouncer::new`].
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl Debouncer {
    /// Create a debouncer and the queue its fired alerts are delivered on
    pub fn new(config: &DebounceConfig) -> Result<(Self, mpsc::Receiver<FiredAlert>), AlertingError> {
        config.validate()?;
        info!(
            window_secs = config.window_seconds,
            max_pending = config.max_pending_entries,
            "Creating alert debouncer"
        );

        let (fired_tx, fired_rx) = mpsc::channel(config.dispatch_queue_capacity);
        let inner = Inner {
            table: Arc::new(Mutex::new(DebounceTable::new(config.max_pending_entries))),
            scheduler: Scheduler::new(config.window(), fired_tx),
        };

        Ok((Self { inner: Arc::new(inner) }, fired_rx))
    }

    /// Decide what to do with one incoming event.
    ///
    /// Rules apply in order: recovery bulk-cancel, resolution,
    /// supersede, then admission subject to capacity.
    pub async fn admit(&self, event: AlertEvent) -> Decision {
        let key = derive_key(&event);
        let mut table = self.inner.table.lock().await;

        if event.is_recovery() {
            let prefix = state_family_prefix(&event);
            let cancelled = table.cancel_prefix(&prefix);
            info!(prefix = %prefix, cancelled, "Target recovered, cancelled pending state alerts");
            return Decision::BulkCancelled(cancelled);
        }

        if event.resolved {
            let cancelled = Scheduler::cancel(&mut table, &key);
            debug!(key = %key, cancelled, "Alert resolved");
            return Decision::Suppressed(SuppressReason::Resolved);
        }

        if !table.has_room_for(&key) {
            warn!(
                key = %key,
                capacity = table.capacity(),
                "Pending alert capacity reached, rejecting alert"
            );
            return Decision::Rejected(RejectReason::Capacity);
        }

        let superseded = self
            .inner
            .scheduler
            .arm(&self.inner.table, &mut table, key.clone(), event);
        debug!(key = %key, superseded, pending = table.len(), "Alert scheduled");
        Decision::Scheduled { superseded }
    }

    /// Cancel the pending notification for `key`, if any
    pub async fn cancel(&self, key: &AlertKey) -> bool {
        let mut table = self.inner.table.lock().await;
        Scheduler::cancel(&mut table, key)
    }

    /// Cancel every pending notification; returns how many were dropped
    pub async fn cancel_all(&self) -> usize {
        self.inner.table.lock().await.cancel_all()
    }

    /// Number of keys with a pending notification
    pub async fn pending_count(&self) -> usize {
        self.inner.table.lock().await.len()
    }

    /// Whether `key` has a pending notification
    pub async fn is_pending(&self, key: &AlertKey) -> bool {
        self.inner.table.lock().await.contains(key)
    }

    /// Pending entries ordered by when they are due
    pub async fn pending(&self) -> Vec<PendingSnapshot> {
        self.inner.table.lock().await.snapshot()
    }

    /// Maximum number of pending keys
    pub async fn capacity(&self) -> usize {
        self.inner.table.lock().await.capacity()
    }

    /// Configured debounce window
    pub fn window(&self) -> Duration {
        self.inner.scheduler.window()
    }
}
