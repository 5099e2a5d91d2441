//! Debounce Scheduler
//!
//! Arms one timer task per key. A timer that runs to completion claims its
//! entry from the table under the engine lock, then hands the payload to
//! the dispatch queue after the lock is released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::event::AlertEvent;
use crate::key::AlertKey;
use crate::table::{DebounceTable, PendingEntry};

/// An alert whose debounce window elapsed without interruption
#[derive(Debug, Clone)]
pub struct FiredAlert {
    pub key: AlertKey,
    /// Last payload stored for the key
    pub event: AlertEvent,
}

/// Per-key timer management
#[derive(Debug)]
pub(crate) struct Scheduler {
    window: Duration,
    fired_tx: mpsc::Sender<FiredAlert>,
    next_generation: AtomicU64,
}

impl Scheduler {
    pub(crate) fn new(window: Duration, fired_tx: mpsc::Sender<FiredAlert>) -> Self {
        Self {
            window,
            fired_tx,
            next_generation: AtomicU64::new(1),
        }
    }

    pub(crate) fn window(&self) -> Duration {
        self.window
    }

    /// Arm a timer for `key`, replacing any timer already armed for it.
    ///
    /// `guard` must be the locked contents of `table`; the new timer cannot
    /// observe the table until that lock is released, and the replaced
    /// timer is aborted before then. Returns whether an entry was replaced.
    pub(crate) fn arm(
        &self,
        table: &Arc<Mutex<DebounceTable>>,
        guard: &mut DebounceTable,
        key: AlertKey,
        payload: AlertEvent,
    ) -> bool {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let armed_at = Instant::now();
        let due_at = armed_at + self.window;

        let timer = tokio::spawn(fire_at(
            Arc::downgrade(table),
            key.clone(),
            generation,
            due_at,
            self.fired_tx.clone(),
        ));

        debug!(key = %key, generation, window_secs = self.window.as_secs(), "Armed debounce timer");
        guard.insert(key, PendingEntry::new(payload, generation, armed_at, due_at, timer))
    }

    /// Cancel the timer for `key`; a missing key is a no-op
    pub(crate) fn cancel(guard: &mut DebounceTable, key: &AlertKey) -> bool {
        guard.cancel(key).is_some()
    }
}

/// Timer body: wait out the window, claim the entry, hand it off
async fn fire_at(
    table: Weak<Mutex<DebounceTable>>,
    key: AlertKey,
    generation: u64,
    due_at: Instant,
    fired_tx: mpsc::Sender<FiredAlert>,
) {
    sleep_until(due_at).await;

    let Some(table) = table.upgrade() else {
        return;
    };

    let event = {
        let mut guard = table.lock().await;
        guard.take_expired(&key, generation)
    };
    drop(table);

    let Some(event) = event else {
        debug!(key = %key, generation, "Timer superseded before it could fire");
        return;
    };

    debug!(key = %key, "Debounce window elapsed, dispatching alert");
    if fired_tx.send(FiredAlert { key, event }).await.is_err() {
        warn!("Dispatch queue closed, fired alert dropped");
    }
}
