//! Debounce Table

use std::collections::HashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::event::AlertEvent;
use crate::key::AlertKey;

/// A key whose notification has been armed but not yet sent
#[derive(Debug)]
pub(crate) struct PendingEntry {
    /// Latest payload; this is what gets sent when the timer fires
    pub payload: AlertEvent,
    /// Identifies the arming that owns `timer`
    pub generation: u64,
    pub armed_at: Instant,
    pub due_at: Instant,
    timer: JoinHandle<()>,
}

impl PendingEntry {
    pub(crate) fn new(
        payload: AlertEvent,
        generation: u64,
        armed_at: Instant,
        due_at: Instant,
        timer: JoinHandle<()>,
    ) -> Self {
        Self {
            payload,
            generation,
            armed_at,
            due_at,
            timer,
        }
    }

    /// Stop the timer; it will never fire for this arming
    pub(crate) fn cancel(self) -> AlertEvent {
        self.timer.abort();
        self.payload
    }
}

/// Point-in-time view of a pending entry
#[derive(Debug, Clone)]
pub struct PendingSnapshot {
    pub key: AlertKey,
    pub payload: AlertEvent,
    pub armed_at: Instant,
    pub due_at: Instant,
}

/// Keys with a pending notification.
///
/// Holds at most one entry (and so one live timer) per key and never
/// more than `capacity` entries. Callers must hold the engine lock.
#[derive(Debug)]
pub(crate) struct DebounceTable {
    entries: HashMap<AlertKey, PendingEntry>,
    capacity: usize,
}

impl DebounceTable {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn contains(&self, key: &AlertKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `key` may be stored without exceeding capacity
    pub(crate) fn has_room_for(&self, key: &AlertKey) -> bool {
        self.contains(key) || self.entries.len() < self.capacity
    }

    /// Store an entry, cancelling the timer of any entry it replaces
    pub(crate) fn insert(&mut self, key: AlertKey, entry: PendingEntry) -> bool {
        match self.entries.insert(key, entry) {
            Some(previous) => {
                previous.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove and cancel the entry for `key`; absent keys are a no-op
    pub(crate) fn cancel(&mut self, key: &AlertKey) -> Option<AlertEvent> {
        self.entries.remove(key).map(PendingEntry::cancel)
    }

    /// Remove and cancel every entry whose key starts with `prefix`
    pub(crate) fn cancel_prefix(&mut self, prefix: &str) -> usize {
        let doomed: Vec<AlertKey> = self
            .entries
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect();

        for key in &doomed {
            self.cancel(key);
        }
        doomed.len()
    }

    /// Remove and cancel everything
    pub(crate) fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.cancel();
        }
        count
    }

    /// Remove the entry for a timer that just expired.
    ///
    /// Only the arming identified by `generation` may claim the entry; a
    /// timer that lost a race with a supersede or cancel gets `None`. The
    /// timer is not aborted because the caller is that timer.
    pub(crate) fn take_expired(&mut self, key: &AlertKey, generation: u64) -> Option<AlertEvent> {
        match self.entries.get(key) {
            Some(entry) if entry.generation == generation => {
                self.entries.remove(key).map(|entry| entry.payload)
            }
            _ => None,
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<PendingSnapshot> {
        let mut entries: Vec<PendingSnapshot> = self
            .entries
            .iter()
            .map(|(key, entry)| PendingSnapshot {
                key: key.clone(),
                payload: entry.payload.clone(),
                armed_at: entry.armed_at,
                due_at: entry.due_at,
            })
            .collect();
        entries.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.key.cmp(&b.key)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn idle_entry(generation: u64) -> PendingEntry {
        let now = Instant::now();
        let timer = tokio::spawn(std::future::pending::<()>());
        PendingEntry::new(
            AlertEvent::default(),
            generation,
            now,
            now + Duration::from_secs(60),
            timer,
        )
    }

    #[tokio::test]
    async fn test_insert_replaces_and_aborts() {
        let mut table = DebounceTable::new(4);
        let key = AlertKey::from("server:s1:CRITICAL");

        let first = idle_entry(1);
        let first_timer = first.timer.abort_handle();
        assert!(!table.insert(key.clone(), first));
        assert!(table.insert(key.clone(), idle_entry(2)));

        for _ in 0..10 {
            if first_timer.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(first_timer.is_finished());
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_room() {
        let mut table = DebounceTable::new(1);
        let held = AlertKey::from("a:1:WARNING");
        table.insert(held.clone(), idle_entry(1));

        assert!(table.has_room_for(&held));
        assert!(!table.has_room_for(&AlertKey::from("a:2:WARNING")));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let mut table = DebounceTable::new(4);
        let key = AlertKey::from("a:1:WARNING");
        table.insert(key.clone(), idle_entry(1));

        assert!(table.cancel(&key).is_some());
        assert!(table.cancel(&key).is_none());
        assert!(table.cancel(&AlertKey::from("never:seen:OK")).is_none());
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_cancel_prefix_only_hits_family() {
        let mut table = DebounceTable::new(8);
        table.insert(AlertKey::from("stack:x:state:degraded"), idle_entry(1));
        table.insert(AlertKey::from("stack:x:state:stopped"), idle_entry(2));
        table.insert(AlertKey::from("stack:x:WARNING"), idle_entry(3));
        table.insert(AlertKey::from("stack:xy:state:degraded"), idle_entry(4));

        assert_eq!(table.cancel_prefix("stack:x:state:"), 2);
        assert_eq!(table.len(), 2);
        assert!(table.contains(&AlertKey::from("stack:x:WARNING")));
        assert!(table.contains(&AlertKey::from("stack:xy:state:degraded")));
    }

    #[tokio::test]
    async fn test_take_expired_checks_generation() {
        let mut table = DebounceTable::new(4);
        let key = AlertKey::from("a:1:WARNING");
        table.insert(key.clone(), idle_entry(7));

        assert!(table.take_expired(&key, 6).is_none());
        assert!(table.contains(&key));
        assert!(table.take_expired(&key, 7).is_some());
        assert!(!table.contains(&key));
    }
}
