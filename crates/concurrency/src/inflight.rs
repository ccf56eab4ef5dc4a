//! Tracks provisional keys from the moment they're handed to a client
//! until the worker that owns them publishes the final key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;

use progressdb_core::key::is_provisional;
use progressdb_core::{Error, Result};

struct Slot {
    tx: watch::Sender<Option<String>>,
    rx: watch::Receiver<Option<String>>,
}

/// Maps provisional keys to the final keys the worker pool eventually
/// assigns them.
pub struct InflightTracker {
    slots: DashMap<String, Slot>,
    closed: AtomicBool,
}

impl InflightTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self { slots: DashMap::new(), closed: AtomicBool::new(false) }
    }

    /// Register a provisional key right before returning it to the client.
    /// Idempotent: re-registering an already-tracked key is a no-op.
    pub fn register(&self, provisional_key: &str) {
        self.slots.entry(provisional_key.to_string()).or_insert_with(|| {
            let (tx, rx) = watch::channel(None);
            Slot { tx, rx }
        });
    }

    /// Publish the final key for a provisional one. Must be called by the
    /// worker before any relationship or index entry naming the final key
    /// is written, so no reader ever observes the final key before it can
    /// be resolved back from the provisional one.
    pub fn resolve(&self, provisional_key: &str, final_key: &str) {
        if let Some(slot) = self.slots.get(provisional_key) {
            let _ = slot.tx.send(Some(final_key.to_string()));
        } else {
            // A worker resolving a key nobody registered (e.g. after a
            // crash/restart) still needs readers to find it going forward.
            self.register(provisional_key);
            if let Some(slot) = self.slots.get(provisional_key) {
                let _ = slot.tx.send(Some(final_key.to_string()));
            }
        }
    }

    /// Resolve `key` to a final key, blocking up to `timeout` if it is
    /// provisional and not yet resolved. Keys that are already final are
    /// returned immediately without consulting the tracker.
    pub async fn resolve_or_wait(&self, key: &str, timeout: Duration) -> Result<String> {
        if !is_provisional(key) {
            return Ok(key.to_string());
        }

        let mut rx = {
            let slot = self
                .slots
                .get(key)
                .ok_or_else(|| Error::NotFound(format!("unknown provisional key {key:?}")))?;
            if let Some(resolved) = slot.rx.borrow().clone() {
                return Ok(resolved);
            }
            slot.rx.clone()
        };

        if self.closed.load(Ordering::Acquire) {
            return Err(Error::NotFound(format!("queue closed before {key:?} resolved")));
        }

        let wait = tokio::time::timeout(timeout, async {
            loop {
                if rx.changed().await.is_err() {
                    return None;
                }
                if let Some(final_key) = rx.borrow().clone() {
                    return Some(final_key);
                }
            }
        });

        match wait.await {
            Ok(Some(final_key)) => Ok(final_key),
            _ => Err(Error::NotFound(format!("timed out waiting for {key:?} to resolve"))),
        }
    }

    /// Mark the tracker closed: further waits on unresolved keys fail
    /// immediately instead of blocking out the full timeout, mirroring the
    /// ingest queue's own closed state.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Number of provisional keys currently tracked (resolved or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no provisional keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for InflightTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn already_final_keys_pass_through() {
        let tracker = InflightTracker::new();
        let resolved = tracker.resolve_or_wait("t:0000000000000000001", Duration::from_millis(50)).await.unwrap();
        assert_eq!(resolved, "t:0000000000000000001");
    }

    #[tokio::test]
    async fn unregistered_provisional_key_is_not_found() {
        let tracker = InflightTracker::new();
        let err = tracker.resolve_or_wait("t:prv:0000000000000000001", Duration::from_millis(50)).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn resolution_unblocks_a_waiting_reader() {
        let tracker = std::sync::Arc::new(InflightTracker::new());
        let prov = "t:prv:0000000000000000001";
        tracker.register(prov);

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker.resolve_or_wait(prov, Duration::from_secs(2)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.resolve(prov, "t:0000000000000000001");

        let resolved = waiter.await.unwrap().unwrap();
        assert_eq!(resolved, "t:0000000000000000001");
    }

    #[tokio::test]
    async fn timeout_surfaces_as_not_found() {
        let tracker = InflightTracker::new();
        let prov = "t:prv:0000000000000000002";
        tracker.register(prov);
        let result = tracker.resolve_or_wait(prov, Duration::from_millis(30)).await;
        assert!(result.is_err());
    }
}
