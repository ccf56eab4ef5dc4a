//! Per-thread write serialization.
//!
//! `SaveMessage` reads a thread's counters, computes the next sequence,
//! builds a batch, and applies it — a read-modify-write that two
//! concurrent appends to the same thread must not interleave. A global
//! lock would serialize unrelated threads against each other for no
//! reason, so instead we keep one mutex per thread key and only take the
//! one that matters.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Default cap on the number of distinct thread locks kept resident. Once
/// exceeded, idle locks (not currently held) are evicted to bound memory
/// for deployments with unboundedly many threads.
pub const DEFAULT_MAX_LOCKS: usize = 100_000;

/// A guard that serializes writers to a single thread key.
pub struct ThreadLockManager {
    locks: DashMap<String, Arc<Mutex<()>>>,
    max_locks: usize,
}

impl ThreadLockManager {
    /// A manager with the default eviction cap.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_LOCKS)
    }

    /// A manager that evicts idle locks once more than `max_locks` are
    /// resident.
    pub fn with_capacity(max_locks: usize) -> Self {
        Self { locks: DashMap::new(), max_locks }
    }

    /// Acquire the mutex guarding `thread_key`, creating it if this is the
    /// first writer to ever touch that thread.
    pub async fn lock(&self, thread_key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let entry = self
            .locks
            .entry(thread_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        if self.locks.len() > self.max_locks {
            self.evict_idle(thread_key);
        }
        entry.lock_owned().await
    }

    /// Number of distinct thread keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no thread keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn evict_idle(&self, keep: &str) {
        let victims: Vec<String> = self
            .locks
            .iter()
            .filter(|e| e.key() != keep && Arc::strong_count(e.value()) == 1)
            .take(self.locks.len().saturating_sub(self.max_locks))
            .map(|e| e.key().clone())
            .collect();
        for key in victims {
            self.locks.remove(&key);
        }
    }
}

impl Default for ThreadLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn concurrent_writers_to_same_thread_serialize() {
        let mgr = Arc::new(ThreadLockManager::new());
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let mgr = mgr.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = mgr.lock("t:1").await;
                let before = counter.load(Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.store(before + 1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn distinct_threads_do_not_share_a_lock() {
        let mgr = ThreadLockManager::new();
        let g1 = mgr.lock("t:1").await;
        let _g2 = mgr.lock("t:2").await; // would deadlock if shared
        drop(g1);
    }

    #[tokio::test]
    async fn eviction_keeps_size_bounded() {
        let mgr = ThreadLockManager::with_capacity(4);
        for i in 0..20 {
            let _g = mgr.lock(&format!("t:{i}")).await;
        }
        assert!(mgr.len() <= 5);
    }
}
