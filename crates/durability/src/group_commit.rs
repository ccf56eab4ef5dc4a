//! Group-commit bookkeeping: batch many async writes behind a single
//! synchronous fsync, triggered by a pending-write threshold or a timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::mode::WalConfig;

/// Tracks unsynced writes and decides when the caller should force a sync.
///
/// This does not perform the sync itself — it only answers "is it time?" —
/// so it can be shared between the foreground write path and a background
/// flush loop without either side owning the store lock.
pub struct GroupCommitPolicy {
    config: WalConfig,
    pending: AtomicU64,
    last_flush: Mutex<Instant>,
}

impl GroupCommitPolicy {
    /// Build a policy from a [`WalConfig`].
    pub fn new(config: WalConfig) -> Self {
        Self {
            config,
            pending: AtomicU64::new(0),
            last_flush: Mutex::new(Instant::now()),
        }
    }

    /// Record that a write was appended without an accompanying sync.
    /// Returns `true` if the threshold has now been crossed and a flush
    /// should be issued.
    pub fn record_write(&self) -> bool {
        let pending = self.pending.fetch_add(1, Ordering::AcqRel) + 1;
        pending as usize >= self.config.flush_threshold
    }

    /// Whether enough wall-clock time has passed since the last flush that
    /// a timer-driven sync is due, independent of the pending count.
    pub fn interval_elapsed(&self) -> bool {
        self.last_flush.lock().elapsed() >= self.config.flush_interval
    }

    /// Record that a flush (fsync) has just happened, resetting both the
    /// pending counter and the timer.
    pub fn record_flush(&self) {
        self.pending.store(0, Ordering::Release);
        *self.last_flush.lock() = Instant::now();
    }

    /// Current count of writes appended since the last flush.
    pub fn pending_writes(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    /// Sleep duration a background flush loop should use between checks.
    pub fn poll_interval(&self) -> Duration {
        self.config.flush_interval / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_trips_after_configured_count() {
        let mut cfg = WalConfig::default();
        cfg.flush_threshold = 3;
        let policy = GroupCommitPolicy::new(cfg);
        assert!(!policy.record_write());
        assert!(!policy.record_write());
        assert!(policy.record_write());
        assert_eq!(policy.pending_writes(), 3);
        policy.record_flush();
        assert_eq!(policy.pending_writes(), 0);
    }
}
