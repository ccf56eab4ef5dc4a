//! Durability configuration shared by every store the engine opens.

use std::time::Duration;

/// How aggressively a store fsyncs its write-ahead log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// Every write is followed by an fsync before the caller is told it
    /// succeeded.
    Sync,
    /// Writes are appended to the WAL but not fsynced individually; a
    /// background group-commit flush periodically syncs.
    GroupCommit,
    /// The WAL is disabled entirely. Only appropriate for indexes that can
    /// be rebuilt, or tests.
    Disabled,
}

/// Tunables for a store's WAL.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Durability mode for this store.
    pub mode: DurabilityMode,
    /// Under `GroupCommit`, force a sync once this many writes have
    /// accumulated unsynced.
    pub flush_threshold: usize,
    /// Under `GroupCommit`, force a sync at least this often even if the
    /// threshold hasn't been reached.
    pub flush_interval: Duration,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            mode: DurabilityMode::GroupCommit,
            flush_threshold: 256,
            flush_interval: Duration::from_millis(200),
        }
    }
}

impl WalConfig {
    /// A config with the WAL disabled outright (e.g. for index stores that
    /// can be rebuilt from the primary store).
    pub fn disabled() -> Self {
        Self {
            mode: DurabilityMode::Disabled,
            ..Default::default()
        }
    }

    /// A config that fsyncs every write.
    pub fn sync() -> Self {
        Self {
            mode: DurabilityMode::Sync,
            ..Default::default()
        }
    }

    /// Whether writes in this config are ever appended to a WAL file.
    pub fn wal_enabled(&self) -> bool {
        !matches!(self.mode, DurabilityMode::Disabled)
    }
}
