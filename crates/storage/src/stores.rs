//! The two named stores the rest of the system talks about: `storedb`
//! (threads, current message bodies) and `indexdb` (message versions,
//! relationship markers, soft-delete markers, per-thread counters).

use std::path::Path;

use progressdb_durability::WalConfig;

use crate::error::Result;
use crate::store::LsmStore;

/// Filesystem layout and durability knobs for opening both stores.
#[derive(Debug, Clone)]
pub struct StoreDbPaths {
    /// Directory backing `storedb`.
    pub store_dir: std::path::PathBuf,
    /// Directory backing `indexdb`.
    pub index_dir: std::path::PathBuf,
    /// Whether either store's WAL should be disabled for throughput
    /// (callers must then periodically call `force_sync_all`).
    pub disable_wal: bool,
}

/// The pair of stores every higher layer depends on.
#[derive(Clone)]
pub struct Stores {
    /// Primary store: thread metadata, current message bodies.
    pub storedb: LsmStore,
    /// Index store: message versions, relationship markers, soft-delete
    /// markers, per-thread counters.
    pub indexdb: LsmStore,
}

impl Stores {
    /// Open both stores at the configured paths.
    pub fn open(paths: &StoreDbPaths) -> Result<Self> {
        let config = if paths.disable_wal {
            WalConfig::disabled()
        } else {
            WalConfig::default()
        };
        let storedb = LsmStore::open(&paths.store_dir, config.clone())?;
        let indexdb = LsmStore::open(&paths.index_dir, config)?;
        Ok(Self { storedb, indexdb })
    }

    /// `true` only once both underlying stores report ready; backs
    /// `/readyz`.
    pub fn ready(&self) -> bool {
        self.storedb.ready() && self.indexdb.ready()
    }

    /// Force-sync both stores' WALs, used by the periodic group-commit
    /// flush loop when the WAL is disabled for per-write syncing.
    pub fn force_sync_all(&self) -> Result<()> {
        self.storedb.force_sync()?;
        self.indexdb.force_sync()?;
        Ok(())
    }

    /// Close both stores in turn.
    pub fn close(&self) -> Result<()> {
        self.storedb.close()?;
        self.indexdb.close()?;
        Ok(())
    }
}

/// Convenience constructor over two plain paths, with default durability
/// settings (WAL on, group-commit mode).
pub fn open_default(store_dir: impl AsRef<Path>, index_dir: impl AsRef<Path>) -> Result<Stores> {
    Stores::open(&StoreDbPaths {
        store_dir: store_dir.as_ref().to_path_buf(),
        index_dir: index_dir.as_ref().to_path_buf(),
        disable_wal: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn opens_both_stores_and_reports_ready() {
        let dir = tempdir().unwrap();
        let stores = open_default(dir.path().join("store"), dir.path().join("index")).unwrap();
        assert!(stores.ready());
        stores.close().unwrap();
        assert!(!stores.ready());
    }
}
