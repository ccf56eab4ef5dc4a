//! `LsmStore`: an ordered, durable, atomically-batched key-value engine.
//!
//! The in-memory structure is a `BTreeMap<Vec<u8>, Vec<u8>>` guarded by a
//! `parking_lot::RwLock`, exactly the shape the rest of this workspace
//! uses for its unified store — byte-ordered keys give range scans for
//! free. Durability is a WAL of length-prefixed, checksummed batch
//! records (see `progressdb_durability::record`), replayed in full on
//! open. There is no background compaction: entries are never rewritten
//! out of the WAL, only replayed once at startup, which is sufficient for
//! the write volumes this engine targets and keeps the recovery path to a
//! single linear scan.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use progressdb_durability::{read_record, write_record, GroupCommitPolicy, WalConfig};

use crate::batch::Batch;
use crate::error::{Result, StorageError};

/// Per-call write durability override.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOpt {
    /// Force an fsync after this write regardless of the store's group
    /// commit policy. Meaningless (and ignored) when the WAL is disabled.
    pub sync: bool,
}

impl WriteOpt {
    /// A write that should be fsynced before returning.
    pub fn synced() -> Self {
        Self { sync: true }
    }
}

struct Inner {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    wal_file: Mutex<Option<BufWriter<File>>>,
    wal_path: PathBuf,
    config: WalConfig,
    group_commit: GroupCommitPolicy,
    ready: AtomicBool,
}

/// A single ordered key-value store, opened over a directory on disk.
///
/// Two independent instances of this type back the primary (`storedb`)
/// and index (`indexdb`) stores; `LsmStore` itself has no notion of
/// which role it plays.
#[derive(Clone)]
pub struct LsmStore {
    inner: Arc<Inner>,
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io { path: path.to_path_buf(), source }
}

impl LsmStore {
    /// Open (or create) a store rooted at `path`, replaying its WAL if one
    /// exists.
    pub fn open(path: impl AsRef<Path>, config: WalConfig) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| io_err(path, e))?;
        let wal_path = path.join("wal.log");

        let mut data = BTreeMap::new();
        if config.wal_enabled() && wal_path.exists() {
            replay(&wal_path, &mut data)?;
        }

        let wal_file = if config.wal_enabled() {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&wal_path)
                .map_err(|e| io_err(&wal_path, e))?;
            Some(BufWriter::new(f))
        } else {
            None
        };

        tracing::info!(path = %path.display(), entries = data.len(), "store opened");

        Ok(Self {
            inner: Arc::new(Inner {
                data: RwLock::new(data),
                wal_file: Mutex::new(wal_file),
                wal_path,
                group_commit: GroupCommitPolicy::new(config.clone()),
                config,
                ready: AtomicBool::new(true),
            }),
        })
    }

    /// Whether this store is open and accepting operations.
    pub fn ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Stop accepting operations and flush the WAL.
    pub fn close(&self) -> Result<()> {
        self.inner.ready.store(false, Ordering::Release);
        self.force_sync()
    }

    /// Point lookup.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_ready()?;
        Ok(self.inner.data.read().get(key).cloned())
    }

    /// Insert or overwrite a single key.
    pub fn set(&self, key: &[u8], value: &[u8], opt: WriteOpt) -> Result<()> {
        let mut batch = Batch::new();
        batch.put(key.to_vec(), value.to_vec());
        self.batch(&batch, opt)
    }

    /// Remove a single key.
    pub fn delete(&self, key: &[u8], opt: WriteOpt) -> Result<()> {
        let mut batch = Batch::new();
        batch.delete(key.to_vec());
        self.batch(&batch, opt)
    }

    /// Apply every op in `batch` atomically: all land in the in-memory map
    /// under one write-lock critical section, and (if the WAL is enabled)
    /// are durably logged as a single record before that lock is taken.
    pub fn batch(&self, batch: &Batch, opt: WriteOpt) -> Result<()> {
        self.check_ready()?;
        if batch.is_empty() {
            return Ok(());
        }

        if self.inner.config.wal_enabled() {
            let payload = batch.encode();
            let mut guard = self.inner.wal_file.lock();
            let file = guard.as_mut().expect("wal_enabled implies wal_file is Some");
            write_record(file, &payload)?;
            file.flush().map_err(|e| io_err(&self.inner.wal_path, e))?;

            let should_flush_threshold = self.inner.group_commit.record_write();
            let want_sync = opt.sync
                || matches!(self.inner.config.mode, progressdb_durability::DurabilityMode::Sync)
                || should_flush_threshold
                || self.inner.group_commit.interval_elapsed();
            if want_sync {
                file.get_ref().sync_all().map_err(|e| io_err(&self.inner.wal_path, e))?;
                self.inner.group_commit.record_flush();
            }
        }

        let mut data = self.inner.data.write();
        for op in batch.ops() {
            match op {
                crate::batch::BatchOp::Put(k, v) => {
                    data.insert(k.clone(), v.clone());
                }
                crate::batch::BatchOp::Delete(k) => {
                    data.remove(k);
                }
            }
        }
        Ok(())
    }

    /// Force an fsync of the WAL now, independent of the group-commit
    /// threshold. This is the "group commit" hook a periodic background
    /// task calls when writes are accumulating faster than the threshold
    /// alone would flush them.
    pub fn force_sync(&self) -> Result<()> {
        if !self.inner.config.wal_enabled() {
            return Ok(());
        }
        let mut guard = self.inner.wal_file.lock();
        if let Some(file) = guard.as_mut() {
            file.flush().map_err(|e| io_err(&self.inner.wal_path, e))?;
            file.get_ref().sync_all().map_err(|e| io_err(&self.inner.wal_path, e))?;
        }
        self.inner.group_commit.record_flush();
        Ok(())
    }

    /// Number of writes appended since the last fsync; exposed so a
    /// background flush loop can log/monitor it.
    pub fn pending_writes(&self) -> u64 {
        self.inner.group_commit.pending_writes()
    }

    /// How often a background flush loop should poll this store's
    /// group-commit policy.
    pub fn flush_poll_interval(&self) -> std::time::Duration {
        self.inner.group_commit.poll_interval()
    }

    /// Snapshot every key/value pair whose key lies in `[lower, upper)`,
    /// in ascending order if `reverse` is false, descending otherwise.
    ///
    /// This clones matching entries out from under the lock rather than
    /// returning a live iterator, trading a bit of memory for a simple,
    /// lock-free-to-the-caller pagination path.
    pub fn iter_range(
        &self,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
        reverse: bool,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_ready()?;
        let data = self.inner.data.read();
        let range = data.range((lower, upper));
        let mut out: Vec<(Vec<u8>, Vec<u8>)> =
            range.map(|(k, v)| (k.clone(), v.clone())).collect();
        if reverse {
            out.reverse();
        }
        Ok(out)
    }

    /// Snapshot every key/value pair whose key starts with `prefix`.
    pub fn iter_prefix(&self, prefix: &[u8], reverse: bool) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let lower = Bound::Included(prefix.to_vec());
        let upper = upper_bound_for_prefix(prefix);
        self.iter_range(lower, upper, reverse)
    }

    fn check_ready(&self) -> Result<()> {
        if self.inner.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StorageError::Closed)
        }
    }
}

/// Compute the exclusive upper bound that covers every key starting with
/// `prefix`: increment the last byte, carrying as needed. `None` (i.e. an
/// unbounded range) only if `prefix` is all `0xFF` bytes or empty.
pub fn upper_bound_for_prefix(prefix: &[u8]) -> Bound<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(&last) = upper.last() {
        if last == 0xFF {
            upper.pop();
        } else {
            let idx = upper.len() - 1;
            upper[idx] += 1;
            return Bound::Excluded(upper);
        }
    }
    Bound::Unbounded
}

fn replay(wal_path: &Path, data: &mut BTreeMap<Vec<u8>, Vec<u8>>) -> Result<()> {
    let file = File::open(wal_path).map_err(|e| io_err(wal_path, e))?;
    let mut reader = BufReader::new(file);
    loop {
        let payload = match read_record(&mut reader) {
            Ok(p) => p,
            Err(progressdb_durability::RecordError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let batch = Batch::decode(&payload).map_err(|e| io_err(wal_path, e))?;
        for op in batch.ops() {
            match op {
                crate::batch::BatchOp::Put(k, v) => {
                    data.insert(k.clone(), v.clone());
                }
                crate::batch::BatchOp::Delete(k) => {
                    data.remove(k);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_get_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let store = LsmStore::open(dir.path(), WalConfig::default()).unwrap();
        store.set(b"a", b"1", WriteOpt::default()).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a", WriteOpt::default()).unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn batch_is_all_or_nothing_visible() {
        let dir = tempdir().unwrap();
        let store = LsmStore::open(dir.path(), WalConfig::default()).unwrap();
        let mut batch = Batch::new();
        batch.put(b"x".to_vec(), b"1".to_vec());
        batch.put(b"y".to_vec(), b"2".to_vec());
        store.batch(&batch, WriteOpt::default()).unwrap();
        assert_eq!(store.get(b"x").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"y").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn wal_replay_recovers_state_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = LsmStore::open(dir.path(), WalConfig::sync()).unwrap();
            store.set(b"k", b"v", WriteOpt::default()).unwrap();
        }
        let reopened = LsmStore::open(dir.path(), WalConfig::sync()).unwrap();
        assert_eq!(reopened.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn prefix_iteration_is_ordered() {
        let dir = tempdir().unwrap();
        let store = LsmStore::open(dir.path(), WalConfig::default()).unwrap();
        for i in 0..5u32 {
            store.set(format!("m:{i}").as_bytes(), b"v", WriteOpt::default()).unwrap();
        }
        store.set(b"z:other", b"v", WriteOpt::default()).unwrap();
        let items = store.iter_prefix(b"m:", false).unwrap();
        assert_eq!(items.len(), 5);
        assert!(items.windows(2).all(|w| w[0].0 < w[1].0));

        let rev = store.iter_prefix(b"m:", true).unwrap();
        assert_eq!(rev.first().unwrap().0, items.last().unwrap().0);
    }

    #[test]
    fn closed_store_rejects_operations() {
        let dir = tempdir().unwrap();
        let store = LsmStore::open(dir.path(), WalConfig::default()).unwrap();
        store.close().unwrap();
        assert!(store.get(b"a").is_err());
    }
}
