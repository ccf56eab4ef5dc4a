//! Idempotent purge of soft-deleted entities whose retention period has
//! elapsed.
//!
//! A soft delete only ever flips a `deleted` flag and writes a
//! `softdel:<targetKey>` marker (see `progressdb-executor`'s delete
//! handlers); nothing is actually removed until the sweep decides the
//! retention period has passed. Each purge and its marker removal land in
//! one batch per store, so a crash mid-sweep just leaves the marker for
//! the next sweep to retry — no entity is ever left half-purged without
//! still being discoverable via its marker.

use progressdb_core::key::{
    gen_all_message_versions_prefix, gen_all_thread_messages_prefix, gen_rel_thread_user_prefix, gen_rel_user_thread_key,
    gen_softdel_key, gen_thread_indexes_key, parse_key, parse_key_timestamp, KeyKind, SOFTDEL_PREFIX,
};
use progressdb_storage::{Batch, Stores, WriteOpt};
use tracing::{info, warn};

use crate::error::{RetentionError, Result};

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Soft-delete markers inspected this pass.
    pub markers_seen: usize,
    /// Threads fully purged this pass.
    pub threads_purged: usize,
    /// Messages fully purged this pass.
    pub messages_purged: usize,
    /// Markers skipped because their retention period hasn't elapsed yet.
    pub not_yet_due: usize,
}

/// Run one sweep pass: purge every `softdel:*` marker older than
/// `retention_period_ns` as of `now_ns`.
pub fn sweep(stores: &Stores, retention_period_ns: i64, now_ns: i64) -> Result<SweepReport> {
    let threshold_ns = now_ns.saturating_sub(retention_period_ns);
    let markers = stores.indexdb.iter_prefix(SOFTDEL_PREFIX.as_bytes(), false)?;
    let mut report = SweepReport { markers_seen: markers.len(), ..Default::default() };

    for (raw_key, raw_value) in markers {
        let marker_key = String::from_utf8(raw_key).map_err(|e| RetentionError::Corrupt(format!("non-utf8 softdel key: {e}")))?;
        let deleted_ts = parse_marker_ts(&marker_key, &raw_value)?;
        if deleted_ts > threshold_ns {
            report.not_yet_due += 1;
            continue;
        }

        let target_key = marker_key
            .strip_prefix(SOFTDEL_PREFIX)
            .expect("iter_prefix(SOFTDEL_PREFIX) guarantees this prefix");
        match parse_key(target_key)?.kind {
            KeyKind::Thread | KeyKind::ThreadProv => {
                purge_thread(stores, target_key, &marker_key)?;
                report.threads_purged += 1;
            }
            KeyKind::Message | KeyKind::MessageProv => {
                purge_message(stores, target_key, &marker_key)?;
                report.messages_purged += 1;
            }
            other => {
                warn!(target = %target_key, kind = %other, "softdel marker names an unpurgeable key kind, skipping");
            }
        }
    }

    if report.threads_purged > 0 || report.messages_purged > 0 {
        info!(
            threads_purged = report.threads_purged,
            messages_purged = report.messages_purged,
            markers_seen = report.markers_seen,
            "retention sweep purged expired soft deletes"
        );
    }
    Ok(report)
}

fn parse_marker_ts(marker_key: &str, raw_value: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = raw_value
        .try_into()
        .map_err(|_| RetentionError::Corrupt(format!("softdel marker {marker_key} has a value of {} bytes, expected 8", raw_value.len())))?;
    Ok(i64::from_le_bytes(bytes))
}

/// Purge a soft-deleted thread: its own `storedb` entry, every message
/// belonging to it (`storedb` bodies and `indexdb` version history), its
/// counters, its owner relationship records, and the marker itself.
///
/// The owner relationship is recovered from `indexdb`'s `rel:t:*:u:*`
/// record rather than by reading the `Thread` back from `storedb`, so a
/// sweep retried after a crash that already removed the `storedb` entry
/// still finds everything it needs to finish.
fn purge_thread(stores: &Stores, thread_key: &str, marker_key: &str) -> Result<()> {
    let thread_ts = parse_key_timestamp(thread_key)?;

    let mut store_batch = Batch::new();
    store_batch.delete(thread_key.as_bytes().to_vec());
    let message_prefix = gen_all_thread_messages_prefix(thread_key)?;
    let messages = stores.storedb.iter_prefix(message_prefix.as_bytes(), false)?;
    for (message_key, _) in &messages {
        store_batch.delete(message_key.clone());
    }
    stores.storedb.batch(&store_batch, WriteOpt::default())?;

    let mut index_batch = Batch::new();
    index_batch.delete(gen_thread_indexes_key(thread_key).into_bytes());
    for (message_key, _) in &messages {
        let message_key = String::from_utf8_lossy(message_key);
        let version_prefix = gen_all_message_versions_prefix(&message_key);
        for (version_key, _) in stores.indexdb.iter_prefix(version_prefix.as_bytes(), false)? {
            index_batch.delete(version_key);
        }
        index_batch.delete(gen_softdel_key(&message_key).into_bytes());
    }
    let owner_prefix = gen_rel_thread_user_prefix(thread_ts);
    for (rel_key, _) in stores.indexdb.iter_prefix(owner_prefix.as_bytes(), false)? {
        let rel_key_str = String::from_utf8_lossy(&rel_key);
        if let Some(user_id) = rel_key_str.strip_prefix(&owner_prefix) {
            index_batch.delete(gen_rel_user_thread_key(user_id, thread_ts).into_bytes());
        }
        index_batch.delete(rel_key);
    }
    index_batch.delete(marker_key.as_bytes().to_vec());
    stores.indexdb.batch(&index_batch, WriteOpt::default())?;
    Ok(())
}

/// Purge a soft-deleted message: its `storedb` entry, every version in
/// `indexdb`, and the marker itself.
fn purge_message(stores: &Stores, message_key: &str, marker_key: &str) -> Result<()> {
    stores.storedb.delete(message_key.as_bytes(), WriteOpt::default())?;

    let mut index_batch = Batch::new();
    let version_prefix = gen_all_message_versions_prefix(message_key);
    for (version_key, _) in stores.indexdb.iter_prefix(version_prefix.as_bytes(), false)? {
        index_batch.delete(version_key);
    }
    index_batch.delete(marker_key.as_bytes().to_vec());
    stores.indexdb.batch(&index_batch, WriteOpt::default())?;
    Ok(())
}
