//! First-write DEK provisioning: a thread gets a DEK lazily, the first
//! time an encrypted write touches it.

use progressdb_core::{Thread, ThreadKms};
use progressdb_storage::{LsmStore, WriteOpt};
use progressdb_wire::Kms;

use crate::error::{Result, SecurityError};

/// Load the thread at `thread_key`, provisioning a DEK via `kms` if it
/// doesn't have one yet, and persist the updated record. Returns the
/// thread's (possibly just-created) KMS bookkeeping.
pub async fn ensure_thread_dek(kms: &dyn Kms, storedb: &LsmStore, thread_key: &str) -> Result<ThreadKms> {
    let raw = storedb
        .get(thread_key.as_bytes())?
        .ok_or_else(|| SecurityError::NoThreadKey(thread_key.to_string()))?;
    let mut thread: Thread = serde_json::from_slice(&raw)?;

    if let Some(existing) = &thread.kms {
        return Ok(existing.clone());
    }

    let created = kms.create_dek_for_thread(thread_key).await?;
    let thread_kms = ThreadKms {
        key_id: created.key_id,
        wrapped_dek: created.wrapped_dek,
        kek_id: created.kek_id,
        kek_version: created.kek_version,
    };
    thread.kms = Some(thread_kms.clone());
    storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread)?, WriteOpt::default())?;
    tracing::info!(thread_key, key_id = %thread_kms.key_id, "provisioned thread DEK");
    Ok(thread_kms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use progressdb_durability::WalConfig;
    use progressdb_wire::FakeKms;
    use tempfile::tempdir;

    fn thread_fixture(key: &str) -> Vec<u8> {
        let thread = Thread::new(key.to_string(), "author-1".into(), "title".into(), "slug".into(), 100);
        serde_json::to_vec(&thread).unwrap()
    }

    #[tokio::test]
    async fn provisions_a_dek_on_first_call_and_persists_it() {
        let dir = tempdir().unwrap();
        let store = LsmStore::open(dir.path(), WalConfig::disabled()).unwrap();
        store.set(b"t:0000000000000000100", &thread_fixture("t:0000000000000000100"), WriteOpt::default()).unwrap();

        let kms = FakeKms::new();
        let thread_kms = ensure_thread_dek(&kms, &store, "t:0000000000000000100").await.unwrap();
        assert!(!thread_kms.key_id.is_empty());

        // Second call returns the same key_id without calling the KMS again.
        let again = ensure_thread_dek(&kms, &store, "t:0000000000000000100").await.unwrap();
        assert_eq!(again.key_id, thread_kms.key_id);
    }

    #[tokio::test]
    async fn missing_thread_is_an_error() {
        let dir = tempdir().unwrap();
        let store = LsmStore::open(dir.path(), WalConfig::disabled()).unwrap();
        let kms = FakeKms::new();
        assert!(ensure_thread_dek(&kms, &store, "t:0000000000000000999").await.is_err());
    }
}
