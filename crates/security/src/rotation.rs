//! Thread-level key rotation and wrapped-key-only rewrap.
//!
//! Rotation re-encrypts every message and message version under a thread
//! with a new DEK. Each original entry is backed up under
//! `backup:migrate:<origKey>` before being overwritten, so a crash
//! mid-rotation leaves recoverable state: the backup prefix still holds
//! the pre-rotation ciphertext for anything rotation didn't finish.

use progressdb_core::key::{gen_all_message_versions_prefix, gen_all_thread_messages_prefix};
use progressdb_core::{Message, MessageVersion, Thread, ThreadKms};
use progressdb_storage::{LsmStore, WriteOpt};
use progressdb_wire::Kms;

use crate::config::EncryptionPolicy;
use crate::envelope::{decrypt_body, encrypt_body};
use crate::error::{Result, SecurityError};

/// Prefix under which pre-rotation ciphertext is preserved.
pub const BACKUP_MIGRATE_PREFIX: &str = "backup:migrate:";

fn backup_key(orig_key: &str) -> String {
    format!("{BACKUP_MIGRATE_PREFIX}{orig_key}")
}

/// Re-encrypt every message and version belonging to `thread_key` from its
/// current DEK to `new_key_id`, then update the thread record to point at
/// the new key. `new_key_id` must already exist at the KMS (created via
/// `CreateDEKForThread` or an equivalent admin action) before calling
/// this.
pub async fn rotate_thread_dek(
    kms: &dyn Kms,
    storedb: &LsmStore,
    indexdb: &LsmStore,
    policy: &EncryptionPolicy,
    thread_key: &str,
    new_key_id: &str,
) -> Result<()> {
    let raw = storedb
        .get(thread_key.as_bytes())?
        .ok_or_else(|| SecurityError::NoThreadKey(thread_key.to_string()))?;
    let mut thread: Thread = serde_json::from_slice(&raw)?;
    let old_kms = thread.kms.clone().ok_or_else(|| SecurityError::NoThreadKey(thread_key.to_string()))?;

    let prefix = gen_all_thread_messages_prefix(thread_key)
        .map_err(|e| SecurityError::MalformedEnvelope(e.to_string()))?;
    for (key, raw_message) in storedb.iter_prefix(prefix.as_bytes(), false)? {
        let key_str = String::from_utf8_lossy(&key).into_owned();
        let mut message: Message = serde_json::from_slice(&raw_message)?;

        storedb.set(backup_key(&key_str).as_bytes(), &raw_message, WriteOpt::synced())?;

        let plaintext = decrypt_body(kms, policy, &old_kms.key_id, message.key.as_bytes(), message.body).await?;
        message.body = encrypt_body(kms, policy, new_key_id, message.key.as_bytes(), plaintext).await?;
        storedb.set(key_str.as_bytes(), &serde_json::to_vec(&message)?, WriteOpt::synced())?;

        let version_prefix = gen_all_message_versions_prefix(&key_str);
        for (vkey, raw_version) in indexdb.iter_prefix(version_prefix.as_bytes(), false)? {
            let vkey_str = String::from_utf8_lossy(&vkey).into_owned();
            let mut version: MessageVersion = serde_json::from_slice(&raw_version)?;

            indexdb.set(backup_key(&vkey_str).as_bytes(), &raw_version, WriteOpt::synced())?;

            let plaintext =
                decrypt_body(kms, policy, &old_kms.key_id, version.message.key.as_bytes(), version.message.body)
                    .await?;
            version.message.body = encrypt_body(kms, policy, new_key_id, version.message.key.as_bytes(), plaintext).await?;
            indexdb.set(vkey_str.as_bytes(), &serde_json::to_vec(&version)?, WriteOpt::synced())?;
        }
    }

    thread.kms = Some(ThreadKms {
        key_id: new_key_id.to_string(),
        wrapped_dek: old_kms.wrapped_dek,
        kek_id: old_kms.kek_id,
        kek_version: old_kms.kek_version,
    });
    storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread)?, WriteOpt::synced())?;
    tracing::info!(thread_key, new_key_id, "rotated thread DEK");
    Ok(())
}

/// Rewrap a thread's DEK under a new KEK without touching any message
/// ciphertext.
pub async fn rewrap_thread_dek(kms: &dyn Kms, storedb: &LsmStore, thread_key: &str, new_kek_hex: &str) -> Result<()> {
    let raw = storedb
        .get(thread_key.as_bytes())?
        .ok_or_else(|| SecurityError::NoThreadKey(thread_key.to_string()))?;
    let mut thread: Thread = serde_json::from_slice(&raw)?;
    let old_kms = thread.kms.clone().ok_or_else(|| SecurityError::NoThreadKey(thread_key.to_string()))?;

    let rewrapped = kms.rewrap_dek_for_thread(&old_kms.key_id, new_kek_hex).await?;
    thread.kms = Some(ThreadKms {
        key_id: old_kms.key_id,
        wrapped_dek: rewrapped.wrapped_dek,
        kek_id: rewrapped.new_kek_id,
        kek_version: rewrapped.new_kek_version,
    });
    storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread)?, WriteOpt::synced())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use progressdb_core::key::gen_message_key;
    use progressdb_durability::WalConfig;
    use progressdb_wire::FakeKms;
    use tempfile::tempdir;

    async fn seeded(kms: &FakeKms) -> (tempfile::TempDir, LsmStore, LsmStore, String) {
        let dir = tempdir().unwrap();
        let storedb = LsmStore::open(dir.path().join("store"), WalConfig::disabled()).unwrap();
        let indexdb = LsmStore::open(dir.path().join("index"), WalConfig::disabled()).unwrap();

        let thread_key = "t:0000000000000000100".to_string();
        let mut thread = Thread::new(thread_key.clone(), "author".into(), "t".into(), "t".into(), 100);
        let dek = kms.create_dek_for_thread(&thread_key).await.unwrap();
        thread.kms = Some(ThreadKms {
            key_id: dek.key_id,
            wrapped_dek: dek.wrapped_dek,
            kek_id: dek.kek_id,
            kek_version: dek.kek_version,
        });
        let key_id = thread.kms.as_ref().unwrap().key_id.clone();
        storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread).unwrap(), WriteOpt::default()).unwrap();

        let policy = EncryptionPolicy::WholeBody;
        let message_key = gen_message_key(&thread_key, 1).unwrap();
        let mut message = Message {
            key: message_key.clone(),
            thread: thread_key.clone(),
            author: "author".into(),
            body: serde_json::json!({"text": "original"}),
            reactions: Default::default(),
            ts: 101,
            created_ts: 101,
            updated_ts: 101,
            deleted: false,
        };
        message.body = encrypt_body(kms, &policy, &key_id, message.key.as_bytes(), message.body).await.unwrap();
        storedb.set(message_key.as_bytes(), &serde_json::to_vec(&message).unwrap(), WriteOpt::default()).unwrap();

        (dir, storedb, indexdb, thread_key)
    }

    #[tokio::test]
    async fn rotation_reencrypts_messages_and_leaves_a_recoverable_backup() {
        let kms = FakeKms::new();
        let (_dir, storedb, indexdb, thread_key) = seeded(&kms).await;
        let policy = EncryptionPolicy::WholeBody;

        let new_dek = kms.create_dek_for_thread(&thread_key).await.unwrap();
        rotate_thread_dek(&kms, &storedb, &indexdb, &policy, &thread_key, &new_dek.key_id).await.unwrap();

        let message_key = gen_message_key(&thread_key, 1).unwrap();
        let raw = storedb.get(message_key.as_bytes()).unwrap().unwrap();
        let message: Message = serde_json::from_slice(&raw).unwrap();
        let plaintext = decrypt_body(&kms, &policy, &new_dek.key_id, message.key.as_bytes(), message.body)
            .await
            .unwrap();
        assert_eq!(plaintext, serde_json::json!({"text": "original"}));

        let backup_raw = storedb.get(backup_key(&message_key).as_bytes()).unwrap();
        assert!(backup_raw.is_some());
    }

    #[tokio::test]
    async fn rewrap_changes_key_identity_but_not_message_ciphertext() {
        let kms = FakeKms::new();
        let (_dir, storedb, _indexdb, thread_key) = seeded(&kms).await;

        let raw_before = storedb.get(thread_key.as_bytes()).unwrap().unwrap();
        let before: Thread = serde_json::from_slice(&raw_before).unwrap();
        let message_key = gen_message_key(&thread_key, 1).unwrap();
        let message_before = storedb.get(message_key.as_bytes()).unwrap().unwrap();

        rewrap_thread_dek(&kms, &storedb, &thread_key, "deadbeef").await.unwrap();

        let raw_after = storedb.get(thread_key.as_bytes()).unwrap().unwrap();
        let after: Thread = serde_json::from_slice(&raw_after).unwrap();
        assert_eq!(after.kms.as_ref().unwrap().key_id, before.kms.as_ref().unwrap().key_id);
        assert_ne!(after.kms.as_ref().unwrap().kek_id, before.kms.as_ref().unwrap().kek_id);

        let message_after = storedb.get(message_key.as_bytes()).unwrap().unwrap();
        assert_eq!(message_before, message_after);
    }
}
