//! In-process [`Kms`] double for tests that don't want a real KMS child
//! process on a socket. Keeps DEKs in memory, "encrypts" with a reversible
//! XOR keystream so round-trips are verifiable without pulling in a real
//! AEAD crate here (the actual cipher lives on the far side of the wire
//! in production).

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::WireError;
use crate::protocol::{CreateDekResult, RewrapResult};
use crate::trait_::Kms;

struct DekEntry {
    dek: Vec<u8>,
    kek_id: String,
    kek_version: u32,
}

/// A fake KMS, backed by an in-memory map instead of a socket.
pub struct FakeKms {
    deks: DashMap<String, DekEntry>,
    next_id: AtomicU32,
    healthy: std::sync::atomic::AtomicBool,
}

impl FakeKms {
    /// A fresh fake KMS with no provisioned DEKs.
    pub fn new() -> Self {
        Self { deks: DashMap::new(), next_id: AtomicU32::new(1), healthy: std::sync::atomic::AtomicBool::new(true) }
    }

    /// Make subsequent [`Kms::health`] calls fail, simulating the KMS
    /// process being down.
    pub fn set_unhealthy(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    fn keystream(dek: &[u8], aad: &[u8], len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        let mut i = 0usize;
        while out.len() < len {
            out.push(dek[i % dek.len()] ^ aad.first().copied().unwrap_or(0) ^ (i as u8));
            i += 1;
        }
        out
    }
}

impl Default for FakeKms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Kms for FakeKms {
    async fn health(&self) -> Result<(), WireError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(WireError::Kms { code: "unavailable".into(), message: "fake KMS marked unhealthy".into() })
        }
    }

    async fn create_dek_for_thread(&self, _thread_id: &str) -> Result<CreateDekResult, WireError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let key_id = format!("fake-dek-{n}");
        let dek: Vec<u8> = (0..32).map(|i| (n as u8).wrapping_add(i)).collect();
        let kek_id = "fake-kek-0".to_string();
        let kek_version = 1;
        self.deks.insert(key_id.clone(), DekEntry { dek: dek.clone(), kek_id: kek_id.clone(), kek_version });
        Ok(CreateDekResult {
            key_id,
            wrapped_dek: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &dek),
            kek_id,
            kek_version,
        })
    }

    async fn encrypt_with_dek(&self, key_id: &str, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, WireError> {
        let entry = self
            .deks
            .get(key_id)
            .ok_or_else(|| WireError::Kms { code: "unknown_key_id".into(), message: key_id.to_string() })?;
        let stream = Self::keystream(&entry.dek, aad, plaintext.len());
        Ok(plaintext.iter().zip(stream).map(|(p, k)| p ^ k).collect())
    }

    async fn decrypt_with_dek(&self, key_id: &str, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, WireError> {
        // XOR is its own inverse.
        self.encrypt_with_dek(key_id, ciphertext, aad).await
    }

    async fn rewrap_dek_for_thread(&self, key_id: &str, new_kek_hex: &str) -> Result<RewrapResult, WireError> {
        let mut entry = self
            .deks
            .get_mut(key_id)
            .ok_or_else(|| WireError::Kms { code: "unknown_key_id".into(), message: key_id.to_string() })?;
        entry.kek_id = format!("fake-kek-{new_kek_hex}");
        entry.kek_version += 1;
        Ok(RewrapResult {
            new_kek_id: entry.kek_id.clone(),
            new_kek_version: entry.kek_version,
            wrapped_dek: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &entry.dek),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encrypt_then_decrypt_recovers_the_plaintext() {
        let kms = FakeKms::new();
        let dek = kms.create_dek_for_thread("thread-1").await.unwrap();
        let aad = b"thread-1";
        let ciphertext = kms.encrypt_with_dek(&dek.key_id, b"hello world", aad).await.unwrap();
        assert_ne!(ciphertext, b"hello world");
        let plaintext = kms.decrypt_with_dek(&dek.key_id, &ciphertext, aad).await.unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[tokio::test]
    async fn unknown_key_id_is_rejected() {
        let kms = FakeKms::new();
        let err = kms.encrypt_with_dek("nope", b"x", b"").await.unwrap_err();
        assert!(matches!(err, WireError::Kms { .. }));
    }

    #[tokio::test]
    async fn unhealthy_kms_fails_health_checks() {
        let kms = FakeKms::new();
        kms.set_unhealthy();
        assert!(kms.health().await.is_err());
    }

    #[tokio::test]
    async fn rewrap_changes_the_kek_identity_but_not_ciphertext_compatibility() {
        let kms = FakeKms::new();
        let dek = kms.create_dek_for_thread("thread-1").await.unwrap();
        let aad = b"thread-1";
        let ciphertext = kms.encrypt_with_dek(&dek.key_id, b"payload", aad).await.unwrap();
        let rewrapped = kms.rewrap_dek_for_thread(&dek.key_id, "deadbeef").await.unwrap();
        assert_ne!(rewrapped.new_kek_id, dek.kek_id);
        let plaintext = kms.decrypt_with_dek(&dek.key_id, &ciphertext, aad).await.unwrap();
        assert_eq!(plaintext, b"payload");
    }
}
