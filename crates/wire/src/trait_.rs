//! The operations ProgressDB needs from a KMS, independent of transport —
//! implemented by [`crate::client::KmsClient`] over the real socket and by
//! [`crate::fake::FakeKms`] in-process for tests.

use async_trait::async_trait;

use crate::error::WireError;
use crate::protocol::{CreateDekResult, RewrapResult};

/// KMS operations consumed by the encryption envelope.
#[async_trait]
pub trait Kms: Send + Sync {
    /// Liveness check; used by `/readyz`.
    async fn health(&self) -> Result<(), WireError>;

    /// Provision a brand-new DEK for a thread that doesn't have one yet.
    async fn create_dek_for_thread(&self, thread_id: &str) -> Result<CreateDekResult, WireError>;

    /// Encrypt `plaintext` under the DEK named by `key_id`, authenticating
    /// `aad` alongside it.
    async fn encrypt_with_dek(&self, key_id: &str, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, WireError>;

    /// Decrypt `ciphertext` with the DEK named by `key_id`, verifying
    /// `aad`.
    async fn decrypt_with_dek(&self, key_id: &str, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, WireError>;

    /// Rewrap an existing DEK under a new KEK. Does not touch any
    /// ciphertext already encrypted with the DEK.
    async fn rewrap_dek_for_thread(&self, key_id: &str, new_kek_hex: &str) -> Result<RewrapResult, WireError>;
}
