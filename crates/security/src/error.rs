//! Errors raised while encrypting or decrypting message bodies.

use thiserror::Error;

/// Errors from the encryption envelope.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The KMS rejected or failed an operation.
    #[error("KMS error: {0}")]
    Kms(#[from] progressdb_wire::WireError),
    /// The stored envelope was not shaped the way this mode expects.
    #[error("malformed encryption envelope: {0}")]
    MalformedEnvelope(String),
    /// A field path named by the field policy did not resolve in the body.
    #[error("field policy path not found: {0}")]
    FieldNotFound(String),
    /// The thread has no DEK and encryption is disabled, so there is
    /// nothing to decrypt.
    #[error("thread {0} has no encryption key")]
    NoThreadKey(String),
    /// Underlying storage failed while reading/writing thread metadata.
    #[error("storage error: {0}")]
    Storage(#[from] progressdb_storage::StorageError),
    /// Body or envelope did not round-trip through JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SecurityError>;
