//! Encryption envelope for message bodies: whole-body and field-policy
//! modes over a thread-scoped DEK managed by an out-of-process KMS.
//!
//! This crate never holds a raw DEK; every `encrypt`/`decrypt` call goes
//! through [`progressdb_wire::Kms`], which performs the cipher operation
//! on the far side of the socket and returns only ciphertext/plaintext.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod envelope;
pub mod error;
pub mod fieldpath;
pub mod provision;
pub mod rotation;

pub use config::EncryptionPolicy;
pub use envelope::{decrypt_body, encrypt_body, is_envelope};
pub use error::{Result, SecurityError};
pub use provision::ensure_thread_dek;
pub use rotation::{rewrap_thread_dek, rotate_thread_dek, BACKUP_MIGRATE_PREFIX};
