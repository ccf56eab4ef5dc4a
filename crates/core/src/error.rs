//! Unified error type for ProgressDB.
//!
//! Every crate below the HTTP edge returns its own `thiserror`-derived
//! error; this module gives them a common home so the edge can map any of
//! them to one of the error kinds the wire protocol understands, without
//! every crate having to depend on `progressdb-api`.

use thiserror::Error;

use crate::key::KeyError;

/// Result alias used throughout ProgressDB's internal crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category an error falls into, used only to pick an HTTP
/// status code at the edge. Internal code should match on `Error`
/// variants, not on `ErrorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid key format, empty body, bad cursor, bad query parameter.
    Validation,
    /// Missing or invalid signature.
    Auth,
    /// Missing key, soft-deleted entity, provisional-wait timeout.
    NotFound,
    /// Author mismatch on a signed request.
    Conflict,
    /// Queue full or not ready.
    Transient,
    /// Encryption failure, store error, unmarshal error.
    Internal,
}

/// Unified error type surfaced by the core, storage, security, executor
/// and engine crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A key failed to parse or build.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// The requested entity does not exist, or is soft-deleted and the
    /// caller did not ask for deleted entities.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input failed validation (size limits, printable-ASCII checks,
    /// malformed JSON body).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller's signature did not match, or was absent.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The author on a write did not match the resource's owner.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The ingest queue is full or closed.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The underlying store returned an error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Encryption or decryption failed, or the KMS was unreachable.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Any other unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error for HTTP status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Key(_) | Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Transient(_) => ErrorKind::Transient,
            Error::Storage(_) | Error::Serialization(_) | Error::Encryption(_) | Error::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping_covers_all_http_buckets() {
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(Error::Auth("x".into()).kind(), ErrorKind::Auth);
        assert_eq!(Error::Conflict("x".into()).kind(), ErrorKind::Conflict);
        assert_eq!(Error::Transient("x".into()).kind(), ErrorKind::Transient);
        assert_eq!(Error::Internal("x".into()).kind(), ErrorKind::Internal);
        assert_eq!(Error::Storage("x".into()).kind(), ErrorKind::Internal);
    }
}
