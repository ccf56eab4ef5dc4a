//! Errors surfaced by the ingest queue and its worker pool.

use thiserror::Error;

/// Errors from enqueueing or processing a [`crate::op::QueueOp`].
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The queue is at capacity; the caller should back off (maps to
    /// HTTP 429).
    #[error("ingest queue is full")]
    QueueFull,
    /// The queue has been closed for shutdown (maps to HTTP 503).
    #[error("ingest queue is closed")]
    QueueClosed,
    /// A core model error (not found, validation, etc).
    #[error(transparent)]
    Core(#[from] progressdb_core::Error),
    /// A key failed to build or parse.
    #[error(transparent)]
    Key(#[from] progressdb_core::key::KeyError),
    /// A storage engine error.
    #[error(transparent)]
    Storage(#[from] progressdb_storage::StorageError),
    /// An encryption envelope error.
    #[error(transparent)]
    Security(#[from] progressdb_security::SecurityError),
    /// Body did not round-trip through JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ExecutorError>;
