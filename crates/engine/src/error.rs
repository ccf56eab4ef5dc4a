//! Errors raised by the pagination engine.

use thiserror::Error;

/// Errors from building or walking a page.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A core key or model error.
    #[error(transparent)]
    Core(#[from] progressdb_core::Error),
    /// A storage engine error.
    #[error(transparent)]
    Storage(#[from] progressdb_storage::StorageError),
    /// A stored version failed to deserialize.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A cursor failed to decode, or decoded to the wrong thread.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    /// The cursor's embedded thread key does not match the request path.
    #[error("cursor thread {cursor} does not match path thread {path}")]
    ThreadMismatch {
        /// Thread key encoded in the cursor.
        cursor: String,
        /// Thread key from the request path.
        path: String,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EngineError>;
