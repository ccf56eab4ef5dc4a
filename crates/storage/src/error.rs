//! Storage-layer error type.

use std::io;
use std::path::PathBuf;

/// Errors raised by [`crate::store::LsmStore`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key does not exist.
    #[error("key not found")]
    NotFound,
    /// Underlying file I/O failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// Path the failing operation was against.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A WAL record failed its checksum or was truncated.
    #[error("WAL corruption: {0}")]
    WalCorruption(#[from] progressdb_durability::RecordError),
    /// The store was asked to operate after `close()`.
    #[error("store is closed")]
    Closed,
}

impl StorageError {
    /// Mirrors the store-level `IsNotFound` predicate from the design:
    /// callers should use this instead of matching on the enum directly so
    /// the definition of "not found" stays in one place.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
