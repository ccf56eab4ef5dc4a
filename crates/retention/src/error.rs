//! Errors from parsing a cron schedule or running a sweep.

use thiserror::Error;

/// Failure modes for this crate.
#[derive(Debug, Error)]
pub enum RetentionError {
    /// The configured cron expression did not have the expected shape.
    #[error("invalid cron expression {0:?}: {1}")]
    InvalidCron(String, &'static str),
    /// A soft-delete marker's key or value did not have the expected
    /// shape; the sweep skips it rather than panicking.
    #[error("corrupt softdel marker: {0}")]
    Corrupt(String),
    /// A key failed to parse.
    #[error(transparent)]
    Key(#[from] progressdb_core::key::KeyError),
    /// A storage engine error.
    #[error(transparent)]
    Storage(#[from] progressdb_storage::StorageError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RetentionError>;
