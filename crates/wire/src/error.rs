//! Errors raised by the KMS wire client.

use thiserror::Error;

/// Errors talking to or framing messages for the KMS.
#[derive(Debug, Error)]
pub enum WireError {
    /// The UNIX socket could not be reached or the connection dropped.
    #[error("KMS socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A frame failed to serialize or deserialize as JSON.
    #[error("KMS frame encoding error: {0}")]
    Json(#[from] serde_json::Error),
    /// A peer claimed a frame larger than we're willing to buffer.
    #[error("KMS frame of {0} bytes exceeds the maximum accepted size")]
    FrameTooLarge(usize),
    /// The KMS returned an application-level error for the request.
    #[error("KMS error ({code}): {message}")]
    Kms {
        /// Machine-readable error code from the KMS response.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// A request timed out waiting for a response.
    #[error("KMS request timed out")]
    Timeout,
    /// The connection pool could not produce a connection.
    #[error("KMS connection pool exhausted or socket unavailable: {0}")]
    PoolUnavailable(String),
}
