//! Maps every internal error type to an HTTP status and a short JSON
//! body, the only place in this crate that knows about status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The error type every handler in this crate returns.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A core model/key error.
    #[error(transparent)]
    Core(#[from] progressdb_core::Error),
    /// An executor (queue/apply) error.
    #[error(transparent)]
    Executor(#[from] progressdb_executor::ExecutorError),
    /// A pagination engine error.
    #[error(transparent)]
    Engine(#[from] progressdb_engine::EngineError),
    /// A storage engine error.
    #[error(transparent)]
    Storage(#[from] progressdb_storage::StorageError),
    /// An encryption envelope error.
    #[error(transparent)]
    Security(#[from] progressdb_security::SecurityError),
    /// The request body was not valid JSON for the target shape.
    #[error("invalid request body: {0}")]
    BadRequest(String),
    /// Missing or invalid signature.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Caller's role does not permit this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The dependent service (KMS) or store is not ready.
    #[error("not ready: {0}")]
    NotReady(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => core_status(e),
            ApiError::Executor(progressdb_executor::ExecutorError::QueueFull) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Executor(progressdb_executor::ExecutorError::QueueClosed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Executor(progressdb_executor::ExecutorError::Core(e)) => core_status(e),
            ApiError::Executor(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(progressdb_engine::EngineError::InvalidCursor(_)) => StatusCode::BAD_REQUEST,
            ApiError::Engine(progressdb_engine::EngineError::ThreadMismatch { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Engine(progressdb_engine::EngineError::Core(e)) => core_status(e),
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(progressdb_storage::StorageError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Storage(progressdb_storage::StorageError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Security(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

fn core_status(e: &progressdb_core::Error) -> StatusCode {
    use progressdb_core::ErrorKind;
    match e.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::FORBIDDEN,
        ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: &self.to_string() })).into_response()
    }
}

/// Convenience alias for handler return types.
pub type Result<T> = std::result::Result<T, ApiError>;
