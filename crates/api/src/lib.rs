//! Axum HTTP edge: thin dispatcher from requests to the ingest queue and
//! pagination engine. Validates path/query shape, resolves provisional
//! keys, and otherwise defers all state-changing logic to
//! `progressdb-executor` and all read logic to `progressdb-engine`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod error;
pub mod handlers;
pub mod hydrate;
pub mod opaque;
pub mod query;
pub mod router;
pub mod state;

pub use error::{ApiError, Result};
pub use router::build;
pub use state::AppState;
