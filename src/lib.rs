//! # ProgressDB
//!
//! An append-oriented datastore for conversational threads and messages:
//! an HTTP ingest edge, a bounded worker pool applying writes against two
//! LSM-style key-value stores, per-thread encryption over an
//! out-of-process KMS, and cursor-based pagination over both.
//!
//! This crate is the process wiring (see [`wiring`]) on top of the
//! component crates that do the actual work — `progressdb-core`,
//! `progressdb-storage`, `progressdb-concurrency`, `progressdb-wire`,
//! `progressdb-security`, `progressdb-executor`, `progressdb-engine`,
//! `progressdb-api`, `progressdb-retention`, and `progressdb-config`.
//! Each has its own `lib.rs` documenting the piece it owns.
//!
//! # Quick start
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! let config = progressdb_config::Config::load(None)?;
//! let assembled = progressdb::wiring::assemble(&config).await?;
//! let listener = tokio::net::TcpListener::bind(&config.http_bind_addr).await?;
//! axum::serve(listener, assembled.router).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod wiring;

pub use wiring::{assemble, shutdown, Assembled};
