//! Bounded ingest queue and worker pool: the HTTP edge enqueues typed
//! ops and returns a provisional key immediately; a pool of `N` workers
//! dequeues, applies effects per-thread-serialized, and resolves the
//! provisional key to its final form.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod handlers;
pub mod op;
pub mod queue;
pub mod worker;

pub use context::ExecutorContext;
pub use error::{ExecutorError, Result};
pub use op::{Extras, Handler, Payload, QueueOp};
pub use queue::{IngestQueue, IngestReceiver};
pub use worker::WorkerPool;
