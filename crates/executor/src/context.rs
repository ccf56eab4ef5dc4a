//! Shared state every worker needs to apply an op.

use std::sync::Arc;
use std::time::Duration;

use progressdb_concurrency::{InflightTracker, ThreadLockManager};
use progressdb_security::EncryptionPolicy;
use progressdb_storage::Stores;
use progressdb_wire::Kms;

/// Everything a worker needs to turn a [`crate::op::QueueOp`] into
/// persisted state.
#[derive(Clone)]
pub struct ExecutorContext {
    /// The two ordered stores.
    pub stores: Stores,
    /// Per-thread write serialization.
    pub thread_locks: Arc<ThreadLockManager>,
    /// Provisional-to-final key resolution.
    pub inflight: Arc<InflightTracker>,
    /// KMS client (real or fake), shared across workers.
    pub kms: Arc<dyn Kms>,
    /// How message bodies are encrypted.
    pub policy: EncryptionPolicy,
    /// How long a reader will block on an unresolved provisional key.
    pub resolve_timeout: Duration,
}
