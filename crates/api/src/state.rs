//! Process-wide singletons, injected once at startup and cloned cheaply
//! into every handler (per the "globals must be replaceable for tests"
//! design note).

use std::sync::Arc;
use std::time::Duration;

use progressdb_concurrency::InflightTracker;
use progressdb_executor::IngestQueue;
use progressdb_security::EncryptionPolicy;
use progressdb_storage::Stores;
use progressdb_wire::Kms;

/// Shared application state, cheap to clone (everything inside is
/// already `Arc` or itself cloneable).
#[derive(Clone)]
pub struct AppState {
    /// The two ordered stores, for reads the edge does directly.
    pub stores: Stores,
    /// Producer half of the ingest queue.
    pub ingest: IngestQueue,
    /// Provisional-to-final key resolution.
    pub inflight: Arc<InflightTracker>,
    /// KMS client, used for `/readyz` health and decrypt-on-read.
    pub kms: Arc<dyn Kms>,
    /// Encryption policy applied to message bodies.
    pub policy: EncryptionPolicy,
    /// How long a read blocks waiting for a provisional key to resolve.
    pub resolve_timeout: Duration,
}
