//! Process assembly: turn a [`progressdb_config::Config`] into a running
//! set of stores, an ingest worker pool, a retention scheduler, and the
//! HTTP router — the wiring `main.rs` drives and integration tests can
//! drive directly without going through a real process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use progressdb_api::AppState;
use progressdb_concurrency::{InflightTracker, ThreadLockManager};
use progressdb_executor::{ExecutorContext, IngestQueue, WorkerPool};
use progressdb_retention::{scheduler, CronSchedule, RetentionPeriod};
use progressdb_storage::{Stores, StoreDbPaths};
use progressdb_wire::{Kms, KmsClient, KmsClientConfig};

use progressdb_config::Config;

/// Every long-lived piece started by [`assemble`], held together so
/// [`shutdown`] can unwind them in the documented order.
pub struct Assembled {
    /// The HTTP router, ready to be served.
    pub router: axum::Router,
    /// Producer half of the ingest queue, for anything that needs to
    /// enqueue outside the HTTP edge (none today; kept for symmetry and
    /// tests that want to enqueue directly).
    pub ingest: IngestQueue,
    /// The running ingest worker pool.
    pub worker_pool: WorkerPool,
    /// Both stores, for final close.
    pub stores: Stores,
    /// Signals the retention scheduler to stop.
    pub retention_shutdown: watch::Sender<bool>,
    /// The retention scheduler's task handle.
    pub retention_task: JoinHandle<()>,
}

/// Build every component named in `config` and wire them together. Does
/// not bind a listener or start serving; the caller does that with
/// [`Assembled::router`].
pub async fn assemble(config: &Config) -> anyhow::Result<Assembled> {
    let stores = Stores::open(&StoreDbPaths {
        store_dir: config.store_dir.clone(),
        index_dir: config.index_dir.clone(),
        disable_wal: false,
    })?;

    let kms: Arc<dyn Kms> = Arc::new(KmsClient::new(KmsClientConfig {
        socket_path: config.kms_socket_path.clone(),
        ..KmsClientConfig::default()
    }));

    let (ingest, receiver) = IngestQueue::bounded(config.queue_capacity);
    let inflight = Arc::new(InflightTracker::new());
    let thread_locks = Arc::new(ThreadLockManager::new());
    let resolve_timeout = Duration::from_millis(config.resolve_timeout_ms);

    let executor_ctx = ExecutorContext {
        stores: stores.clone(),
        thread_locks,
        inflight: inflight.clone(),
        kms: kms.clone(),
        policy: config.encryption.clone(),
        resolve_timeout,
    };
    let worker_pool = WorkerPool::spawn(config.worker_count, receiver, executor_ctx);

    let (retention_shutdown, retention_shutdown_rx) = watch::channel(false);
    let retention_schedule = CronSchedule::parse(&config.retention_cron)?;
    let retention_period = RetentionPeriod(config.retention_period_secs as i64 * 1_000_000_000);
    let retention_stores = stores.clone();
    let retention_task = tokio::spawn(scheduler::run(retention_stores, retention_schedule, retention_period, retention_shutdown_rx));

    let state = AppState { stores: stores.clone(), ingest: ingest.clone(), inflight, kms, policy: config.encryption.clone(), resolve_timeout };
    let router = progressdb_api::build(state);

    Ok(Assembled { router, ingest, worker_pool, stores, retention_shutdown, retention_task })
}

/// Tear down every component in the order spec.md §5 prescribes: stop
/// accepting new work, drain what's already enqueued, stop the
/// retention scheduler, then close the stores.
pub async fn shutdown(assembled: Assembled, worker_drain_deadline: Duration) -> anyhow::Result<()> {
    assembled.ingest.close();
    assembled.worker_pool.stop(worker_drain_deadline).await;
    let _ = assembled.retention_shutdown.send(true);
    let _ = assembled.retention_task.await;
    assembled.stores.close()?;
    Ok(())
}
