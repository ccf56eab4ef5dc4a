//! The worker pool: `N` tasks pulling from one [`IngestReceiver`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::context::ExecutorContext;
use crate::handlers::apply;
use crate::queue::IngestReceiver;

/// A running pool of ingest workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` tasks sharing `receiver`, each applying ops
    /// against `ctx` until the queue drains and closes.
    pub fn spawn(worker_count: usize, receiver: IngestReceiver, ctx: ExecutorContext) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let receiver = receiver.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let op = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    let Some(op) = op else {
                        tracing::info!(worker_id = id, "worker exiting: queue drained and closed");
                        break;
                    };
                    if let Err(e) = apply(&ctx, &op).await {
                        // Transient and persistence failures are logged and
                        // swallowed: the queue keeps moving, per the
                        // at-most-once delivery this op class gets.
                        tracing::error!(worker_id = id, error = %e, "op failed");
                    }
                }
            }));
        }
        Self { handles }
    }

    /// Wait for every worker to exit (the queue must already be closed
    /// and draining), or give up after `deadline` and abort the rest.
    pub async fn stop(self, deadline: Duration) {
        let joined = tokio::time::timeout(deadline, join_all_handles(self.handles)).await;
        if joined.is_err() {
            tracing::warn!("worker pool did not drain within the shutdown deadline");
        }
    }
}

async fn join_all_handles(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Extras, Handler, Payload, QueueOp};
    use crate::queue::IngestQueue;
    use progressdb_concurrency::{InflightTracker, ThreadLockManager};
    use progressdb_security::EncryptionPolicy;
    use progressdb_storage::{StoreDbPaths, Stores};
    use progressdb_wire::FakeKms;
    use tempfile::tempdir;

    fn make_ctx(dir: &tempfile::TempDir) -> ExecutorContext {
        let paths = StoreDbPaths {
            store_dir: dir.path().join("store"),
            index_dir: dir.path().join("index"),
            disable_wal: true,
        };
        let stores = Stores::open(&paths).unwrap();
        ExecutorContext {
            stores,
            thread_locks: Arc::new(ThreadLockManager::new()),
            inflight: Arc::new(InflightTracker::new()),
            kms: Arc::new(FakeKms::new()),
            policy: EncryptionPolicy::Disabled,
            resolve_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn pool_applies_a_thread_create_and_then_drains_on_close() {
        let dir = tempdir().unwrap();
        let ctx = make_ctx(&dir);
        let (queue, rx) = IngestQueue::bounded(8);

        let pool = WorkerPool::spawn(2, rx, ctx.clone());

        queue
            .enqueue(QueueOp {
                handler: Handler::ThreadCreate,
                payload: Payload::ThreadCreate {
                    provisional_key: "t:prv:0000000000000000001".into(),
                    author: "u1".into(),
                    title: "hello".into(),
                    slug: "hello".into(),
                },
                ts: 1,
                extras: Extras { role: "user".into(), user_id: "u1".into(), req_id: "r1".into(), req_ip: "127.0.0.1".into() },
            })
            .unwrap();

        let resolved = ctx
            .inflight
            .resolve_or_wait("t:prv:0000000000000000001", Duration::from_secs(2))
            .await
            .unwrap();
        assert!(progressdb_core::key::validate_thread_key(&resolved).is_ok());

        queue.close();
        drop(queue);
        pool.stop(Duration::from_secs(2)).await;
    }
}
