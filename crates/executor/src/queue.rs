//! Bounded, non-blocking ingest queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ExecutorError;
use crate::op::QueueOp;

/// The producer half, cloneable and handed to every HTTP handler.
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<QueueOp>,
    closed: Arc<AtomicBool>,
}

/// The consumer half, owned by the worker pool.
pub struct IngestReceiver {
    rx: mpsc::Receiver<QueueOp>,
}

impl IngestQueue {
    /// Build a bounded queue with room for `capacity` pending ops.
    pub fn bounded(capacity: usize) -> (Self, IngestReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, closed: Arc::new(AtomicBool::new(false)) }, IngestReceiver { rx })
    }

    /// Enqueue `op` without blocking. Fails with [`ExecutorError::QueueFull`]
    /// if the queue is at capacity, or [`ExecutorError::QueueClosed`] if
    /// `close` has already been called.
    pub fn enqueue(&self, op: QueueOp) -> Result<(), ExecutorError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExecutorError::QueueClosed);
        }
        self.tx.try_send(op).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ExecutorError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ExecutorError::QueueClosed,
        })
    }

    /// Mark the queue closed. Enqueues after this return `QueueClosed`
    /// immediately rather than racing the channel's own closed state.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl IngestReceiver {
    /// Receive the next op, or `None` once every [`IngestQueue`] clone has
    /// been dropped and the channel has drained.
    pub async fn recv(&mut self) -> Option<QueueOp> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Extras, Handler, Payload};

    fn sample_op() -> QueueOp {
        QueueOp {
            handler: Handler::ThreadCreate,
            payload: Payload::ThreadCreate {
                provisional_key: "t:prv:1".into(),
                author: "u1".into(),
                title: "t".into(),
                slug: "t".into(),
            },
            ts: 1,
            extras: Extras { role: "user".into(), user_id: "u1".into(), req_id: "r1".into(), req_ip: "127.0.0.1".into() },
        }
    }

    #[tokio::test]
    async fn enqueue_beyond_capacity_returns_queue_full() {
        let (queue, _rx) = IngestQueue::bounded(1);
        queue.enqueue(sample_op()).unwrap();
        let err = queue.enqueue(sample_op()).unwrap_err();
        assert!(matches!(err, ExecutorError::QueueFull));
    }

    #[tokio::test]
    async fn enqueue_after_close_returns_queue_closed() {
        let (queue, _rx) = IngestQueue::bounded(4);
        queue.close();
        let err = queue.enqueue(sample_op()).unwrap_err();
        assert!(matches!(err, ExecutorError::QueueClosed));
    }

    #[tokio::test]
    async fn receiver_gets_enqueued_ops_in_order() {
        let (queue, mut rx) = IngestQueue::bounded(4);
        queue.enqueue(sample_op()).unwrap();
        let got = rx.recv().await;
        assert!(got.is_some());
    }
}
