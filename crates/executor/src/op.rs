//! The typed operations the ingest queue carries from the HTTP edge to
//! the worker pool.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request-scoped context carried alongside every op, for logging and
/// authorship attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extras {
    /// Caller's role (e.g. `"user"`, `"admin"`, `"backend"`).
    pub role: String,
    /// Identity performing the write.
    pub user_id: String,
    /// Request id, echoed in logs and error responses.
    pub req_id: String,
    /// Caller's source IP, for audit logging.
    pub req_ip: String,
}

/// The handler a [`QueueOp`] should be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handler {
    /// Create a new thread.
    ThreadCreate,
    /// Update a thread's mutable metadata.
    ThreadUpdate,
    /// Soft-delete a thread.
    ThreadDelete,
    /// Append a new message to a thread.
    MessageCreate,
    /// Append a new version of an existing message.
    MessageUpdate,
    /// Soft-delete a message.
    MessageDelete,
}

/// Operation-specific payload. The variant always matches the op's
/// `handler`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    /// Create a thread. `provisional_key` was already minted and handed
    /// to the client before this op was enqueued.
    ThreadCreate {
        /// Provisional key returned synchronously in the `202` response.
        provisional_key: String,
        /// The thread's single owning author/user id.
        author: String,
        /// Human-readable title.
        title: String,
        /// URL-safe slug derived from the title.
        slug: String,
    },
    /// Update a thread's title/slug.
    ThreadUpdate {
        /// Final thread key (resolved before enqueue).
        thread_key: String,
        /// New title, if changing.
        title: Option<String>,
        /// New slug, if changing.
        slug: Option<String>,
    },
    /// Soft-delete a thread.
    ThreadDelete {
        /// Final thread key.
        thread_key: String,
    },
    /// Append a new message.
    MessageCreate {
        /// Final key of the owning thread (resolved before enqueue).
        thread_key: String,
        /// Provisional key returned synchronously in the `202` response.
        provisional_key: String,
        /// Author of this message.
        author: String,
        /// Message body, plaintext at enqueue time; encrypted by the
        /// worker before it reaches storage.
        body: Value,
    },
    /// Append a new version of an existing message.
    MessageUpdate {
        /// Final key of the owning thread.
        thread_key: String,
        /// Final key of the message being updated.
        message_key: String,
        /// Author of this version.
        author: String,
        /// New body, plaintext at enqueue time.
        body: Value,
    },
    /// Soft-delete a message.
    MessageDelete {
        /// Final key of the owning thread.
        thread_key: String,
        /// Final key of the message being deleted.
        message_key: String,
    },
}

/// One unit of ingest work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueOp {
    /// Which handler processes this op; always matches `payload`'s variant.
    pub handler: Handler,
    /// The operation's data.
    pub payload: Payload,
    /// Monotonic nanosecond timestamp set at enqueue time.
    pub ts: i64,
    /// Request-scoped metadata.
    pub extras: Extras,
}
