//! Decrypt-on-read and response-shaping helpers shared by the thread and
//! message handlers.

use serde::Serialize;

use progressdb_core::Thread;
use progressdb_engine::{OrderBy, PaginationRequest, SortBy};
use progressdb_security::decrypt_body;

use crate::error::Result;
use crate::state::AppState;

/// Re-sort an already-hydrated page by `updated_ts` when the caller asked
/// for it. Key order already matches `created_ts`, so this is a no-op
/// unless `request.sort_by` is [`SortBy::UpdatedTs`] — §4.6 applies that
/// ordering only after hydration, since `updated_ts` isn't part of the
/// key.
pub fn apply_post_hydration_sort<T>(items: &mut [T], request: &PaginationRequest, updated_ts: impl Fn(&T) -> i64) {
    if request.sort_by != SortBy::UpdatedTs {
        return;
    }
    items.sort_by_key(|it| updated_ts(it));
    if request.order_by == OrderBy::Desc {
        items.reverse();
    }
}

/// The thread fields safe to hand back over HTTP — everything but the
/// KMS bookkeeping, which carries the wrapped DEK.
#[derive(Debug, Serialize)]
pub struct ThreadView {
    /// The thread's key.
    pub key: String,
    /// Owning author.
    pub author: String,
    /// Title.
    pub title: String,
    /// Slug.
    pub slug: String,
    /// Creation timestamp.
    pub created_ts: i64,
    /// Last metadata update timestamp.
    pub updated_ts: i64,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Soft-delete timestamp, if deleted.
    pub deleted_ts: Option<i64>,
}

impl From<&Thread> for ThreadView {
    fn from(t: &Thread) -> Self {
        Self {
            key: t.key.clone(),
            author: t.author.clone(),
            title: t.title.clone(),
            slug: t.slug.clone(),
            created_ts: t.created_ts,
            updated_ts: t.updated_ts,
            deleted: t.deleted,
            deleted_ts: t.deleted_ts,
        }
    }
}

/// Decrypt a message body under the thread's provisioned DEK, passing it
/// through unchanged if encryption is disabled or the thread has no DEK
/// yet (a body written before encryption was turned on).
pub async fn decrypt_message_body(
    state: &AppState,
    thread: &Thread,
    message_key: &str,
    body: serde_json::Value,
) -> Result<serde_json::Value> {
    if !state.policy.is_enabled() {
        return Ok(body);
    }
    let Some(thread_kms) = &thread.kms else {
        return Ok(body);
    };
    let decrypted =
        decrypt_body(state.kms.as_ref(), &state.policy, &thread_kms.key_id, message_key.as_bytes(), body).await?;
    Ok(decrypted)
}
