//! Dispatch: turn one [`QueueOp`] into the effects it names, applied
//! atomically per store.

use progressdb_core::clock::next_ns;
use progressdb_core::entity::{Message, MessageVersion, Thread, ThreadMessageIndexes};
use progressdb_core::key::{
    gen_all_message_versions_prefix, gen_message_key, gen_message_version_key, gen_rel_thread_user_key,
    gen_rel_user_thread_key, gen_softdel_key, gen_thread_indexes_key, gen_thread_key, parse_key_sequence,
};
use progressdb_security::ensure_thread_dek;
use progressdb_storage::{Batch, WriteOpt};

use crate::context::ExecutorContext;
use crate::error::Result;
use crate::op::{Payload, QueueOp};

fn next_version_seq(ctx: &ExecutorContext, message_key: &str) -> Result<u64> {
    let prefix = gen_all_message_versions_prefix(message_key);
    let existing = ctx.stores.indexdb.iter_prefix(prefix.as_bytes(), true)?;
    match existing.first() {
        Some((key, _)) => {
            let key_str = String::from_utf8_lossy(key);
            Ok(parse_key_sequence(&key_str)? + 1)
        }
        None => Ok(1),
    }
}

async fn maybe_encrypt(ctx: &ExecutorContext, thread_key: &str, aad: &[u8], body: serde_json::Value) -> Result<serde_json::Value> {
    if !ctx.policy.is_enabled() {
        return Ok(body);
    }
    let thread_kms = ensure_thread_dek(ctx.kms.as_ref(), &ctx.stores.storedb, thread_key).await?;
    Ok(progressdb_security::encrypt_body(ctx.kms.as_ref(), &ctx.policy, &thread_kms.key_id, aad, body).await?)
}

async fn handle_thread_create(ctx: &ExecutorContext, provisional_key: &str, author: &str, title: &str, slug: &str) -> Result<()> {
    let now = next_ns();
    let thread_ts = now as u64;
    let thread_key = gen_thread_key(thread_ts);
    let _guard = ctx.thread_locks.lock(&thread_key).await;

    let thread = Thread::new(thread_key.clone(), author.to_string(), title.to_string(), slug.to_string(), now);
    ctx.stores.storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread)?, WriteOpt::default())?;

    ctx.inflight.resolve(provisional_key, &thread_key);

    let mut index_batch = Batch::new();
    index_batch.put(gen_rel_user_thread_key(author, thread_ts).into_bytes(), thread_key.as_bytes().to_vec());
    index_batch.put(gen_rel_thread_user_key(thread_ts, author).into_bytes(), thread_key.as_bytes().to_vec());
    index_batch.put(gen_thread_indexes_key(&thread_key).into_bytes(), serde_json::to_vec(&ThreadMessageIndexes::new())?);
    ctx.stores.indexdb.batch(&index_batch, WriteOpt::default())?;

    tracing::info!(thread_key, "thread created");
    Ok(())
}

async fn handle_thread_update(ctx: &ExecutorContext, thread_key: &str, title: Option<&str>, slug: Option<&str>) -> Result<()> {
    let _guard = ctx.thread_locks.lock(thread_key).await;
    let raw = ctx
        .stores
        .storedb
        .get(thread_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(thread_key.to_string()))?;
    let mut thread: Thread = serde_json::from_slice(&raw)?;
    if let Some(title) = title {
        thread.title = title.to_string();
    }
    if let Some(slug) = slug {
        thread.slug = slug.to_string();
    }
    thread.updated_ts = next_ns();
    ctx.stores.storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread)?, WriteOpt::default())?;
    Ok(())
}

async fn handle_thread_delete(ctx: &ExecutorContext, thread_key: &str) -> Result<()> {
    let _guard = ctx.thread_locks.lock(thread_key).await;
    let raw = ctx
        .stores
        .storedb
        .get(thread_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(thread_key.to_string()))?;
    let mut thread: Thread = serde_json::from_slice(&raw)?;
    let now = next_ns();
    thread.deleted = true;
    thread.deleted_ts = Some(now);
    ctx.stores.storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread)?, WriteOpt::default())?;
    ctx.stores
        .indexdb
        .set(gen_softdel_key(thread_key).as_bytes(), &now.to_le_bytes(), WriteOpt::default())?;
    Ok(())
}

async fn handle_message_create(
    ctx: &ExecutorContext,
    thread_key: &str,
    provisional_key: &str,
    author: &str,
    body: serde_json::Value,
) -> Result<()> {
    let _guard = ctx.thread_locks.lock(thread_key).await;

    let indexes_key = gen_thread_indexes_key(thread_key);
    let raw_indexes = ctx
        .stores
        .indexdb
        .get(indexes_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(format!("no counters for thread {thread_key}")))?;
    let mut indexes: ThreadMessageIndexes = serde_json::from_slice(&raw_indexes)?;

    let now = next_ns();
    let seq = indexes.record_create(now);
    let message_key = gen_message_key(thread_key, seq)?;

    // Encrypts under the thread's DEK, provisioning one on first use; that
    // provisioning writes `storedb`'s thread entry, so the `last_seq`
    // update below reads the thread back fresh rather than risking a
    // stale overwrite of a DEK assigned during encryption.
    let encrypted_body = maybe_encrypt(ctx, thread_key, message_key.as_bytes(), body).await?;
    let message = Message {
        key: message_key.clone(),
        thread: thread_key.to_string(),
        author: author.to_string(),
        body: encrypted_body,
        reactions: Default::default(),
        ts: now,
        created_ts: now,
        updated_ts: now,
        deleted: false,
    };
    ctx.stores.storedb.set(message_key.as_bytes(), &serde_json::to_vec(&message)?, WriteOpt::default())?;

    let raw_thread = ctx
        .stores
        .storedb
        .get(thread_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(thread_key.to_string()))?;
    let mut thread: Thread = serde_json::from_slice(&raw_thread)?;
    thread.last_seq = seq;
    ctx.stores.storedb.set(thread_key.as_bytes(), &serde_json::to_vec(&thread)?, WriteOpt::default())?;

    ctx.inflight.resolve(provisional_key, &message_key);

    let mut index_batch = Batch::new();
    index_batch.put(
        gen_message_version_key(&message_key, 1).into_bytes(),
        serde_json::to_vec(&MessageVersion { seq: 1, message })?,
    );
    index_batch.put(indexes_key.into_bytes(), serde_json::to_vec(&indexes)?);
    ctx.stores.indexdb.batch(&index_batch, WriteOpt::default())?;

    tracing::info!(thread_key, message_key, "message created");
    Ok(())
}

async fn handle_message_update(
    ctx: &ExecutorContext,
    thread_key: &str,
    message_key: &str,
    author: &str,
    body: serde_json::Value,
) -> Result<()> {
    let _guard = ctx.thread_locks.lock(thread_key).await;

    let indexes_key = gen_thread_indexes_key(thread_key);
    let raw_indexes = ctx
        .stores
        .indexdb
        .get(indexes_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(format!("no counters for thread {thread_key}")))?;
    let mut indexes: ThreadMessageIndexes = serde_json::from_slice(&raw_indexes)?;

    let raw_message = ctx
        .stores
        .storedb
        .get(message_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(message_key.to_string()))?;
    let mut message: Message = serde_json::from_slice(&raw_message)?;

    let now = next_ns();
    indexes.record_update(now);
    message.author = author.to_string();
    message.body = maybe_encrypt(ctx, thread_key, message_key.as_bytes(), body).await?;
    message.updated_ts = now;
    ctx.stores.storedb.set(message_key.as_bytes(), &serde_json::to_vec(&message)?, WriteOpt::default())?;

    let version_seq = next_version_seq(ctx, message_key)?;
    let mut index_batch = Batch::new();
    index_batch.put(
        gen_message_version_key(message_key, version_seq).into_bytes(),
        serde_json::to_vec(&MessageVersion { seq: version_seq, message })?,
    );
    index_batch.put(indexes_key.into_bytes(), serde_json::to_vec(&indexes)?);
    ctx.stores.indexdb.batch(&index_batch, WriteOpt::default())?;
    Ok(())
}

async fn handle_message_delete(ctx: &ExecutorContext, thread_key: &str, message_key: &str) -> Result<()> {
    let _guard = ctx.thread_locks.lock(thread_key).await;

    let indexes_key = gen_thread_indexes_key(thread_key);
    let raw_indexes = ctx
        .stores
        .indexdb
        .get(indexes_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(format!("no counters for thread {thread_key}")))?;
    let mut indexes: ThreadMessageIndexes = serde_json::from_slice(&raw_indexes)?;

    let raw_message = ctx
        .stores
        .storedb
        .get(message_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(message_key.to_string()))?;
    let mut message: Message = serde_json::from_slice(&raw_message)?;

    let now = next_ns();
    message.deleted = true;
    message.updated_ts = now;
    ctx.stores.storedb.set(message_key.as_bytes(), &serde_json::to_vec(&message)?, WriteOpt::default())?;

    if let Ok(msg_seq) = parse_key_sequence(message_key) {
        indexes.record_skip(msg_seq);
    }

    let version_seq = next_version_seq(ctx, message_key)?;
    let mut index_batch = Batch::new();
    index_batch.put(
        gen_message_version_key(message_key, version_seq).into_bytes(),
        serde_json::to_vec(&MessageVersion { seq: version_seq, message })?,
    );
    index_batch.put(gen_softdel_key(message_key).into_bytes(), now.to_le_bytes().to_vec());
    index_batch.put(indexes_key.into_bytes(), serde_json::to_vec(&indexes)?);
    ctx.stores.indexdb.batch(&index_batch, WriteOpt::default())?;
    Ok(())
}

/// Apply one op's effects. Called by a worker after dequeueing.
pub async fn apply(ctx: &ExecutorContext, op: &QueueOp) -> Result<()> {
    match &op.payload {
        Payload::ThreadCreate { provisional_key, author, title, slug } => {
            handle_thread_create(ctx, provisional_key, author, title, slug).await
        }
        Payload::ThreadUpdate { thread_key, title, slug } => {
            handle_thread_update(ctx, thread_key, title.as_deref(), slug.as_deref()).await
        }
        Payload::ThreadDelete { thread_key } => handle_thread_delete(ctx, thread_key).await,
        Payload::MessageCreate { thread_key, provisional_key, author, body } => {
            handle_message_create(ctx, thread_key, provisional_key, author, body.clone()).await
        }
        Payload::MessageUpdate { thread_key, message_key, author, body } => {
            handle_message_update(ctx, thread_key, message_key, author, body.clone()).await
        }
        Payload::MessageDelete { thread_key, message_key } => {
            handle_message_delete(ctx, thread_key, message_key).await
        }
    }
}
