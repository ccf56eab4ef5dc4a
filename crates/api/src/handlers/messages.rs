//! `/v1/threads/{threadKey}/messages` and `/v1/threads/{threadKey}/messages/{id}`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use progressdb_core::clock::next_ns;
use progressdb_core::entity::{Message, Thread};
use progressdb_core::key::{gen_all_thread_messages_prefix, gen_message_prov_key, gen_softdel_key};
use progressdb_engine::{collect_live_ascending, paginate, Cursor};
use progressdb_executor::{Extras, Handler, Payload, QueueOp};

use crate::auth::AuthContext;
use crate::error::{ApiError, Result};
use crate::handlers::threads::{AcceptedResponse, PaginationMeta};
use crate::hydrate::decrypt_message_body;
use crate::query::{GetQuery, ListQuery};
use crate::state::AppState;

/// Body of `POST /v1/threads/{threadKey}/messages`.
#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    /// Opaque JSON payload.
    pub body: Value,
    /// Author of this message; defaults to the caller's identity.
    pub author: Option<String>,
}

/// Body of `PUT /v1/threads/{threadKey}/messages/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateMessageRequest {
    /// New opaque JSON payload.
    pub body: Value,
    /// Author of this version; defaults to the caller's identity.
    pub author: Option<String>,
}

/// Body of `GET /v1/threads/{threadKey}/messages/{id}`.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// The message, decrypted if the thread has a DEK.
    pub message: Message,
}

/// Body of `GET /v1/threads/{threadKey}/messages`.
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    /// The owning thread's final key.
    pub thread: String,
    /// The page of messages, decrypted.
    pub messages: Vec<Message>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Body of `GET /v1/threads/{threadKey}/messages/{id}/versions`.
#[derive(Debug, Serialize)]
pub struct MessageVersionsResponse {
    /// Every version of the message, oldest first; the last entry is the
    /// message's current state.
    pub versions: Vec<progressdb_core::entity::MessageVersion>,
}

fn req_extras(auth: &AuthContext) -> Extras {
    Extras { role: format!("{:?}", auth.role).to_lowercase(), user_id: auth.user_id.clone(), req_id: format!("{}", next_ns()), req_ip: String::new() }
}

async fn load_thread(state: &AppState, thread_key: &str) -> Result<Thread> {
    let raw = state
        .stores
        .storedb
        .get(thread_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(thread_key.to_string()))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// `POST /v1/threads/{threadKey}/messages`: enqueue a message create,
/// returning its provisional key immediately.
pub async fn create_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(thread_key): Path<String>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    let final_thread_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let author = req.author.unwrap_or_else(|| auth.user_id.clone());

    let provisional_key = gen_message_prov_key(&final_thread_key, next_ns() as u64).map_err(progressdb_core::Error::from)?;
    state.inflight.register(&provisional_key);

    let op = QueueOp {
        handler: Handler::MessageCreate,
        payload: Payload::MessageCreate {
            thread_key: final_thread_key,
            provisional_key: provisional_key.clone(),
            author,
            body: req.body,
        },
        ts: next_ns(),
        extras: req_extras(&auth),
    };
    state.ingest.enqueue(op)?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { key: provisional_key })))
}

/// `GET /v1/threads/{threadKey}/messages`.
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(thread_key): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<MessageListResponse>> {
    let final_thread_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let thread = load_thread(&state, &final_thread_key).await?;

    let mut request = q.into_request(auth.role.is_privileged()).map_err(ApiError::BadRequest)?;
    let cursor_to_key = |raw: &str| -> Result<String> {
        let cursor = Cursor::decode_for_thread(raw, &final_thread_key)?;
        Ok(progressdb_core::key::gen_message_key(&final_thread_key, cursor.sequence).map_err(progressdb_core::Error::from)?)
    };
    request.boundary = match &request.boundary {
        progressdb_engine::Boundary::After(raw) => progressdb_engine::Boundary::After(cursor_to_key(raw)?),
        progressdb_engine::Boundary::Before(raw) => progressdb_engine::Boundary::Before(cursor_to_key(raw)?),
        progressdb_engine::Boundary::Anchor(raw) => progressdb_engine::Boundary::Anchor(cursor_to_key(raw)?),
        progressdb_engine::Boundary::None => progressdb_engine::Boundary::None,
    };

    let prefix = gen_all_thread_messages_prefix(&final_thread_key).map_err(progressdb_core::Error::from)?;
    let live = collect_live_ascending(&state.stores.storedb, &state.stores.indexdb, &prefix, request.include_deleted, |k| Ok(k.to_string()))?;
    let page = paginate(&live, &request);

    let mut messages = Vec::with_capacity(page.keys.len());
    for key in &page.keys {
        let raw = state.stores.storedb.get(key.as_bytes())?.ok_or_else(|| progressdb_core::Error::NotFound(key.clone()))?;
        let mut message: Message = serde_json::from_slice(&raw)?;
        message.body = decrypt_message_body(&state, &thread, key, message.body).await?;
        messages.push(message);
    }
    crate::hydrate::apply_post_hydration_sort(&mut messages, &request, |m| m.updated_ts);

    let to_cursor = |key: &str| -> Result<String> {
        let seq = progressdb_core::key::parse_key_sequence(key).map_err(progressdb_core::Error::from)?;
        let ts = progressdb_core::key::parse_key_timestamp(key).map_err(progressdb_core::Error::from)?;
        Ok(Cursor { thread_key: final_thread_key.clone(), timestamp: ts as i64, sequence: seq }.encode())
    };
    let next = match page.keys.last() {
        Some(k) if page.has_after => Some(to_cursor(k)?),
        _ => None,
    };
    let prev = match page.keys.first() {
        Some(k) if page.has_before => Some(to_cursor(k)?),
        _ => None,
    };

    Ok(Json(MessageListResponse {
        thread: final_thread_key,
        messages,
        pagination: PaginationMeta { has_before: page.has_before, has_after: page.has_after, next, prev },
    }))
}

/// `GET /v1/threads/{threadKey}/messages/{id}`.
pub async fn get_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((thread_key, message_key)): Path<(String, String)>,
    Query(q): Query<GetQuery>,
) -> Result<Json<MessageResponse>> {
    let include_deleted = q.into_include_deleted(auth.role.is_privileged()).map_err(ApiError::BadRequest)?;
    let final_thread_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let final_message_key = state.inflight.resolve_or_wait(&message_key, state.resolve_timeout).await?;
    let thread = load_thread(&state, &final_thread_key).await?;

    let raw = state
        .stores
        .storedb
        .get(final_message_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(final_message_key.clone()))?;
    let mut message: Message = serde_json::from_slice(&raw)?;
    if message.deleted && !include_deleted {
        return Err(ApiError::Core(progressdb_core::Error::NotFound(final_message_key)));
    }
    message.body = decrypt_message_body(&state, &thread, &final_message_key, message.body).await?;
    Ok(Json(MessageResponse { message }))
}

/// `GET /v1/threads/{threadKey}/messages/{id}/versions`: the message's
/// full append-only history, oldest first, last entry current. Privileged
/// callers only — this is an audit/history surface, not the ordinary read
/// path.
pub async fn list_message_versions(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((thread_key, message_key)): Path<(String, String)>,
) -> Result<Json<MessageVersionsResponse>> {
    if !auth.role.is_privileged() {
        return Err(ApiError::Forbidden("listing message versions requires a privileged caller".into()));
    }
    let final_thread_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let final_message_key = state.inflight.resolve_or_wait(&message_key, state.resolve_timeout).await?;
    let thread = load_thread(&state, &final_thread_key).await?;

    let mut versions = progressdb_engine::list_message_versions(&state.stores.indexdb, &final_message_key)?;
    for version in &mut versions {
        version.message.body = decrypt_message_body(&state, &thread, &final_message_key, version.message.body.clone()).await?;
    }
    Ok(Json(MessageVersionsResponse { versions }))
}

/// `PUT /v1/threads/{threadKey}/messages/{id}`.
pub async fn update_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((thread_key, message_key)): Path<(String, String)>,
    Json(req): Json<UpdateMessageRequest>,
) -> Result<StatusCode> {
    let final_thread_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let final_message_key = state.inflight.resolve_or_wait(&message_key, state.resolve_timeout).await?;
    let author = req.author.unwrap_or_else(|| auth.user_id.clone());
    let op = QueueOp {
        handler: Handler::MessageUpdate,
        payload: Payload::MessageUpdate { thread_key: final_thread_key, message_key: final_message_key, author, body: req.body },
        ts: next_ns(),
        extras: req_extras(&auth),
    };
    state.ingest.enqueue(op)?;
    Ok(StatusCode::ACCEPTED)
}

/// `DELETE /v1/threads/{threadKey}/messages/{id}`.
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((thread_key, message_key)): Path<(String, String)>,
) -> Result<StatusCode> {
    let final_thread_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let final_message_key = state.inflight.resolve_or_wait(&message_key, state.resolve_timeout).await?;
    if state.stores.indexdb.get(gen_softdel_key(&final_message_key).as_bytes())?.is_some() {
        return Err(ApiError::Core(progressdb_core::Error::NotFound(final_message_key)));
    }
    let op = QueueOp {
        handler: Handler::MessageDelete,
        payload: Payload::MessageDelete { thread_key: final_thread_key, message_key: final_message_key },
        ts: next_ns(),
        extras: req_extras(&auth),
    };
    state.ingest.enqueue(op)?;
    Ok(StatusCode::ACCEPTED)
}
