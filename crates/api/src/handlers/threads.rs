//! `/v1/threads` and `/v1/threads/{threadKey}`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use progressdb_core::clock::next_ns;
use progressdb_core::entity::{validate_author, Thread};
use progressdb_core::key::{gen_rel_user_threads_prefix, gen_softdel_key, gen_thread_prov_key, parse_user_owns_thread};
use progressdb_engine::{collect_live_ascending, paginate};
use progressdb_executor::{Extras, Handler, Payload, QueueOp};

use crate::auth::AuthContext;
use crate::error::{ApiError, Result};
use crate::hydrate::ThreadView;
use crate::opaque;
use crate::query::ListQuery;
use crate::state::AppState;

/// Body of `POST /v1/threads`.
#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    /// Human-readable title.
    pub title: String,
    /// Owning author; defaults to the caller's identity.
    pub author: Option<String>,
}

/// The `202` body every write endpoint returns.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    /// Provisional (or already-final) key for the created/updated entity.
    pub key: String,
}

/// Body of `PUT /v1/threads/{threadKey}`.
#[derive(Debug, Deserialize)]
pub struct UpdateThreadRequest {
    /// New title, if changing.
    pub title: Option<String>,
    /// New slug, if changing.
    pub slug: Option<String>,
}

/// Body of `GET /v1/threads/{threadKey}`.
#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    /// The thread.
    pub thread: ThreadView,
}

/// Pagination metadata attached to every list response.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Whether an item exists before the first item returned.
    pub has_before: bool,
    /// Whether an item exists after the last item returned.
    pub has_after: bool,
    /// Cursor for the next page, if `has_after`.
    pub next: Option<String>,
    /// Cursor for the previous page, if `has_before`.
    pub prev: Option<String>,
}

/// Body of `GET /v1/threads`.
#[derive(Debug, Serialize)]
pub struct ThreadListResponse {
    /// The page of threads.
    pub threads: Vec<ThreadView>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

fn slugify(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

fn req_extras(auth: &AuthContext) -> Extras {
    Extras { role: format!("{:?}", auth.role).to_lowercase(), user_id: auth.user_id.clone(), req_id: format!("{}", next_ns()), req_ip: String::new() }
}

/// `POST /v1/threads`: enqueue a thread create, returning its provisional
/// key immediately.
pub async fn create_thread(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateThreadRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>)> {
    let author = req.author.unwrap_or_else(|| auth.user_id.clone());
    validate_author(&author).map_err(|_| ApiError::BadRequest("invalid author".into()))?;
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }
    let slug = slugify(&req.title);

    let provisional_key = gen_thread_prov_key(next_ns() as u64);
    state.inflight.register(&provisional_key);

    let op = QueueOp {
        handler: Handler::ThreadCreate,
        payload: Payload::ThreadCreate { provisional_key: provisional_key.clone(), author, title: req.title, slug },
        ts: next_ns(),
        extras: req_extras(&auth),
    };
    state.ingest.enqueue(op)?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { key: provisional_key })))
}

/// `GET /v1/threads`: the caller's own threads, newest first unless
/// paginated otherwise.
pub async fn list_threads(State(state): State<AppState>, auth: AuthContext, Query(q): Query<ListQuery>) -> Result<Json<ThreadListResponse>> {
    let mut request = q.into_request(auth.role.is_privileged()).map_err(ApiError::BadRequest)?;
    request.boundary = match request.boundary {
        progressdb_engine::Boundary::After(raw) => progressdb_engine::Boundary::After(opaque::decode(&raw)?),
        progressdb_engine::Boundary::Before(raw) => progressdb_engine::Boundary::Before(opaque::decode(&raw)?),
        progressdb_engine::Boundary::Anchor(raw) => progressdb_engine::Boundary::Anchor(opaque::decode(&raw)?),
        progressdb_engine::Boundary::None => progressdb_engine::Boundary::None,
    };
    let prefix = gen_rel_user_threads_prefix(&auth.user_id);

    let live = collect_live_ascending(&state.stores.indexdb, &state.stores.indexdb, &prefix, request.include_deleted, |k| {
        let (_, thread_key) = parse_user_owns_thread(k).map_err(progressdb_core::Error::from)?;
        Ok(thread_key)
    })?;

    let page = paginate(&live, &request);
    let mut threads = Vec::with_capacity(page.keys.len());
    for rel_key in &page.keys {
        let (_, thread_key) = parse_user_owns_thread(rel_key).map_err(progressdb_core::Error::from)?;
        if let Some(raw) = state.stores.storedb.get(thread_key.as_bytes())? {
            let thread: Thread = serde_json::from_slice(&raw)?;
            threads.push(ThreadView::from(&thread));
        }
    }
    crate::hydrate::apply_post_hydration_sort(&mut threads, &request, |t| t.updated_ts);

    let next = page.keys.last().filter(|_| page.has_after).map(|k| opaque::encode(k));
    let prev = page.keys.first().filter(|_| page.has_before).map(|k| opaque::encode(k));
    Ok(Json(ThreadListResponse { threads, pagination: PaginationMeta { has_before: page.has_before, has_after: page.has_after, next, prev } }))
}

/// `GET /v1/threads/{threadKey}`.
pub async fn get_thread(State(state): State<AppState>, _auth: AuthContext, Path(thread_key): Path<String>) -> Result<Json<ThreadResponse>> {
    let final_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let raw = state
        .stores
        .storedb
        .get(final_key.as_bytes())?
        .ok_or_else(|| progressdb_core::Error::NotFound(final_key.clone()))?;
    let thread: Thread = serde_json::from_slice(&raw)?;
    if thread.deleted {
        return Err(ApiError::Core(progressdb_core::Error::NotFound(final_key)));
    }
    Ok(Json(ThreadResponse { thread: ThreadView::from(&thread) }))
}

/// `PUT /v1/threads/{threadKey}`.
pub async fn update_thread(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(thread_key): Path<String>,
    Json(req): Json<UpdateThreadRequest>,
) -> Result<StatusCode> {
    let final_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    let op = QueueOp {
        handler: Handler::ThreadUpdate,
        payload: Payload::ThreadUpdate { thread_key: final_key, title: req.title, slug: req.slug },
        ts: next_ns(),
        extras: req_extras(&auth),
    };
    state.ingest.enqueue(op)?;
    Ok(StatusCode::ACCEPTED)
}

/// `DELETE /v1/threads/{threadKey}`.
pub async fn delete_thread(State(state): State<AppState>, auth: AuthContext, Path(thread_key): Path<String>) -> Result<StatusCode> {
    let final_key = state.inflight.resolve_or_wait(&thread_key, state.resolve_timeout).await?;
    // Fail fast on an already soft-deleted thread rather than enqueueing a
    // redundant delete.
    if state.stores.indexdb.get(gen_softdel_key(&final_key).as_bytes())?.is_some() {
        return Err(ApiError::Core(progressdb_core::Error::NotFound(final_key)));
    }
    let op = QueueOp {
        handler: Handler::ThreadDelete,
        payload: Payload::ThreadDelete { thread_key: final_key },
        ts: next_ns(),
        extras: req_extras(&auth),
    };
    state.ingest.enqueue(op)?;
    Ok(StatusCode::ACCEPTED)
}
