//! Builds the axum `Router` wiring every route to its handler and layers
//! tracing over the whole stack.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, messages, sign, threads};
use crate::state::AppState;

/// Build the full router over `state`. Callers add `tower_http::cors`
/// (and, in front of a real deployment, auth/rate-limit middleware) as
/// additional layers — the slot is here, left for the operator to fill.
pub fn build(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/threads", post(threads::create_thread).get(threads::list_threads))
        .route(
            "/threads/:thread_key",
            get(threads::get_thread).put(threads::update_thread).delete(threads::delete_thread),
        )
        .route(
            "/threads/:thread_key/messages",
            post(messages::create_message).get(messages::list_messages),
        )
        .route(
            "/threads/:thread_key/messages/:message_key",
            get(messages::get_message).put(messages::update_message).delete(messages::delete_message),
        )
        .route("/threads/:thread_key/messages/:message_key/versions", get(messages::list_message_versions))
        .route("/_sign", post(sign::sign));

    Router::new()
        .nest("/v1", v1)
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(admin::diagnostics))
        .route("/admin/*rest", get(admin::diagnostics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
