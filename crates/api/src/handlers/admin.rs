//! `/metrics` and `/admin/**` — fixed diagnostic JSON, not a real metrics
//! exporter (see the collaborator-interface notes this crate is built
//! against).

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Fixed diagnostic body for `/metrics` and `/admin/**`.
#[derive(Debug, Serialize)]
pub struct Diagnostics {
    storedb_ready: bool,
    indexdb_ready: bool,
    ingest_closed: bool,
    inflight_tracked: usize,
    encryption_enabled: bool,
}

/// `GET /metrics`, `GET /admin/**`.
pub async fn diagnostics(State(state): State<AppState>) -> Json<Diagnostics> {
    Json(Diagnostics {
        storedb_ready: state.stores.storedb.ready(),
        indexdb_ready: state.stores.indexdb.ready(),
        ingest_closed: state.ingest.is_closed(),
        inflight_tracked: state.inflight.len(),
        encryption_enabled: state.policy.is_enabled(),
    })
}
