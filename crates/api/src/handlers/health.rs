//! `/healthz` and `/readyz`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Body shared by `/healthz` and `/readyz`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    ok: bool,
}

/// Unauthenticated liveness probe: the process is running at all.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Readiness probe: both stores must be open and, if encryption is
/// enabled, the KMS must answer a health check.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let stores_ready = state.stores.ready();
    let kms_ready = if state.policy.is_enabled() { state.kms.health().await.is_ok() } else { true };
    let ok = stores_ready && kms_ready;
    let status = if ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(HealthResponse { ok }))
}
