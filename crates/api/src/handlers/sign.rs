//! `/v1/_sign` — backend-only signing stub.
//!
//! The real signer is a separate collaborator system (see
//! [`crate::auth`]); this endpoint only exercises the shape backend
//! callers expect, producing a deterministic placeholder rather than a
//! cryptographic signature.

use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::error::{ApiError, Result};

/// Body of `POST /v1/_sign`.
#[derive(Debug, Deserialize)]
pub struct SignRequest {
    /// Identity to sign for.
    pub user_id: String,
}

/// Response of `POST /v1/_sign`.
#[derive(Debug, Serialize)]
pub struct SignResponse {
    /// Echoes the request's `user_id`.
    pub user_id: String,
    /// Placeholder signature.
    pub signature: String,
}

/// `POST /v1/_sign`: backend-only.
pub async fn sign(auth: AuthContext, Json(req): Json<SignRequest>) -> Result<Json<SignResponse>> {
    if !matches!(auth.role, crate::auth::Role::Backend) {
        return Err(ApiError::Forbidden("signing is backend-only".into()));
    }
    let signature = base64::engine::general_purpose::STANDARD.encode(format!("sig:{}", req.user_id));
    Ok(Json(SignResponse { user_id: req.user_id, signature }))
}
