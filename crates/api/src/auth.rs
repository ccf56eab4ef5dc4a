//! Authentication/authorization stub.
//!
//! Real request signing and the identity provider it depends on are a
//! separate collaborator system; this extractor only reads the headers
//! that collaborator is expected to set (`X-User-Id`, `X-Role`,
//! `X-Signature`) and passes them through. It does not verify the
//! signature — that's the seam where a real verifier plugs in.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

const USER_HEADER: &str = "x-user-id";
const ROLE_HEADER: &str = "x-role";
const SIGNATURE_HEADER: &str = "x-signature";

/// The caller's role, used to gate backend/admin-only behavior
/// (`include_deleted`, `/v1/_sign`, `/admin/**`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// An ordinary end user.
    User,
    /// An operator with administrative visibility.
    Admin,
    /// A trusted backend service.
    Backend,
}

impl Role {
    fn parse(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            "backend" => Role::Backend,
            _ => Role::User,
        }
    }

    /// Whether this role may set `include_deleted=true` or call
    /// backend-only endpoints.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Backend)
    }
}

/// Authenticated request context, extracted from headers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Identity performing the request.
    pub user_id: String,
    /// The caller's role.
    pub role: Role,
    /// Opaque signature, unverified here.
    pub signature: Option<String>,
}

/// Rejection returned when required auth headers are absent.
pub struct MissingAuth;

impl IntoResponse for MissingAuth {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "missing X-User-Id header").into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = MissingAuth;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(MissingAuth)?;
        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(Role::parse)
            .unwrap_or(Role::User);
        let signature = parts.headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);
        Ok(AuthContext { user_id, role, signature })
    }
}
