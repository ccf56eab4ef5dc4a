//! Plain opaque-key cursors, used where a page is over raw ordered keys
//! with no thread to cross-check (thread listings, relationship scans).
//! Message listings use [`progressdb_engine::Cursor`] instead, which
//! carries that cross-check.

use base64::Engine;

use crate::error::{ApiError, Result};

/// Encode a raw store key as an opaque cursor string.
pub fn encode(key: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key.as_bytes())
}

/// Decode an opaque cursor string back into a raw store key.
pub fn decode(raw: &str) -> Result<String> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|e| ApiError::BadRequest(format!("invalid cursor: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ApiError::BadRequest(format!("invalid cursor: {e}")))
}
