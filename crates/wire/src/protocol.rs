//! The request/response envelope exchanged with the KMS:
//! `{id, op, params}` in, `{id, ok, result}` or `{id, ok, error}` out.

use serde::{Deserialize, Serialize};

/// A framed request to the KMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Correlates this request with its response; also logged on timeout.
    pub id: String,
    /// Operation name, e.g. `"health"`, `"create_dek_for_thread"`.
    pub op: String,
    /// Operation-specific parameters, encoded generically so the client
    /// doesn't need a variant per op at the framing layer.
    pub params: serde_json::Value,
}

/// A framed response from the KMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Echoes the request id.
    pub id: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Present when `ok` is true.
    pub result: Option<serde_json::Value>,
    /// Present when `ok` is false.
    pub error: Option<ApiError>,
}

/// Application-level error returned by the KMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable error code, e.g. `"unknown_key_id"`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Parameters for `create_dek_for_thread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDekParams {
    /// The thread the DEK will belong to.
    pub thread_id: String,
}

/// Result of `create_dek_for_thread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDekResult {
    /// Opaque identifier the KMS will use to find this DEK again.
    pub key_id: String,
    /// The DEK, wrapped under the current KEK, base64-encoded.
    pub wrapped_dek: String,
    /// Identifier of the KEK that performed the wrap.
    pub kek_id: String,
    /// Version of that KEK.
    pub kek_version: u32,
}

/// Parameters shared by `encrypt_with_dek` / `decrypt_with_dek`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptParams {
    /// Which DEK to use.
    pub key_id: String,
    /// Base64-encoded input (plaintext for encrypt, ciphertext for
    /// decrypt).
    pub data: String,
    /// Base64-encoded additional authenticated data.
    pub aad: String,
}

/// Result of `encrypt_with_dek` / `decrypt_with_dek`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptResult {
    /// Base64-encoded output (ciphertext for encrypt, plaintext for
    /// decrypt).
    pub data: String,
}

/// Parameters for `rewrap_dek_for_thread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewrapParams {
    /// Which DEK to rewrap.
    pub key_id: String,
    /// The new KEK, as hex.
    pub new_kek_hex: String,
}

/// Result of `rewrap_dek_for_thread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewrapResult {
    /// Identifier of the new KEK.
    pub new_kek_id: String,
    /// Version of the new KEK.
    pub new_kek_version: u32,
    /// The DEK, re-wrapped under the new KEK, base64-encoded.
    pub wrapped_dek: String,
}
