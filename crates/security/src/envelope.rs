//! Encrypt/decrypt a message body under the policy configured for a
//! thread.

use serde_json::Value;

use progressdb_wire::Kms;

use crate::config::EncryptionPolicy;
use crate::error::{Result, SecurityError};
use crate::fieldpath;

const ENC_TAG: &str = "gcm";

fn wrap(ciphertext: &[u8]) -> Value {
    serde_json::json!({
        "_enc": ENC_TAG,
        "v": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, ciphertext),
    })
}

fn unwrap(value: &Value) -> Result<Vec<u8>> {
    let obj = value
        .as_object()
        .ok_or_else(|| SecurityError::MalformedEnvelope("expected an object".into()))?;
    match obj.get("_enc").and_then(Value::as_str) {
        Some(ENC_TAG) => {}
        other => return Err(SecurityError::MalformedEnvelope(format!("unexpected _enc tag: {other:?}"))),
    }
    let v = obj
        .get("v")
        .and_then(Value::as_str)
        .ok_or_else(|| SecurityError::MalformedEnvelope("missing v".into()))?;
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, v)
        .map_err(|e| SecurityError::MalformedEnvelope(format!("bad base64: {e}")))
}

/// Whether `value` looks like an envelope this module produced, as
/// opposed to plaintext that happens to be an object.
pub fn is_envelope(value: &Value) -> bool {
    value.as_object().and_then(|o| o.get("_enc")).and_then(Value::as_str) == Some(ENC_TAG)
}

/// Encrypt `body` in place per `policy`, using the DEK named by `key_id`.
/// `aad` authenticates the ciphertext against its context (typically the
/// message key).
pub async fn encrypt_body(
    kms: &dyn Kms,
    policy: &EncryptionPolicy,
    key_id: &str,
    aad: &[u8],
    body: Value,
) -> Result<Value> {
    match policy {
        EncryptionPolicy::Disabled => Ok(body),
        EncryptionPolicy::WholeBody => {
            let plaintext = serde_json::to_vec(&body)?;
            let ciphertext = kms.encrypt_with_dek(key_id, &plaintext, aad).await?;
            Ok(wrap(&ciphertext))
        }
        EncryptionPolicy::FieldPolicy { fields } => {
            let mut body = body;
            for field in fields {
                let Some(leaf) = fieldpath::get_mut(&mut body, field) else { continue };
                if is_envelope(leaf) {
                    continue; // already encrypted; don't double-wrap
                }
                let plaintext = serde_json::to_vec(leaf)?;
                let ciphertext = kms.encrypt_with_dek(key_id, &plaintext, aad).await?;
                *leaf = wrap(&ciphertext);
            }
            Ok(body)
        }
    }
}

/// Inverse of [`encrypt_body`]. `body` is assumed to be exactly what a
/// prior `encrypt_body` call under the same policy produced.
pub async fn decrypt_body(
    kms: &dyn Kms,
    policy: &EncryptionPolicy,
    key_id: &str,
    aad: &[u8],
    body: Value,
) -> Result<Value> {
    match policy {
        EncryptionPolicy::Disabled => Ok(body),
        EncryptionPolicy::WholeBody => {
            if !is_envelope(&body) {
                // Body was written before encryption was turned on; pass through.
                return Ok(body);
            }
            let ciphertext = unwrap(&body)?;
            let plaintext = kms.decrypt_with_dek(key_id, &ciphertext, aad).await?;
            Ok(serde_json::from_slice(&plaintext)?)
        }
        EncryptionPolicy::FieldPolicy { fields } => {
            let mut body = body;
            for field in fields {
                let Some(leaf) = fieldpath::get_mut(&mut body, field) else { continue };
                if !is_envelope(leaf) {
                    continue;
                }
                let ciphertext = unwrap(leaf)?;
                let plaintext = kms.decrypt_with_dek(key_id, &ciphertext, aad).await?;
                *leaf = serde_json::from_slice(&plaintext)?;
            }
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progressdb_wire::FakeKms;
    use serde_json::json;

    #[tokio::test]
    async fn whole_body_roundtrips() {
        let kms = FakeKms::new();
        let dek = kms.create_dek_for_thread("t1").await.unwrap();
        let body = json!({"text": "hello", "n": 3});
        let enc = encrypt_body(&kms, &EncryptionPolicy::WholeBody, &dek.key_id, b"aad", body.clone())
            .await
            .unwrap();
        assert!(is_envelope(&enc));
        let dec = decrypt_body(&kms, &EncryptionPolicy::WholeBody, &dek.key_id, b"aad", enc).await.unwrap();
        assert_eq!(dec, body);
    }

    #[tokio::test]
    async fn field_policy_only_touches_named_fields() {
        let kms = FakeKms::new();
        let dek = kms.create_dek_for_thread("t1").await.unwrap();
        let policy = EncryptionPolicy::FieldPolicy { fields: vec!["content.text".into()] };
        let body = json!({"content": {"text": "secret"}, "public_flag": true});
        let enc = encrypt_body(&kms, &policy, &dek.key_id, b"aad", body.clone()).await.unwrap();
        assert!(is_envelope(&enc["content"]["text"]));
        assert_eq!(enc["public_flag"], json!(true));
        let dec = decrypt_body(&kms, &policy, &dek.key_id, b"aad", enc).await.unwrap();
        assert_eq!(dec, body);
    }

    #[tokio::test]
    async fn disabled_policy_is_a_no_op() {
        let kms = FakeKms::new();
        let body = json!({"text": "plain"});
        let enc = encrypt_body(&kms, &EncryptionPolicy::Disabled, "unused", b"", body.clone()).await.unwrap();
        assert_eq!(enc, body);
    }
}
