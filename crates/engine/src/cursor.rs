//! Opaque pagination cursors for message listings: base64-encoded JSON
//! carrying enough context to both seek and validate the request path.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The decoded contents of a message-listing cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Thread the cursor was issued for; cross-checked against the path
    /// on decode.
    pub thread_key: String,
    /// Nanosecond timestamp of the message the cursor points at.
    pub timestamp: i64,
    /// Sequence number of the message the cursor points at.
    pub sequence: u64,
}

impl Cursor {
    /// Encode as the opaque string handed to clients.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("Cursor always serializes");
        base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, json)
    }

    /// Decode a cursor string, without validating it against a path.
    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, raw)
            .map_err(|e| EngineError::InvalidCursor(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| EngineError::InvalidCursor(e.to_string()))
    }

    /// Decode and require that `thread_key` matches `expected_thread`,
    /// the check the HTTP edge needs before trusting a path-scoped
    /// cursor.
    pub fn decode_for_thread(raw: &str, expected_thread: &str) -> Result<Self> {
        let cursor = Self::decode(raw)?;
        if cursor.thread_key != expected_thread {
            return Err(EngineError::ThreadMismatch { cursor: cursor.thread_key, path: expected_thread.to_string() });
        }
        Ok(cursor)
    }

    /// The message key this cursor's sequence +1 seeks to, per the
    /// seek-forward convention for `After` pagination.
    pub fn next_seek_seq(&self) -> u64 {
        self.sequence + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_encoding() {
        let cursor = Cursor { thread_key: "t:0000000000000000001".into(), timestamp: 42, sequence: 7 };
        let encoded = cursor.encode();
        let decoded = Cursor::decode(&encoded).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn thread_mismatch_is_rejected() {
        let cursor = Cursor { thread_key: "t:0000000000000000001".into(), timestamp: 42, sequence: 7 };
        let encoded = cursor.encode();
        let err = Cursor::decode_for_thread(&encoded, "t:0000000000000000002").unwrap_err();
        assert!(matches!(err, EngineError::ThreadMismatch { .. }));
    }
}
