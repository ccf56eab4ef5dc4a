//! Configuration for which parts of a message body get encrypted.

use serde::{Deserialize, Serialize};

/// How message bodies are protected at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EncryptionPolicy {
    /// No encryption; bodies are stored as plain JSON.
    Disabled,
    /// The entire body is serialized and encrypted as one ciphertext blob.
    WholeBody,
    /// Only the named JSON field paths (dot-separated, e.g. `"content.text"`)
    /// are encrypted in place; everything else stays queryable.
    FieldPolicy {
        /// Field paths to encrypt.
        fields: Vec<String>,
    },
}

impl Default for EncryptionPolicy {
    fn default() -> Self {
        EncryptionPolicy::Disabled
    }
}

impl EncryptionPolicy {
    /// Whether this policy requires a thread DEK at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EncryptionPolicy::Disabled)
    }
}
