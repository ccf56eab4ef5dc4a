//! Reading a message's version history back out of the index store.
//!
//! Versions are written once per create/update/delete under
//! `v:<messageKey>:<seq>` (fixed-width `seq`, so key order already matches
//! sequence order) and are otherwise never trimmed, so this is a plain
//! ascending prefix scan.

use progressdb_core::entity::MessageVersion;
use progressdb_storage::LsmStore;

use crate::error::{EngineError, Result};

/// List every version of `message_key`, oldest first. The last element is
/// the message's current state, including a soft-delete version if the
/// message has been deleted.
pub fn list_message_versions(index_store: &LsmStore, message_key: &str) -> Result<Vec<MessageVersion>> {
    let prefix = progressdb_core::key::gen_all_message_versions_prefix(message_key);
    let entries = index_store.iter_prefix(prefix.as_bytes(), false)?;
    if entries.is_empty() {
        return Err(EngineError::Core(progressdb_core::Error::NotFound(message_key.to_string())));
    }
    entries.into_iter().map(|(_, raw)| Ok(serde_json::from_slice::<MessageVersion>(&raw)?)).collect()
}
