//! Entity types stored behind the key codec: threads, messages, message
//! versions and the per-thread counters that drive sequence assignment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum length, in bytes, of an author identifier.
pub const MAX_AUTHOR_LEN: usize = 128;

/// Validate an author id: non-empty, printable, at most [`MAX_AUTHOR_LEN`]
/// bytes.
pub fn validate_author(author: &str) -> Result<()> {
    if author.is_empty() || author.len() > MAX_AUTHOR_LEN {
        return Err(Error::Validation(format!(
            "author must be 1..={MAX_AUTHOR_LEN} bytes, got {}",
            author.len()
        )));
    }
    if !author.chars().all(|c| !c.is_control()) {
        return Err(Error::Validation("author must be printable".into()));
    }
    Ok(())
}

/// The KMS-side bookkeeping a thread carries once encryption has been
/// provisioned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadKms {
    /// Opaque identifier the KMS uses to find the thread's DEK.
    pub key_id: String,
    /// The DEK, wrapped under the current KEK, base64-encoded.
    pub wrapped_dek: String,
    /// Identifier of the KEK that wrapped `wrapped_dek`.
    pub kek_id: String,
    /// Version of that KEK, bumped on rewrap.
    pub kek_version: u32,
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Final or provisional key, as currently known.
    pub key: String,
    /// The single owning author.
    pub author: String,
    /// Human-readable title.
    pub title: String,
    /// URL-safe slug derived from the title.
    pub slug: String,
    /// Nanosecond creation timestamp.
    pub created_ts: i64,
    /// Nanosecond timestamp of the last metadata update.
    pub updated_ts: i64,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Nanosecond timestamp at which the thread was soft-deleted.
    pub deleted_ts: Option<i64>,
    /// Encryption bookkeeping, present once a DEK has been provisioned.
    pub kms: Option<ThreadKms>,
    /// The last sequence number assigned to a message in this thread.
    pub last_seq: u64,
}

impl Thread {
    /// Construct a brand-new thread at the given key/timestamp.
    pub fn new(key: String, author: String, title: String, slug: String, now_ns: i64) -> Self {
        Self {
            key,
            author,
            title,
            slug,
            created_ts: now_ns,
            updated_ts: now_ns,
            deleted: false,
            deleted_ts: None,
            kms: None,
            last_seq: 0,
        }
    }
}

/// A single message. `body` is treated as an opaque JSON value everywhere
/// except where field-policy encryption names specific paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Final or provisional key, as currently known.
    pub key: String,
    /// The thread this message belongs to (final key).
    pub thread: String,
    /// The author of this version of the message.
    pub author: String,
    /// Arbitrary JSON payload. May be the ciphertext envelope described in
    /// the encryption envelope design rather than plaintext.
    pub body: serde_json::Value,
    /// Reactions: identity -> reaction token.
    pub reactions: HashMap<String, String>,
    /// Logical event timestamp (nanoseconds), set at write time.
    pub ts: i64,
    /// Creation timestamp of the message as a whole (first version).
    pub created_ts: i64,
    /// Timestamp this specific version was written.
    pub updated_ts: i64,
    /// Whether this version represents a soft delete.
    pub deleted: bool,
}

/// One append-only snapshot of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageVersion {
    /// The version's sequence number within the message's version stream.
    pub seq: u64,
    /// The message snapshot at this version.
    pub message: Message,
}

/// Per-thread counters driving sequence assignment and compact timestamp
/// reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessageIndexes {
    /// First live sequence number (0 if the thread has never had a
    /// message purged from its head).
    pub start: u64,
    /// The next sequence number to hand out is `end + 1`; `end` never
    /// decreases.
    pub end: u64,
    /// Per-version creation-time deltas against the previous entry,
    /// indexed by position in the append order.
    pub cdeltas: Vec<i64>,
    /// Per-version update-time deltas against the previous entry.
    pub udeltas: Vec<i64>,
    /// Sequence numbers that correspond to deleted messages, so readers
    /// can distinguish a gap from data loss.
    pub skips: Vec<u64>,
    /// Wall-clock of the last recorded creation.
    pub last_created_at: i64,
    /// Wall-clock of the last recorded update.
    pub last_updated_at: i64,
}

impl ThreadMessageIndexes {
    /// A fresh, empty counter set for a newly created thread.
    pub fn new() -> Self {
        Self {
            start: 0,
            end: 0,
            cdeltas: Vec::new(),
            udeltas: Vec::new(),
            skips: Vec::new(),
            last_created_at: 0,
            last_updated_at: 0,
        }
    }

    /// The sequence number the next `SaveMessage` create should use.
    pub fn next_seq(&self) -> u64 {
        self.end + 1
    }

    /// Record a brand-new message at `self.next_seq()`, advancing `end`
    /// and appending delta entries against the last recorded times.
    pub fn record_create(&mut self, now_ns: i64) -> u64 {
        let seq = self.next_seq();
        let cdelta = if self.last_created_at == 0 { 0 } else { now_ns - self.last_created_at };
        self.cdeltas.push(cdelta);
        self.udeltas.push(0);
        self.last_created_at = now_ns;
        self.last_updated_at = now_ns;
        self.end = seq;
        seq
    }

    /// Record an update-in-place delta (a new version of an existing
    /// message, not a new message).
    pub fn record_update(&mut self, now_ns: i64) {
        let udelta = if self.last_updated_at == 0 { 0 } else { now_ns - self.last_updated_at };
        self.udeltas.push(udelta);
        self.last_updated_at = now_ns;
    }

    /// Mark a sequence number as belonging to a deleted message so a
    /// reader can tell a gap from corruption.
    pub fn record_skip(&mut self, seq: u64) {
        if let Err(pos) = self.skips.binary_search(&seq) {
            self.skips.insert(pos, seq);
        }
    }

    /// Whether `seq` is recorded as a skipped (deleted) message.
    pub fn is_skipped(&self, seq: u64) -> bool {
        self.skips.binary_search(&seq).is_ok()
    }
}

impl Default for ThreadMessageIndexes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_validation_rejects_empty_and_oversized() {
        assert!(validate_author("").is_err());
        assert!(validate_author(&"a".repeat(MAX_AUTHOR_LEN + 1)).is_err());
        assert!(validate_author("u1").is_ok());
    }

    #[test]
    fn sequence_assignment_never_decreases() {
        let mut idx = ThreadMessageIndexes::new();
        let s1 = idx.record_create(100);
        let s2 = idx.record_create(200);
        assert_eq!(s1, 1);
        assert_eq!(s2, 2);
        assert!(idx.end >= s2);
    }

    #[test]
    fn skip_tracking_is_idempotent_and_sorted() {
        let mut idx = ThreadMessageIndexes::new();
        idx.record_skip(5);
        idx.record_skip(2);
        idx.record_skip(5);
        assert_eq!(idx.skips, vec![2, 5]);
        assert!(idx.is_skipped(5));
        assert!(!idx.is_skipped(3));
    }
}
