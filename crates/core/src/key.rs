//! Key codec: pure, total functions for every key class that lives in the
//! two ordered stores.
//!
//! Every dynamic key component is fixed-width and zero-padded so that
//! lexicographic byte order on the underlying store is identical to
//! numeric order. That equivalence is what lets prefix scans double as
//! time-ordered streams without a secondary index.

use std::fmt;

/// Width of a zero-padded nanosecond timestamp component.
pub const TS_WIDTH: usize = 19;
/// Width of a zero-padded sequence component.
pub const SEQ_WIDTH: usize = 20;

/// Errors raised while building or parsing keys.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum KeyError {
    /// The key did not match any known key class.
    #[error("unrecognized key format: {0:?}")]
    Unrecognized(String),
    /// A numeric component did not parse, or was the wrong width.
    #[error("malformed numeric component in key {0:?}: {1}")]
    MalformedComponent(String, &'static str),
    /// A user-supplied identifier (user id, thread key) failed validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

type Result<T> = std::result::Result<T, KeyError>;

fn format_ts(ts: u64) -> String {
    format!("{:0width$}", ts, width = TS_WIDTH)
}

fn format_seq(seq: u64) -> String {
    format!("{:0width$}", seq, width = SEQ_WIDTH)
}

fn parse_fixed_width(s: &str, width: usize, full_key: &str) -> Result<u64> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KeyError::MalformedComponent(full_key.to_string(), "expected fixed-width digits"));
    }
    s.parse::<u64>()
        .map_err(|_| KeyError::MalformedComponent(full_key.to_string(), "not a valid u64"))
}

/// Build the final thread key: `t:<threadTS>`.
pub fn gen_thread_key(thread_ts: u64) -> String {
    format!("t:{}", format_ts(thread_ts))
}

/// Build the provisional thread key returned to the client before the
/// worker finalizes the create: `t:prv:<threadTS>`.
pub fn gen_thread_prov_key(ts: u64) -> String {
    format!("t:prv:{}", format_ts(ts))
}

/// Extract the numeric thread timestamp from a final or provisional thread
/// key, a message key, or a messages-prefix key.
fn thread_ts_of(thread_key: &str) -> Result<u64> {
    let parsed = parse_key(thread_key)?;
    parsed
        .thread_ts
        .ok_or_else(|| KeyError::InvalidIdentifier(format!("{thread_key:?} has no thread component")))
}

/// Build a message key: `m:<threadTS>:<seq>`.
pub fn gen_message_key(thread_key: &str, seq: u64) -> Result<String> {
    let ts = thread_ts_of(thread_key)?;
    Ok(format!("m:{}:{}", format_ts(ts), format_seq(seq)))
}

/// Build a provisional message key: `m:prv:<threadTS>:<ts>`.
pub fn gen_message_prov_key(thread_key: &str, ts: u64) -> Result<String> {
    let thread_ts = thread_ts_of(thread_key)?;
    Ok(format!("m:prv:{}:{}", format_ts(thread_ts), format_ts(ts)))
}

/// Build the prefix that covers every message belonging to a thread:
/// `m:<threadTS>:`.
pub fn gen_all_thread_messages_prefix(thread_key: &str) -> Result<String> {
    let ts = thread_ts_of(thread_key)?;
    Ok(format!("m:{}:", format_ts(ts)))
}

/// Build the key to seek to in order to land on the first message with
/// `seq >= seq`. Because sequences are fixed-width, this is simply the
/// message key at that sequence: the store's lower-bound seek lands on it
/// if present, or the first key after it otherwise.
pub fn gen_thread_messages_ge_prefix(thread_key: &str, seq: u64) -> Result<String> {
    gen_message_key(thread_key, seq)
}

/// Build a message-version key in the index store: `v:<messageKey>:<seq>`.
pub fn gen_message_version_key(message_key: &str, seq: u64) -> String {
    format!("v:{}:{}", message_key, format_seq(seq))
}

/// Build the prefix covering every version of a message: `v:<messageKey>:`.
pub fn gen_all_message_versions_prefix(message_key: &str) -> String {
    format!("v:{}:", message_key)
}

/// Build the `user owns thread` relationship key.
pub fn gen_rel_user_thread_key(user_id: &str, thread_ts: u64) -> String {
    format!("rel:u:{}:t:{}", user_id, format_ts(thread_ts))
}

/// Build the `thread has user` relationship key.
pub fn gen_rel_thread_user_key(thread_ts: u64, user_id: &str) -> String {
    format!("rel:t:{}:u:{}", format_ts(thread_ts), user_id)
}

/// Build the prefix covering every thread a user owns: `rel:u:<userID>:t:`.
pub fn gen_rel_user_threads_prefix(user_id: &str) -> String {
    format!("rel:u:{}:t:", user_id)
}

/// Build the prefix covering a thread's owner relationship record(s):
/// `rel:t:<threadTS>:u:`. A thread has exactly one owner, but scanning by
/// prefix lets the retention sweep recover it without reading `storedb`.
pub fn gen_rel_thread_user_prefix(thread_ts: u64) -> String {
    format!("rel:t:{}:u:", format_ts(thread_ts))
}

/// Build the soft-delete marker key for any target key (thread or
/// message).
pub fn gen_softdel_key(target_key: &str) -> String {
    format!("softdel:{}", target_key)
}

/// The prefix that covers every soft-delete marker, used by the retention
/// sweep.
pub const SOFTDEL_PREFIX: &str = "softdel:";

/// Build the key under which a thread's `ThreadMessageIndexes` counters
/// live in `indexdb`.
pub fn gen_thread_indexes_key(thread_key: &str) -> String {
    format!("idx:{}", thread_key)
}

/// Discriminates the key classes understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// `t:<threadTS>`
    Thread,
    /// `t:prv:<ts>`
    ThreadProv,
    /// `m:<threadTS>:<seq>`
    Message,
    /// `m:prv:<threadTS>:<ts>`
    MessageProv,
    /// `v:<messageKey>:<seq>`
    MessageVersion,
    /// `rel:u:<userID>:t:<threadTS>`
    RelUserThread,
    /// `rel:t:<threadTS>:u:<userID>`
    RelThreadUser,
    /// `softdel:<targetKey>`
    SoftDelete,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyKind::Thread => "thread",
            KeyKind::ThreadProv => "thread_prov",
            KeyKind::Message => "message",
            KeyKind::MessageProv => "message_prov",
            KeyKind::MessageVersion => "message_version",
            KeyKind::RelUserThread => "rel_user_thread",
            KeyKind::RelThreadUser => "rel_thread_user",
            KeyKind::SoftDelete => "softdel",
        };
        f.write_str(s)
    }
}

/// The decomposed fields of a parsed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// Which key class this is.
    pub kind: KeyKind,
    /// The thread timestamp component, when the key class has one.
    pub thread_ts: Option<u64>,
    /// The sequence component, when the key class has one.
    pub seq: Option<u64>,
    /// The user id component, when the key class has one.
    pub user_id: Option<String>,
    /// For soft-delete markers, the target key they mark.
    pub target_key: Option<String>,
}

/// Parse any recognized key into its typed components.
pub fn parse_key(key: &str) -> Result<ParsedKey> {
    if let Some(rest) = key.strip_prefix("t:prv:") {
        let ts = parse_fixed_width(rest, TS_WIDTH, key)?;
        return Ok(ParsedKey { kind: KeyKind::ThreadProv, thread_ts: Some(ts), seq: None, user_id: None, target_key: None });
    }
    if let Some(rest) = key.strip_prefix("t:") {
        let ts = parse_fixed_width(rest, TS_WIDTH, key)?;
        return Ok(ParsedKey { kind: KeyKind::Thread, thread_ts: Some(ts), seq: None, user_id: None, target_key: None });
    }
    if let Some(rest) = key.strip_prefix("m:prv:") {
        let mut parts = rest.splitn(2, ':');
        let ts_s = parts.next().ok_or_else(|| KeyError::Unrecognized(key.to_string()))?;
        let prov_ts_s = parts.next().ok_or_else(|| KeyError::Unrecognized(key.to_string()))?;
        let thread_ts = parse_fixed_width(ts_s, TS_WIDTH, key)?;
        let prov_ts = parse_fixed_width(prov_ts_s, TS_WIDTH, key)?;
        return Ok(ParsedKey { kind: KeyKind::MessageProv, thread_ts: Some(thread_ts), seq: Some(prov_ts), user_id: None, target_key: None });
    }
    if let Some(rest) = key.strip_prefix("m:") {
        let mut parts = rest.splitn(2, ':');
        let ts_s = parts.next().ok_or_else(|| KeyError::Unrecognized(key.to_string()))?;
        let seq_s = parts.next().ok_or_else(|| KeyError::Unrecognized(key.to_string()))?;
        let thread_ts = parse_fixed_width(ts_s, TS_WIDTH, key)?;
        let seq = parse_fixed_width(seq_s, SEQ_WIDTH, key)?;
        return Ok(ParsedKey { kind: KeyKind::Message, thread_ts: Some(thread_ts), seq: Some(seq), user_id: None, target_key: None });
    }
    if let Some(rest) = key.strip_prefix("v:") {
        // v:<messageKey>:<seq> — messageKey itself may contain ':', so split
        // from the right on the final fixed-width sequence component.
        if rest.len() > SEQ_WIDTH + 1 {
            let split_at = rest.len() - SEQ_WIDTH;
            let (message_key_part, seq_part) = rest.split_at(split_at);
            if let Some(message_key) = message_key_part.strip_suffix(':') {
                let seq = parse_fixed_width(seq_part, SEQ_WIDTH, key)?;
                let inner = parse_key(message_key)?;
                return Ok(ParsedKey {
                    kind: KeyKind::MessageVersion,
                    thread_ts: inner.thread_ts,
                    seq: Some(seq),
                    user_id: None,
                    target_key: Some(message_key.to_string()),
                });
            }
        }
        return Err(KeyError::Unrecognized(key.to_string()));
    }
    if let Some(rest) = key.strip_prefix("rel:u:") {
        let idx = rest.find(":t:").ok_or_else(|| KeyError::Unrecognized(key.to_string()))?;
        let user_id = &rest[..idx];
        let ts_s = &rest[idx + 3..];
        let thread_ts = parse_fixed_width(ts_s, TS_WIDTH, key)?;
        return Ok(ParsedKey { kind: KeyKind::RelUserThread, thread_ts: Some(thread_ts), seq: None, user_id: Some(user_id.to_string()), target_key: None });
    }
    if let Some(rest) = key.strip_prefix("rel:t:") {
        let idx = rest.find(":u:").ok_or_else(|| KeyError::Unrecognized(key.to_string()))?;
        let ts_s = &rest[..idx];
        let user_id = &rest[idx + 3..];
        let thread_ts = parse_fixed_width(ts_s, TS_WIDTH, key)?;
        return Ok(ParsedKey { kind: KeyKind::RelThreadUser, thread_ts: Some(thread_ts), seq: None, user_id: Some(user_id.to_string()), target_key: None });
    }
    if let Some(rest) = key.strip_prefix(SOFTDEL_PREFIX) {
        let inner = parse_key(rest)?;
        return Ok(ParsedKey { kind: KeyKind::SoftDelete, thread_ts: inner.thread_ts, seq: inner.seq, user_id: None, target_key: Some(rest.to_string()) });
    }
    Err(KeyError::Unrecognized(key.to_string()))
}

/// Parse a `rel:u:<userID>:t:<threadTS>` key into `(user_id, thread key)`.
pub fn parse_user_owns_thread(key: &str) -> Result<(String, String)> {
    let parsed = parse_key(key)?;
    if parsed.kind != KeyKind::RelUserThread {
        return Err(KeyError::Unrecognized(key.to_string()));
    }
    let user_id = parsed.user_id.expect("RelUserThread always has a user_id");
    let thread_ts = parsed.thread_ts.expect("RelUserThread always has a thread_ts");
    Ok((user_id, gen_thread_key(thread_ts)))
}

/// Extract just the thread timestamp from any key that carries one.
pub fn parse_key_timestamp(key: &str) -> Result<u64> {
    thread_ts_of(key)
}

/// Extract just the sequence component from a message or message-version
/// key.
pub fn parse_key_sequence(key: &str) -> Result<u64> {
    let parsed = parse_key(key)?;
    parsed
        .seq
        .ok_or_else(|| KeyError::InvalidIdentifier(format!("{key:?} has no sequence component")))
}

/// Accept a thread key in either final or provisional form.
pub fn validate_thread_key(key: &str) -> Result<()> {
    match parse_key(key)?.kind {
        KeyKind::Thread | KeyKind::ThreadProv => Ok(()),
        _ => Err(KeyError::Unrecognized(key.to_string())),
    }
}

/// Accept a message key in either final or provisional form.
pub fn validate_message_key(key: &str) -> Result<()> {
    match parse_key(key)?.kind {
        KeyKind::Message | KeyKind::MessageProv => Ok(()),
        _ => Err(KeyError::Unrecognized(key.to_string())),
    }
}

/// `true` if `key` is a provisional key of any class.
pub fn is_provisional(key: &str) -> bool {
    matches!(
        parse_key(key).map(|p| p.kind),
        Ok(KeyKind::ThreadProv) | Ok(KeyKind::MessageProv)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_key_roundtrip() {
        let key = gen_thread_key(42);
        assert_eq!(key, "t:0000000000000000042");
        let parsed = parse_key(&key).unwrap();
        assert_eq!(parsed.kind, KeyKind::Thread);
        assert_eq!(parsed.thread_ts, Some(42));
    }

    #[test]
    fn thread_prov_key_roundtrip() {
        let key = gen_thread_prov_key(7);
        let parsed = parse_key(&key).unwrap();
        assert_eq!(parsed.kind, KeyKind::ThreadProv);
        assert_eq!(parsed.thread_ts, Some(7));
        assert!(validate_thread_key(&key).is_ok());
        assert!(is_provisional(&key));
    }

    #[test]
    fn message_key_roundtrip() {
        let thread = gen_thread_key(1000);
        let key = gen_message_key(&thread, 5).unwrap();
        assert_eq!(key, "m:0000000000000001000:00000000000000000005");
        let parsed = parse_key(&key).unwrap();
        assert_eq!(parsed.kind, KeyKind::Message);
        assert_eq!(parsed.thread_ts, Some(1000));
        assert_eq!(parsed.seq, Some(5));
        assert!(validate_message_key(&key).is_ok());
    }

    #[test]
    fn message_version_key_roundtrip() {
        let thread = gen_thread_key(1000);
        let msg = gen_message_key(&thread, 5).unwrap();
        let vkey = gen_message_version_key(&msg, 2);
        let parsed = parse_key(&vkey).unwrap();
        assert_eq!(parsed.kind, KeyKind::MessageVersion);
        assert_eq!(parsed.seq, Some(2));
        assert_eq!(parsed.target_key.as_deref(), Some(msg.as_str()));
    }

    #[test]
    fn relationship_keys_roundtrip() {
        let ut = gen_rel_user_thread_key("u1", 9);
        let (user, thread) = parse_user_owns_thread(&ut).unwrap();
        assert_eq!(user, "u1");
        assert_eq!(thread, gen_thread_key(9));

        let tu = gen_rel_thread_user_key(9, "u1");
        let parsed = parse_key(&tu).unwrap();
        assert_eq!(parsed.kind, KeyKind::RelThreadUser);
        assert_eq!(parsed.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn softdel_key_roundtrip() {
        let thread = gen_thread_key(9);
        let marker = gen_softdel_key(&thread);
        assert_eq!(marker, format!("softdel:{thread}"));
        let parsed = parse_key(&marker).unwrap();
        assert_eq!(parsed.kind, KeyKind::SoftDelete);
        assert_eq!(parsed.target_key.as_deref(), Some(thread.as_str()));
    }

    #[test]
    fn messages_prefix_is_lexicographic_lower_bound() {
        let thread = gen_thread_key(100);
        let prefix = gen_all_thread_messages_prefix(&thread).unwrap();
        let k1 = gen_message_key(&thread, 1).unwrap();
        let k2 = gen_message_key(&thread, 2).unwrap();
        assert!(k1.starts_with(&prefix));
        assert!(k1 < k2);
    }

    #[test]
    fn ge_prefix_seeks_to_requested_sequence() {
        let thread = gen_thread_key(100);
        let seek = gen_thread_messages_ge_prefix(&thread, 5).unwrap();
        assert_eq!(seek, gen_message_key(&thread, 5).unwrap());
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(parse_key("t:abc").is_err());
        assert!(parse_key("m:1:2:3").is_err());
        assert!(parse_key("bogus").is_err());
    }

    proptest::proptest! {
        #[test]
        fn thread_key_roundtrip_prop(ts in 0u64..1_000_000_000_000_000_000) {
            let key = gen_thread_key(ts);
            let parsed = parse_key(&key).unwrap();
            proptest::prop_assert_eq!(parsed.thread_ts, Some(ts));
        }

        #[test]
        fn message_key_roundtrip_prop(ts in 0u64..1_000_000_000_000_000_000, seq in 0u64..100_000u64) {
            let thread = gen_thread_key(ts);
            let key = gen_message_key(&thread, seq).unwrap();
            let parsed = parse_key(&key).unwrap();
            proptest::prop_assert_eq!(parsed.thread_ts, Some(ts));
            proptest::prop_assert_eq!(parsed.seq, Some(seq));
        }
    }
}
