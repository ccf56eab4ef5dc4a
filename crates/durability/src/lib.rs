//! # progressdb-durability
//!
//! WAL record framing and the group-commit policy the storage layer uses
//! to decide when to fsync. This crate has no notion of keys or values —
//! it only frames bytes and tracks flush timing, so it can be shared
//! between the primary and index stores.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod group_commit;
pub mod mode;
pub mod record;

pub use group_commit::GroupCommitPolicy;
pub use mode::{DurabilityMode, WalConfig};
pub use record::{read_record, write_record, RecordError};
