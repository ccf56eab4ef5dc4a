//! # progressdb-core
//!
//! Key codec, entity types and the unified error model shared by every
//! other ProgressDB crate. Nothing in this crate performs I/O: every
//! function here is pure and deterministic.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod entity;
pub mod error;
pub mod key;

pub use entity::{validate_author, Message, MessageVersion, Thread, ThreadKms, ThreadMessageIndexes};
pub use error::{Error, ErrorKind, Result};
pub use key::{KeyError, KeyKind, ParsedKey};
