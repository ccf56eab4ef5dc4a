//! # progressdb-storage
//!
//! The ordered key-value engine and the two named stores (`storedb`,
//! `indexdb`) built on it. See [`store::LsmStore`] for the engine and
//! [`stores::Stores`] for the pair the rest of the system opens.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod error;
pub mod store;
pub mod stores;

pub use batch::{Batch, BatchOp};
pub use error::{Result, StorageError};
pub use store::{upper_bound_for_prefix, LsmStore, WriteOpt};
pub use stores::{open_default, StoreDbPaths, Stores};
