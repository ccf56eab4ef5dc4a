//! Cursor-based pagination over the ordered key space used by both
//! message listings and thread (relationship) listings. Operates on
//! keys only; hydrating a page into full entities is the caller's job.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod paginate;
pub mod request;
pub mod versions;

pub use cursor::Cursor;
pub use error::{EngineError, Result};
pub use paginate::{collect_live_ascending, paginate, Page};
pub use request::{Boundary, OrderBy, PaginationRequest, SortBy};
pub use versions::list_message_versions;
