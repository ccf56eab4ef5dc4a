//! Query-string shape shared by the thread-listing and message-listing
//! endpoints.

use progressdb_engine::{Boundary, OrderBy, PaginationRequest, SortBy};
use serde::Deserialize;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT_USER: u32 = 200;
const MAX_LIMIT_ADMIN: u32 = 1000;

/// Raw query parameters as axum deserializes them from the URL.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page size; clamped by [`ListQuery::into_request`].
    pub limit: Option<u32>,
    /// Cursor to page forward from (exclusive).
    pub after: Option<String>,
    /// Cursor to page backward from (exclusive).
    pub before: Option<String>,
    /// Cursor to center a page around (inclusive).
    pub anchor: Option<String>,
    /// Field to sort by: `created_ts` (default) or `updated_ts`.
    pub sort_by: Option<String>,
    /// Sort direction: `asc` or `desc` (default).
    pub order_by: Option<String>,
    /// Whether to include soft-deleted entries. Requires a privileged
    /// caller; rejected otherwise by the handler.
    #[serde(default)]
    pub include_deleted: bool,
}

impl ListQuery {
    /// Convert into a validated [`PaginationRequest`], clamping `limit`
    /// to the caller's allowance.
    pub fn into_request(self, is_privileged: bool) -> Result<PaginationRequest, String> {
        let max = if is_privileged { MAX_LIMIT_ADMIN } else { MAX_LIMIT_USER };
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, max);

        let provided = [self.after.is_some(), self.before.is_some(), self.anchor.is_some()];
        if provided.iter().filter(|p| **p).count() > 1 {
            return Err("only one of after, before, anchor may be set".to_string());
        }
        let boundary = if let Some(c) = self.after {
            Boundary::After(c)
        } else if let Some(c) = self.before {
            Boundary::Before(c)
        } else if let Some(c) = self.anchor {
            Boundary::Anchor(c)
        } else {
            Boundary::None
        };

        let sort_by = match self.sort_by.as_deref() {
            None | Some("created_ts") => SortBy::CreatedTs,
            Some("updated_ts") => SortBy::UpdatedTs,
            Some(other) => return Err(format!("unknown sort_by: {other}")),
        };
        let order_by = match self.order_by.as_deref() {
            None | Some("desc") => OrderBy::Desc,
            Some("asc") => OrderBy::Asc,
            Some(other) => return Err(format!("unknown order_by: {other}")),
        };

        if self.include_deleted && !is_privileged {
            return Err("include_deleted requires a privileged caller".to_string());
        }

        Ok(PaginationRequest { limit: limit as usize, boundary, sort_by, order_by, include_deleted: self.include_deleted })
    }
}

/// Query string for a single-resource `GET`, which only ever needs the
/// `include_deleted` escape hatch.
#[derive(Debug, Deserialize)]
pub struct GetQuery {
    /// Whether to return the resource even if it is soft-deleted.
    /// Requires a privileged caller.
    #[serde(default)]
    pub include_deleted: bool,
}

impl GetQuery {
    /// Validate `include_deleted` against the caller's role.
    pub fn into_include_deleted(self, is_privileged: bool) -> Result<bool, String> {
        if self.include_deleted && !is_privileged {
            return Err("include_deleted requires a privileged caller".to_string());
        }
        Ok(self.include_deleted)
    }
}
