//! The shape of a pagination request, independent of what it's paginating.

/// Which boundary, if any, anchors this page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// No boundary: the initial, newest-first page.
    None,
    /// Page strictly after this key.
    After(String),
    /// Page strictly before this key.
    Before(String),
    /// Page centered on this key.
    Anchor(String),
}

/// Field a page is conceptually sorted by. Key order already encodes
/// `created_ts`; `updated_ts` requires a post-hydration re-sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    /// Sort by creation time (the default, and the order keys are
    /// already in).
    CreatedTs,
    /// Sort by last-update time; applied after hydration.
    UpdatedTs,
}

impl Default for SortBy {
    fn default() -> Self {
        SortBy::CreatedTs
    }
}

/// Direction for `SortBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// Oldest/earliest first.
    Asc,
    /// Newest/latest first (the default).
    Desc,
}

impl Default for OrderBy {
    fn default() -> Self {
        OrderBy::Desc
    }
}

/// One page request over an ordered key prefix.
#[derive(Debug, Clone)]
pub struct PaginationRequest {
    /// Maximum number of items to return.
    pub limit: usize,
    /// Which boundary anchors the page.
    pub boundary: Boundary,
    /// Conceptual sort field.
    pub sort_by: SortBy,
    /// Sort direction.
    pub order_by: OrderBy,
    /// Whether soft-deleted entries should be included (admin/backend
    /// only).
    pub include_deleted: bool,
}

impl PaginationRequest {
    /// The initial, newest-first page with no boundary.
    pub fn initial(limit: usize) -> Self {
        Self { limit, boundary: Boundary::None, sort_by: SortBy::default(), order_by: OrderBy::default(), include_deleted: false }
    }
}
