//! Pagination types for list queries.
//!
//! Folio pages never issue a separate `COUNT(*)`. A page query fetches
//! `limit + 1` rows; the extra row, if present, only signals that another
//! page exists and is dropped before the page is returned.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_PAGE_SIZE: u64 = 20;
/// Maximum page size.
const MAX_PAGE_SIZE: u64 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl PageRequest {
    /// Create a new page request, clamped to the built-in bounds.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self::bounded(page, page_size, MAX_PAGE_SIZE)
    }

    /// Create a new page request with a caller-supplied page size ceiling.
    pub fn bounded(page: u64, page_size: u64, max_page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, max_page_size.max(1)),
        }
    }

    /// Calculate the SQL `OFFSET` value, saturating for absurd page numbers.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// The `LIMIT` to query with: one more than the page size.
    pub fn overfetch_limit(&self) -> u64 {
        self.page_size + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T: Serialize> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Current page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Whether another page follows this one.
    pub has_more: bool,
}

impl<T: Serialize> PageResponse<T> {
    /// Build a page from rows fetched with [`PageRequest::overfetch_limit`].
    pub fn from_overfetched(mut items: Vec<T>, request: &PageRequest) -> Self {
        let page_size = request.page_size as usize;
        let has_more = items.len() > page_size;
        items.truncate(page_size);
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            has_more,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}
