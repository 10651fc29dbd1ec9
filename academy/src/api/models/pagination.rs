//! Shared pagination types for API query parameters.
//!
//! Admin lists use offset pagination with `skip` and `limit`. The public review wall uses
//! one-based pages of a fixed size.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Reviews shown per page on the public review wall.
pub const REVIEWS_PAGE_SIZE: i64 = 12;

/// Offset pagination parameters for admin list endpoints.
///
/// The `limit` is clamped between 1 and 100.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

/// One-based page number, as used by the review wall
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Page number starting at 1 (default: 1)
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page: Option<i64>,
}

impl PageQuery {
    #[inline]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Offset and limit for a page of `page_size` items. Huge page numbers saturate to an empty page.
    #[inline]
    pub fn params(&self, page_size: i64) -> (i64, i64) {
        ((self.page() - 1).saturating_mul(page_size), page_size)
    }
}

/// Paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        let p = Pagination {
            skip: Some(-5),
            limit: Some(1000),
        };
        assert_eq!(p.params(), (0, MAX_LIMIT));
        assert_eq!(Pagination::default().params(), (0, DEFAULT_LIMIT));
    }

    #[test]
    fn test_page_query_offsets() {
        assert_eq!(PageQuery { page: None }.params(REVIEWS_PAGE_SIZE), (0, 12));
        assert_eq!(PageQuery { page: Some(3) }.params(REVIEWS_PAGE_SIZE), (24, 12));
        assert_eq!(PageQuery { page: Some(0) }.params(REVIEWS_PAGE_SIZE), (0, 12));
        assert_eq!(PageQuery { page: Some(i64::MIN) }.params(REVIEWS_PAGE_SIZE), (0, 12));
        assert_eq!(PageQuery { page: Some(i64::MAX) }.params(REVIEWS_PAGE_SIZE), (i64::MAX, 12));
    }
}
