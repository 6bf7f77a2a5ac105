//! Pagination types for list queries.

use serde::{Deserialize, Serialize};

/// Caller-supplied list request. Every field is optional; the pagination
/// engine fills in and bounds whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Comma-joined field names to select; absent selects all fields.
    #[serde(default)]
    pub fields: Option<String>,
    /// Requested page size.
    #[serde(default)]
    pub limit: Option<i64>,
    /// Requested page number (1-based).
    #[serde(default)]
    pub page: Option<i64>,
    /// Sort expression, e.g. `"name -createdAt"`.
    #[serde(default)]
    pub sort: Option<String>,
}

impl ListOptions {
    /// Request a specific page and size.
    pub fn page(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Set the sort expression.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Set the field selection.
    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }
}

/// Page envelope returned by list queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Documents matching the query before pagination.
    pub total: u64,
    /// Page size actually used.
    pub limit: u64,
    /// Page number actually used (1-based).
    pub page: u64,
    /// `ceil(total / limit)`.
    pub total_pages: u64,
    /// The items on this page.
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Build an envelope; `total_pages` is derived from `total` and `limit`.
    pub fn new(data: Vec<T>, total: u64, limit: u64, page: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total,
            limit,
            page,
            total_pages,
            data,
        }
    }

    /// Convert every item, keeping the envelope.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            total: self.total,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            data: self.data.into_iter().map(f).collect::<Result<_, _>>()?,
        })
    }
}
