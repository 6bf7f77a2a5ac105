//! Bounding of list requests.

use docrepo_core::result::AppResult;
use docrepo_core::types::document::{ID_FIELD, KEY_FIELD};
use docrepo_core::types::options::FindOptions;
use docrepo_core::types::pagination::{ListOptions, Page};
use docrepo_core::types::projection::Projection;
use docrepo_core::types::sorting::SortSpec;

/// Page size used when the requested one is missing or out of bounds.
pub const DEFAULT_LIMIT: u64 = 50;

/// Largest page size a caller may request.
pub const MAX_LIMIT: u64 = 50;

/// A list request with every parameter resolved and bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    /// Page size, in `1..=MAX_LIMIT`.
    pub limit: u64,
    /// Page number, at least 1.
    pub page: u64,
    /// Documents to skip: `limit * (page - 1)`.
    pub skip: u64,
    /// Sort with the public identifier rewritten to the store key.
    pub sort: SortSpec,
    /// Field selection; `None` selects every field.
    pub projection: Option<Projection>,
}

impl ListPlan {
    /// Resolve caller options into a bounded plan.
    ///
    /// A limit outside `1..=MAX_LIMIT` silently becomes [`DEFAULT_LIMIT`]
    /// and a page below 1 becomes 1. Only a malformed field selection is
    /// an error.
    pub fn resolve(options: &ListOptions) -> AppResult<Self> {
        let limit = match options.limit {
            Some(limit) if (1..=MAX_LIMIT as i64).contains(&limit) => limit as u64,
            _ => DEFAULT_LIMIT,
        };
        let page = match options.page {
            Some(page) if page >= 1 => page as u64,
            _ => 1,
        };

        let sort = rewrite_sort(options.sort.as_deref().unwrap_or(ID_FIELD));
        let projection = match options.fields.as_deref() {
            Some(fields) => Projection::parse(&select_fields(fields))?,
            None => None,
        };

        Ok(Self {
            limit,
            page,
            skip: limit.saturating_mul(page - 1),
            sort: SortSpec::parse(&sort),
            projection,
        })
    }

    /// Store options for the page fetch.
    pub fn find_options(&self) -> FindOptions {
        FindOptions {
            sort: (!self.sort.is_empty()).then(|| self.sort.clone()),
            skip: Some(self.skip),
            limit: Some(self.limit),
        }
    }

    /// Wrap fetched items in a page envelope.
    pub fn into_page<T>(self, data: Vec<T>, total: u64) -> Page<T> {
        Page::new(data, total, self.limit, self.page)
    }
}

/// Point a sort expression's `id` keys at `_id`.
///
/// Left untouched when the expression already names `_id`. Each key keeps
/// its direction prefix, so `"-id name"` becomes `"-_id name"`.
pub fn rewrite_sort(expression: &str) -> String {
    let tokens: Vec<&str> = expression
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .collect();
    let field = |token: &str| token.trim_start_matches(['-', '+']).to_string();

    if !tokens.iter().any(|t| field(t) == ID_FIELD) || tokens.iter().any(|t| field(t) == KEY_FIELD) {
        return tokens.join(" ");
    }

    tokens
        .iter()
        .map(|token| {
            if field(token) == ID_FIELD {
                let prefix = &token[..token.len() - ID_FIELD.len()];
                format!("{prefix}{KEY_FIELD}")
            } else {
                (*token).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a comma-joined field list to the space-joined selection syntax.
pub fn select_fields(fields: &str) -> String {
    fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
