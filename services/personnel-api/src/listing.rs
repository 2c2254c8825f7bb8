//! Search, sort and pagination shared by every list screen.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("unsupported sort key '{key}'; expected one of: {allowed}")]
    InvalidSort { key: String, allowed: String },
    #[error("order must be 'asc' or 'desc'; got '{0}'")]
    InvalidOrder(String),
    #[error("page must be at least 1")]
    InvalidPage,
}

/// Raw list parameters as they arrive in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A sort key exposed to clients and the column it maps to.
pub type SortKey = (&'static str, &'static str);

#[derive(Debug, Clone, PartialEq)]
pub struct ListSpec {
    pub search: Option<String>,
    pub sort_column: &'static str,
    pub descending: bool,
    pub page: u32,
    pub per_page: u32,
}

impl ListParams {
    /// Validates the parameters against the sort keys a screen supports.
    /// The first entry of `sort_keys` is the default.
    pub fn resolve(&self, sort_keys: &[SortKey]) -> Result<ListSpec, ListingError> {
        let sort_column = match self.sort.as_deref() {
            None | Some("") => sort_keys.first().map(|(_, column)| *column).unwrap_or("rowid"),
            Some(key) => sort_keys
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, column)| *column)
                .ok_or_else(|| ListingError::InvalidSort {
                    key: key.to_string(),
                    allowed: sort_keys
                        .iter()
                        .map(|(name, _)| *name)
                        .collect::<Vec<_>>()
                        .join(", "),
                })?,
        };

        let descending = match self.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("asc") => false,
            Some("desc") => true,
            Some(other) => return Err(ListingError::InvalidOrder(other.to_string())),
        };

        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ListingError::InvalidPage);
        }
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);

        let search = self
            .search
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ListSpec {
            search,
            sort_column,
            descending,
            page,
            per_page,
        })
    }
}

impl ListSpec {
    /// `tie_break` orders rows that share the sort value; it must end on a
    /// unique column so that pages never overlap or skip rows.
    pub fn order_clause(&self, tie_break: &str) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!(" ORDER BY {} {}, {}", self.sort_column, direction, tie_break)
    }

    pub fn limit_clause(&self) -> String {
        let offset = u64::from(self.page - 1) * u64::from(self.per_page);
        format!(" LIMIT {} OFFSET {}", self.per_page, offset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, spec: &ListSpec, total: u64) -> Self {
        Self {
            items,
            page: spec.page,
            per_page: spec.per_page,
            total,
        }
    }
}
