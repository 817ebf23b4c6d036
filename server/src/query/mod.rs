//! Query engine for listing, searching, paginating and looking up items.
//!
//! Listing works in one of three modes, picked from the request parameters:
//! - paginated: `page` and `pageSize` both valid, answered with a [`Page`] envelope
//! - limited: legacy `limit`, answered with a bare truncated array
//! - all: the whole filtered collection as a bare array
//!
//! Everything here is synchronous and pure; callers hand in a collection
//! snapshot already loaded from the store.

mod engine;
mod params;

pub use engine::{find_by_id, parse_item_id, query};
pub use params::{ListParams, ParamPolicy};

use serde::Serialize;
use thiserror::Error;

use crate::storage::{Item, ItemId};

/// Errors produced while resolving or answering a query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Invalid query parameter {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },
}

/// How a list request slices the filtered collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Full filtered collection
    All,
    /// First `n` filtered items, legacy clients
    Limit(usize),
    /// 1-indexed page of `page_size` items
    Page { page: usize, page_size: usize },
}

/// A resolved list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive substring matched against item names
    pub search: Option<String>,
    pub mode: ListMode,
}

impl ListQuery {
    pub fn all() -> Self {
        Self {
            search: None,
            mode: ListMode::All,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.is_empty() { None } else { Some(search) };
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.mode = ListMode::Limit(limit);
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.mode = ListMode::Page { page, page_size };
        self
    }
}

/// Pagination envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub data: Vec<Item>,
    /// Matches after filtering, before slicing
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Result of a list request: a bare array or a pagination envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Items(Vec<Item>),
    Page(Page),
}

impl QueryError {
    pub fn not_found(id: ItemId) -> Self {
        QueryError::NotFound(id.to_string())
    }
}

#[cfg(test)]
impl QueryResult {
    /// Items carried by the result regardless of shape
    pub fn items(&self) -> &[Item] {
        match self {
            QueryResult::Items(items) => items,
            QueryResult::Page(page) => &page.data,
        }
    }
}
