//! Storage module for the JSON-backed item collection.
//!
//! The backing document is the only source of truth: every read goes to disk
//! and every write replaces the whole document. This module owns the item
//! types as they appear in the document and the store that reads and
//! rewrites it.

mod json_store;

pub use json_store::{ItemStore, StoreError, StoreResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Identifier of a catalog item
pub type ItemId = i64;

/// A catalog entry as stored in the backing document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within the collection
    pub id: ItemId,
    /// Display name, searched case-insensitively
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Display-only category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Fields the server does not interpret, kept so rewrites never drop them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Build the stored item from a candidate and its assigned id.
    ///
    /// A client-supplied `id` is dropped; only the assigned one is kept.
    pub fn from_candidate(id: ItemId, candidate: NewItem) -> Self {
        let mut extra = candidate.extra;
        extra.remove("id");

        Self {
            id,
            name: candidate.name,
            price: candidate.price,
            category: candidate.category,
            extra,
        }
    }
}

/// Candidate item submitted through the write path.
///
/// Missing fields fall back to their defaults; whether a candidate is
/// acceptable is decided by the configured validator, not by decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration for the storage layer
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the backing JSON document
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/items.json"),
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(test)]
impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            category: None,
            extra: Map::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[cfg(test)]
impl NewItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
