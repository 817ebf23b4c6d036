//! Aggregate statistics over the whole item collection.
//!
//! The aggregate is cached by [`StatsAggregator`] and dropped whenever the
//! backing document is reported as changed.

mod aggregator;

pub use aggregator::StatsAggregator;

use serde::Serialize;

use crate::storage::Item;

/// Count and mean price over every item, unfiltered
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsAggregate {
    pub total: usize,
    /// Arithmetic mean of `price`; 0 for an empty collection
    pub average_price: f64,
}

impl StatsAggregate {
    pub fn compute(items: &[Item]) -> Self {
        let total = items.len();
        let average_price = if total == 0 {
            0.0
        } else {
            items.iter().map(|item| item.price).sum::<f64>() / total as f64
        };

        Self {
            total,
            average_price,
        }
    }
}

/// Observable state of the stats cache
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheState {
    Empty,
    Populated(StatsAggregate),
}

impl CacheState {
    pub fn label(&self) -> &'static str {
        match self {
            CacheState::Empty => "empty",
            CacheState::Populated(_) => "populated",
        }
    }
}
