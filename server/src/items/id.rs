//! Identifier assignment for new items.
//!
//! Ids are wall-clock milliseconds, forced strictly above both the last id
//! handed out by this process and every id already in the collection.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::storage::{Item, ItemId};

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

pub struct IdGenerator {
    last: AtomicI64,
    clock: Clock,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::with_clock(|| chrono::Utc::now().timestamp_millis())
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `clock` instead of the system time, in milliseconds
    pub fn with_clock(clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self {
            last: AtomicI64::new(0),
            clock: Box::new(clock),
        }
    }

    /// Next id for an item appended to `existing`
    pub fn next(&self, existing: &[Item]) -> ItemId {
        let above_existing = existing
            .iter()
            .map(|item| item.id.saturating_add(1))
            .max()
            .unwrap_or(0);
        let floor = (self.clock)().max(above_existing);

        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(floor.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);

        floor.max(previous.saturating_add(1))
    }
}
