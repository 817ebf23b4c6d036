//! Write path for catalog items.
//!
//! [`ItemRepository::create`] validates a candidate, assigns its id and
//! appends it through the store. It never touches the stats cache; the
//! document change it causes is picked up by the watcher like any other.

mod id;
mod validator;

pub use id::IdGenerator;
pub use validator::{AcceptAll, ItemValidator, ValidationError, ValidationPolicy};

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::storage::{Item, ItemStore, NewItem, StoreError};

/// Errors from the write path
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Invalid item: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ItemRepository {
    store: ItemStore,
    validator: Arc<dyn ItemValidator>,
    ids: IdGenerator,
}

impl ItemRepository {
    /// Repository that stores candidates without validation
    pub fn new(store: ItemStore) -> Self {
        Self {
            store,
            validator: Arc::new(AcceptAll),
            ids: IdGenerator::new(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ItemValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Validate, assign an id, append and return the stored item
    pub async fn create(&self, candidate: NewItem) -> Result<Item, RepositoryError> {
        self.validator.validate(&candidate)?;

        let ids = &self.ids;
        let (item, items) = self
            .store
            .append_with(|existing| Item::from_candidate(ids.next(existing), candidate))
            .await?;

        info!(
            "Created item {} ({:?}), collection now {} items",
            item.id,
            item.name,
            items.len()
        );

        Ok(item)
    }
}

#[cfg(test)]
impl ItemRepository {
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }
}
