//! JSON document store for the item collection.
//!
//! The collection lives in a single human-readable JSON array. Reads always
//! go to disk. Writes are read-modify-write of the whole collection and land
//! through a temp file renamed over the document, so readers and watchers
//! only ever see a complete serialization.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Item, StoreConfig};

/// Errors that can occur while reading or persisting the collection.
///
/// Every variant means the store is unavailable; none of them is ever
/// recovered as an empty collection.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Item document not found: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read item document {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Item document {} is malformed: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode item collection: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to persist item document {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store over the backing JSON document
#[derive(Clone)]
pub struct ItemStore {
    config: StoreConfig,
    /// Serializes read-modify-write cycles issued by this process
    write_lock: Arc<Mutex<()>>,
}

impl ItemStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Read and decode the full collection
    pub async fn load(&self) -> StoreResult<Vec<Item>> {
        let path = self.path();
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&raw).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Append an item and persist the whole collection, returning it
    #[cfg(test)]
    pub async fn append(&self, item: Item) -> StoreResult<Vec<Item>> {
        let (_, items) = self.append_with(move |_| item).await?;
        Ok(items)
    }

    /// Append the item built from the current snapshot.
    ///
    /// `build` sees exactly the snapshot that gets written back, which lets
    /// callers derive values such as identifiers from it.
    pub async fn append_with<F>(&self, build: F) -> StoreResult<(Item, Vec<Item>)>
    where
        F: FnOnce(&[Item]) -> Item,
    {
        let _guard = self.write_lock.lock().await;

        let mut items = self.load().await?;
        let item = build(&items);
        items.push(item.clone());
        self.persist(&items).await?;

        debug!(
            "Appended item {} to {} ({} items)",
            item.id,
            self.path().display(),
            items.len()
        );

        Ok((item, items))
    }

    /// Replace the document with a full serialization of `items`
    async fn persist(&self, items: &[Item]) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(items).map_err(StoreError::Encode)?;
        let path = self.config.path.clone();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &bytes))
            .await
            .map_err(|e| StoreError::Write {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::Other, e),
            })?
            .map_err(|source| StoreError::Write { path, source })
    }
}

/// Write `bytes` to a sibling temp file and rename it over `path`
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
