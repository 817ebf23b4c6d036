//! Change notifications for the backing document.
//!
//! [`DocumentWatcher`] subscribes to filesystem events on the directory that
//! holds the document and broadcasts a [`DocumentChange`] for every write,
//! create, rename or removal that touches it, whoever made it. Every event
//! counts: a write that restores earlier contents is still a change.
//! Consumers depend on the [`ChangeSource`] trait rather than on the watcher.
//!
//! The directory is watched instead of the file because writers replace the
//! document by renaming over it, which ends a watch held on the old inode.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the change broadcast channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// What happened to the watched document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The document was created
    Created,
    /// The document was written or replaced
    Modified,
    /// The document disappeared
    Removed,
}

/// A change observed on a watched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Anything that can deliver document change notifications
pub trait ChangeSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<DocumentChange>;
}

/// Event-driven watcher over a single document
pub struct DocumentWatcher {
    path: PathBuf,
    tx: broadcast::Sender<DocumentChange>,
    /// Live OS watch; dropping it ends notifications
    inner: Mutex<Option<RecommendedWatcher>>,
}

impl DocumentWatcher {
    /// Start watching `path`.
    ///
    /// The document itself may be missing; its creation is reported later.
    /// If its directory cannot be watched the watcher stays inert and the
    /// failure is logged.
    pub fn start(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        let inner = match watch_directory(&path, tx.clone()) {
            Ok(watcher) => {
                if path.exists() {
                    info!("Watching {} for changes", path.display());
                } else {
                    warn!(
                        "Data file {} does not exist yet; watching for its creation",
                        path.display()
                    );
                }
                Some(watcher)
            }
            Err(e) => {
                warn!(
                    "Could not watch {}: {}; stats cache will not be invalidated automatically",
                    path.display(),
                    e
                );
                None
            }
        };

        Self {
            path,
            tx,
            inner: Mutex::new(inner),
        }
    }

    /// Path being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an OS watch is active
    pub fn is_active(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Drop the OS watch; no further changes are delivered
    pub fn stop(&self) {
        if self.inner.lock().take().is_some() {
            info!("Stopped watching {}", self.path.display());
        }
    }
}

impl ChangeSource for DocumentWatcher {
    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.tx.subscribe()
    }
}

fn watch_directory(
    path: &Path,
    tx: broadcast::Sender<DocumentChange>,
) -> notify::Result<RecommendedWatcher> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path.file_name().map(|name| name.to_os_string());
    let document = path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if let Some(change) = classify(&event, file_name.as_ref(), &document) {
                debug!("Detected {:?} on {}", change.kind, change.path.display());
                // No subscribers is fine
                let _ = tx.send(change);
            }
        }
        Err(e) => warn!("Watch error on {}: {}", document.display(), e),
    })?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Map a directory event to a change of the document, if it concerns it
fn classify(event: &Event, file_name: Option<&OsString>, document: &Path) -> Option<DocumentChange> {
    let file_name = file_name?;
    let touches_document = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()));
    if !touches_document {
        return None;
    }

    let kind = match event.kind {
        EventKind::Access(_) => return None,
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => ChangeKind::Modified,
    };

    Some(DocumentChange {
        path: document.to_path_buf(),
        kind,
    })
}
