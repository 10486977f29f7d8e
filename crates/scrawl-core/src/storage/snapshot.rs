//! Local snapshot of the canvas, written after every committed change.

use super::{SnapshotStorage, StorageError, StorageResult};
use crate::canvas::CanvasState;
use crate::engine::{Command, Commit, CommitObserver};
use serde::{Deserialize, Serialize};

/// Key the snapshot is stored under unless configured otherwise.
pub const LOCAL_STORAGE_KEY: &str = "scrawl-app-state";

/// Persisted application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub page: CanvasState,
}

/// Serialize `state` and store it under `key`.
pub fn save_snapshot(storage: &dyn SnapshotStorage, key: &str, state: &CanvasState) -> StorageResult<()> {
    let snapshot = AppSnapshot { page: state.clone() };
    let json = serde_json::to_string(&snapshot).map_err(|e| StorageError::Serialization(e.to_string()))?;
    storage.write(key, &json)
}

/// Load the stored canvas state.
///
/// Returns `None` when nothing is stored. A malformed snapshot is logged,
/// removed and treated as absent. Stale selection entries are pruned.
pub fn load_snapshot(storage: &dyn SnapshotStorage, key: &str) -> Option<CanvasState> {
    let json = match storage.read(key) {
        Ok(json) => json,
        Err(StorageError::NotFound(_)) => return None,
        Err(e) => {
            log::warn!("Failed to read snapshot {}: {}", key, e);
            return None;
        }
    };
    match serde_json::from_str::<AppSnapshot>(&json) {
        Ok(snapshot) => Some(snapshot.page.normalized()),
        Err(e) => {
            log::warn!("Discarding malformed snapshot {}: {}", key, e);
            if let Err(e) = storage.remove(key) {
                log::warn!("Failed to remove snapshot {}: {}", key, e);
            }
            None
        }
    }
}

/// Writes the present state to storage after each commit.
pub struct PersistObserver<T: SnapshotStorage> {
    storage: T,
    key: String,
}

impl<T: SnapshotStorage> PersistObserver<T> {
    pub fn new(storage: T, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &T {
        &self.storage
    }
}

impl<T: SnapshotStorage> CommitObserver for PersistObserver<T> {
    fn on_commit(&mut self, commit: &Commit<'_>) {
        // draft previews never reach the store
        if matches!(commit.command, Command::DraftText { .. }) {
            return;
        }
        if let Err(e) = save_snapshot(&self.storage, &self.key, commit.after) {
            log::warn!("Failed to persist snapshot: {}", e);
        }
    }
}
