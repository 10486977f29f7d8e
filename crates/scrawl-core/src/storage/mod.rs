//! Storage abstraction for persistence.

mod file;
mod memory;
mod snapshot;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use snapshot::{AppSnapshot, LOCAL_STORAGE_KEY, PersistObserver, load_snapshot, save_snapshot};

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Key/value store for serialized snapshots.
pub trait SnapshotStorage: Send + Sync {
    /// Read the value under `key`.
    fn read(&self, key: &str) -> StorageResult<String>;

    /// Write `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: SnapshotStorage + ?Sized> SnapshotStorage for std::sync::Arc<T> {
    fn read(&self, key: &str) -> StorageResult<String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}
