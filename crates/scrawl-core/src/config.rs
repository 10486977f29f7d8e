//! Engine configuration.

use crate::selection::SELECTION_THROTTLE;
use crate::storage::LOCAL_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum number of undo entries; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Delay before a rubber-band drag updates the selection, in milliseconds.
    pub selection_throttle_ms: u64,
    /// Storage key of the local snapshot.
    pub storage_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: None,
            selection_throttle_ms: SELECTION_THROTTLE.as_millis() as u64,
            storage_key: LOCAL_STORAGE_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn selection_throttle(&self) -> Duration {
        Duration::from_millis(self.selection_throttle_ms)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
