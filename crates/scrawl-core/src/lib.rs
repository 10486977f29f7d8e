//! Scrawl Core Library
//!
//! Canvas state engine for the Scrawl whiteboard: the node model, z-order
//! operations, undo history and the collaboration protocol.

pub mod camera;
pub mod canvas;
pub mod collaboration;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod history;
pub mod node;
pub mod protocol;
pub mod selection;
pub mod shortcuts;
pub mod storage;
pub mod sync;
pub mod tools;

pub use camera::{StageConfig, StageConfigPatch, StagePosition};
pub use canvas::{CanvasAction, CanvasState};
pub use collaboration::{CollaborationSync, OutboundSink};
pub use config::EngineConfig;
pub use engine::{Command, CommandSender, Commit, CommitObserver, Engine, Origin};
pub use geometry::{DUPLICATION_GAP, ReorderDirection, reorder_nodes};
pub use history::{HistoryAction, Undoable};
pub use node::{Node, NodeId, NodeKind, create_node};
pub use protocol::{ClientFrame, RelayControl, RelayNotice, ServerFrame, WireMessage};
pub use selection::SelectionThrottle;
pub use shortcuts::{Binding, ShortcutRegistry};
pub use storage::{FileStorage, MemoryStorage, PersistObserver, SnapshotStorage, StorageError};
pub use sync::{ConnectionState, NativeWebSocket, SyncError, SyncEvent};
pub use tools::{DraftManager, ToolType};
