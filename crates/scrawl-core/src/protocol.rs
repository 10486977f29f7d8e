//! Wire protocol shared by clients and the relay server.
//!
//! Every frame is a JSON envelope `{ "type": ..., "data": ... }`. Collaboration
//! messages are relayed between peers untouched; control frames and notices
//! are exchanged only with the relay.

use crate::history::HistoryAction;
use crate::node::{Node, NodeId};
use serde::{Deserialize, Serialize};

/// A collaboration message exchanged between peers of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum WireMessage {
    /// Live preview of text being typed. Never merged into the node store.
    DraftTextUpdate { id: NodeId, text: String },
    NodesAdd(Vec<Node>),
    NodesDelete(Vec<NodeId>),
    /// Replace nodes in place.
    NodesUpdate(Vec<Node>),
    /// The receiver runs its own undo/redo.
    HistoryChange { action: HistoryAction },
}

impl WireMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Frames a client sends to the relay itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum RelayControl {
    Join { room: String },
    Leave,
}

/// Frames the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum RelayNotice {
    Joined { room: String, peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    Error { message: String },
}

/// Any frame a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Control(RelayControl),
    Message(WireMessage),
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        if let Ok(control) = serde_json::from_str::<RelayControl>(text) {
            return Ok(ClientFrame::Control(control));
        }
        WireMessage::from_json(text).map(ClientFrame::Message)
    }
}

/// Any frame the relay may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Notice(RelayNotice),
    Message(WireMessage),
}

impl ServerFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        if let Ok(notice) = serde_json::from_str::<RelayNotice>(text) {
            return Ok(ServerFrame::Notice(notice));
        }
        WireMessage::from_json(text).map(ServerFrame::Message)
    }
}
