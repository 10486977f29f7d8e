//! Collaboration: turns local commits into wire messages for peers.
//!
//! Inbound messages are not handled here; the engine converts them into
//! remote-origin commands that bypass history capture.

use crate::canvas::{CanvasAction, CanvasState};
use crate::engine::{Command, Commit, CommitObserver, Origin};
use crate::node::{Node, NodeId};
use crate::protocol::WireMessage;
use crate::sync::SyncError;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Fire-and-forget outbound channel to peers.
pub trait OutboundSink {
    fn is_connected(&self) -> bool;

    fn send(&mut self, message: &WireMessage) -> Result<(), SyncError>;
}

/// Lets the application keep polling a socket that the engine broadcasts through.
impl<T: OutboundSink> OutboundSink for Rc<RefCell<T>> {
    fn is_connected(&self) -> bool {
        self.borrow().is_connected()
    }

    fn send(&mut self, message: &WireMessage) -> Result<(), SyncError> {
        self.borrow_mut().send(message)
    }
}

/// Broadcasts local commits through an [`OutboundSink`].
pub struct CollaborationSync<K: OutboundSink> {
    sink: K,
    sent: usize,
    skipped: usize,
}

impl<K: OutboundSink> CollaborationSync<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            sent: 0,
            skipped: 0,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Messages delivered to the sink so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Messages dropped because the sink was disconnected or failed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<K: OutboundSink> CommitObserver for CollaborationSync<K> {
    fn on_commit(&mut self, commit: &Commit<'_>) {
        let messages = outbound_messages(commit);
        if messages.is_empty() {
            return;
        }
        if !self.sink.is_connected() {
            log::debug!("not connected, skipping broadcast of {} message(s)", messages.len());
            self.skipped += messages.len();
            return;
        }
        for message in &messages {
            match self.sink.send(message) {
                Ok(()) => self.sent += 1,
                Err(e) => {
                    log::warn!("broadcast failed: {}", e);
                    self.skipped += 1;
                }
            }
        }
    }
}

/// Messages that describe a commit to peers. Remote commits produce none.
pub fn outbound_messages(commit: &Commit<'_>) -> Vec<WireMessage> {
    if commit.origin == Origin::Remote {
        return Vec::new();
    }
    let message = match commit.command {
        Command::DraftText { id, text } => Some(WireMessage::DraftTextUpdate {
            id: id.clone(),
            text: text.clone(),
        }),
        Command::History(action) => Some(WireMessage::HistoryChange { action: *action }),
        Command::Canvas(action) => canvas_message(action, commit.before, commit.after),
    };
    message.into_iter().collect()
}

fn canvas_message(action: &CanvasAction, before: &CanvasState, after: &CanvasState) -> Option<WireMessage> {
    match action {
        // adds skip collision checks, so the payload is what peers must append
        CanvasAction::AddNodes(nodes) => (!nodes.is_empty()).then(|| WireMessage::NodesAdd(nodes.clone())),
        CanvasAction::PasteNodes | CanvasAction::DuplicateNodes(_) => {
            let added = added_nodes(before, after);
            (!added.is_empty()).then_some(WireMessage::NodesAdd(added))
        }
        CanvasAction::DeleteNodes(_) | CanvasAction::DeleteAll => {
            let removed = removed_ids(before, after);
            (!removed.is_empty()).then_some(WireMessage::NodesDelete(removed))
        }
        CanvasAction::UpdateNodes(updates) => {
            let updated: Vec<Node> = updates
                .iter()
                .filter(|node| after.get_node(node.id()).is_some())
                .cloned()
                .collect();
            (!updated.is_empty()).then_some(WireMessage::NodesUpdate(updated))
        }
        // reorder, copy, hydration and view changes stay local
        _ => None,
    }
}

fn added_nodes(before: &CanvasState, after: &CanvasState) -> Vec<Node> {
    let existing: HashSet<&str> = before.nodes().iter().map(Node::id).collect();
    after
        .nodes()
        .iter()
        .filter(|node| !existing.contains(node.id()))
        .cloned()
        .collect()
}

fn removed_ids(before: &CanvasState, after: &CanvasState) -> Vec<NodeId> {
    let remaining: HashSet<&str> = after.nodes().iter().map(Node::id).collect();
    before
        .nodes()
        .iter()
        .filter(|node| !remaining.contains(node.id()))
        .map(|node| node.node_props.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryAction;
    use crate::node::NodeKind;
    use crate::tools::ToolType;
    use kurbo::Point;

    #[derive(Default)]
    struct RecordingSink {
        connected: bool,
        fail: bool,
        sent: Vec<WireMessage>,
    }

    impl OutboundSink for RecordingSink {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn send(&mut self, message: &WireMessage) -> Result<(), SyncError> {
            if self.fail {
                return Err(SyncError::Send("boom".into()));
            }
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn rect(id: &str) -> Node {
        Node::new(NodeKind::Rectangle, Point::ZERO).with_size(10.0, 10.0).with_id(id)
    }

    fn messages(command: Command, before: &CanvasState) -> Vec<WireMessage> {
        let after = match &command {
            Command::Canvas(action) => before.clone().reduce(action),
            _ => before.clone(),
        };
        outbound_messages(&Commit {
            command: &command,
            origin: Origin::Local,
            before,
            after: &after,
        })
    }

    #[test]
    fn test_add_emits_nodes_add() {
        let before = CanvasState::default();
        let msgs = messages(Command::Canvas(CanvasAction::AddNodes(vec![rect("a")])), &before);
        assert_eq!(msgs, vec![WireMessage::NodesAdd(vec![rect("a")])]);
    }

    #[test]
    fn test_add_with_colliding_id_is_broadcast() {
        let before = CanvasState::with_nodes(vec![rect("a")]);
        let msgs = messages(Command::Canvas(CanvasAction::AddNodes(vec![rect("a")])), &before);
        assert_eq!(msgs, vec![WireMessage::NodesAdd(vec![rect("a")])]);

        let msgs = messages(Command::Canvas(CanvasAction::AddNodes(vec![])), &before);
        assert!(msgs.is_empty());
    }

    #[test]
    fn test_paste_emits_pasted_nodes() {
        let before = CanvasState::with_nodes(vec![rect("a")])
            .select_all_nodes()
            .copy_nodes();
        let msgs = messages(Command::Canvas(CanvasAction::PasteNodes), &before);
        match &msgs[..] {
            [WireMessage::NodesAdd(nodes)] => {
                assert_eq!(nodes.len(), 1);
                assert_ne!(nodes[0].id(), "a");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_delete_emits_only_existing_ids() {
        let before = CanvasState::with_nodes(vec![rect("a"), rect("b")]);
        let msgs = messages(
            Command::Canvas(CanvasAction::DeleteNodes(vec!["b".into(), "zzz".into()])),
            &before,
        );
        assert_eq!(msgs, vec![WireMessage::NodesDelete(vec!["b".into()])]);

        let msgs = messages(Command::Canvas(CanvasAction::DeleteAll), &before);
        assert_eq!(msgs, vec![WireMessage::NodesDelete(vec!["a".into(), "b".into()])]);
    }

    #[test]
    fn test_noop_structural_change_is_silent() {
        let before = CanvasState::default();
        let msgs = messages(Command::Canvas(CanvasAction::DeleteNodes(vec!["x".into()])), &before);
        assert!(msgs.is_empty());
    }

    #[test]
    fn test_update_emits_nodes_update() {
        let before = CanvasState::with_nodes(vec![rect("a")]);
        let mut moved = rect("a");
        moved.node_props.point = Point::new(5.0, 5.0);
        let msgs = messages(
            Command::Canvas(CanvasAction::UpdateNodes(vec![moved.clone(), rect("ghost")])),
            &before,
        );
        assert_eq!(msgs, vec![WireMessage::NodesUpdate(vec![moved])]);
    }

    #[test]
    fn test_local_only_actions() {
        let before = CanvasState::with_nodes(vec![rect("a"), rect("b")]);
        for action in [
            CanvasAction::move_to_end(vec!["a".into()]),
            CanvasAction::SelectAllNodes,
            CanvasAction::CopyNodes,
            CanvasAction::SetToolType(ToolType::Hand),
        ] {
            assert!(messages(Command::Canvas(action), &before).is_empty());
        }
    }

    #[test]
    fn test_history_and_draft_text() {
        let before = CanvasState::default();
        assert_eq!(
            messages(Command::History(HistoryAction::Redo), &before),
            vec![WireMessage::HistoryChange { action: HistoryAction::Redo }]
        );
        assert_eq!(
            messages(Command::DraftText { id: "t".into(), text: "he".into() }, &before),
            vec![WireMessage::DraftTextUpdate { id: "t".into(), text: "he".into() }]
        );
    }

    #[test]
    fn test_remote_commits_are_not_echoed() {
        let before = CanvasState::default();
        let command = Command::Canvas(CanvasAction::AddNodes(vec![rect("a")]));
        let after = before.clone().reduce(&CanvasAction::AddNodes(vec![rect("a")]));
        let commit = Commit {
            command: &command,
            origin: Origin::Remote,
            before: &before,
            after: &after,
        };
        assert!(outbound_messages(&commit).is_empty());
    }

    #[test]
    fn test_observer_skips_when_disconnected() {
        let mut sync = CollaborationSync::new(RecordingSink::default());
        let before = CanvasState::default();
        let command = Command::History(HistoryAction::Undo);
        let commit = Commit {
            command: &command,
            origin: Origin::Local,
            before: &before,
            after: &before,
        };

        sync.on_commit(&commit);
        assert!(sync.sink().sent.is_empty());
        assert_eq!(sync.skipped(), 1);

        sync.sink_mut().connected = true;
        sync.on_commit(&commit);
        assert_eq!(sync.sink().sent.len(), 1);
        assert_eq!(sync.sent(), 1);

        sync.sink_mut().fail = true;
        sync.on_commit(&commit);
        assert_eq!(sync.sent(), 1);
        assert_eq!(sync.skipped(), 2);
    }

    #[test]
    fn test_shared_sink() {
        let shared = Rc::new(RefCell::new(RecordingSink {
            connected: true,
            ..Default::default()
        }));
        let mut sync = CollaborationSync::new(Rc::clone(&shared));
        let before = CanvasState::default();
        let command = Command::History(HistoryAction::Undo);
        sync.on_commit(&Commit {
            command: &command,
            origin: Origin::Local,
            before: &before,
            after: &before,
        });
        assert_eq!(shared.borrow().sent.len(), 1);
    }
}
