//! The mutation pipeline.
//!
//! Local intents and inbound peer messages are queued as [`Command`]s and
//! applied one at a time by [`Engine::pump`]. After each command the engine
//! hands a [`Commit`] to its observers in registration order (persistence,
//! broadcast, ...).

use crate::canvas::{CanvasAction, CanvasState};
use crate::config::EngineConfig;
use crate::history::{HistoryAction, Undoable};
use crate::node::NodeId;
use crate::protocol::WireMessage;
use crate::selection::{SelectionThrottle, select_in_rect};
use crate::storage::{SnapshotStorage, load_snapshot};
use crate::sync::SyncEvent;
use kurbo::Rect;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Instant;

/// A unit of work for the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Canvas(CanvasAction),
    History(HistoryAction),
    /// Transient text preview; never touches the node store. Empty text
    /// drops the preview.
    DraftText { id: NodeId, text: String },
}

impl From<CanvasAction> for Command {
    fn from(action: CanvasAction) -> Self {
        Command::Canvas(action)
    }
}

impl From<HistoryAction> for Command {
    fn from(action: HistoryAction) -> Self {
        Command::History(action)
    }
}

impl From<WireMessage> for Command {
    fn from(message: WireMessage) -> Self {
        match message {
            WireMessage::DraftTextUpdate { id, text } => Command::DraftText { id, text },
            WireMessage::NodesAdd(nodes) => Command::Canvas(CanvasAction::AddNodes(nodes)),
            WireMessage::NodesDelete(ids) => Command::Canvas(CanvasAction::DeleteNodes(ids)),
            WireMessage::NodesUpdate(nodes) => Command::Canvas(CanvasAction::UpdateNodes(nodes)),
            WireMessage::HistoryChange { action } => Command::History(action),
        }
    }
}

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    /// Applied on behalf of a peer: no history capture, no re-broadcast.
    Remote,
}

/// A command that has been applied.
#[derive(Debug)]
pub struct Commit<'a> {
    pub command: &'a Command,
    pub origin: Origin,
    pub before: &'a CanvasState,
    pub after: &'a CanvasState,
}

/// Reacts to applied commands.
pub trait CommitObserver {
    fn on_commit(&mut self, commit: &Commit<'_>);
}

#[derive(Debug)]
struct Queued {
    command: Command,
    origin: Origin,
}

/// Cloneable handle that posts commands into an engine's queue.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Queued>,
}

impl CommandSender {
    /// Queue a command. Returns `false` if the engine is gone.
    pub fn post(&self, command: impl Into<Command>, origin: Origin) -> bool {
        self.tx
            .send(Queued {
                command: command.into(),
                origin,
            })
            .is_ok()
    }

    /// Queue a message received from a peer.
    pub fn post_remote(&self, message: WireMessage) -> bool {
        self.post(message, Origin::Remote)
    }
}

/// Canvas state engine: history, observers and the command queue.
pub struct Engine {
    history: Undoable<CanvasState>,
    observers: Vec<Box<dyn CommitObserver>>,
    draft_texts: HashMap<NodeId, String>,
    selection: SelectionThrottle,
    tx: Sender<Queued>,
    rx: Receiver<Queued>,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_state(CanvasState::default(), config)
    }

    pub fn with_state(state: CanvasState, config: &EngineConfig) -> Self {
        let (tx, rx) = channel();
        Self {
            history: Undoable::new(state.normalized(), CanvasAction::is_history_significant)
                .with_limit(config.history_limit),
            observers: Vec::new(),
            draft_texts: HashMap::new(),
            selection: SelectionThrottle::new(config.selection_throttle()),
            tx,
            rx,
        }
    }

    /// Start from the stored snapshot, or from an empty canvas.
    pub fn restore(storage: &dyn SnapshotStorage, config: &EngineConfig) -> Self {
        let state = load_snapshot(storage, &config.storage_key).unwrap_or_default();
        Self::with_state(state, config)
    }

    /// Register an observer. Observers run in registration order.
    pub fn add_observer(&mut self, observer: impl CommitObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender { tx: self.tx.clone() }
    }

    pub fn state(&self) -> &CanvasState {
        self.history.present()
    }

    pub fn history(&self) -> &Undoable<CanvasState> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Live text preview for a node being typed, local or remote.
    pub fn draft_text(&self, id: &str) -> Option<&str> {
        self.draft_texts.get(id).map(String::as_str)
    }

    /// Abandon a local text preview and tell peers to drop theirs.
    pub fn clear_draft_text(&mut self, id: impl Into<NodeId>) -> usize {
        self.dispatch(Command::DraftText {
            id: id.into(),
            text: String::new(),
        })
    }

    /// Queue a local command and process the queue.
    pub fn dispatch(&mut self, command: impl Into<Command>) -> usize {
        self.queue(command.into(), Origin::Local);
        self.pump()
    }

    /// Queue a peer message and process the queue.
    pub fn receive(&mut self, message: WireMessage) -> usize {
        self.queue(message.into(), Origin::Remote);
        self.pump()
    }

    /// Feed a transport event into the engine.
    pub fn handle_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Received(message) => {
                self.receive(message);
            }
            SyncEvent::JoinedRoom { room, peer_count } => {
                log::info!("joined room {} with {} peer(s)", room, peer_count)
            }
            SyncEvent::PeerJoined { peer_id } => log::info!("peer {} joined", peer_id),
            SyncEvent::PeerLeft { peer_id } => log::info!("peer {} left", peer_id),
            SyncEvent::Error { message } => log::warn!("sync error: {}", message),
            SyncEvent::Connected => log::info!("connected to relay"),
            SyncEvent::Disconnected => log::info!("disconnected from relay"),
        }
    }

    /// Apply every queued command in order. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(queued) = self.rx.try_recv() {
            self.apply(queued);
            applied += 1;
        }
        applied
    }

    /// Record a rubber-band rectangle; the selection follows after the throttle delay.
    pub fn request_selection(&mut self, rect: Rect, now: Instant) {
        self.selection.request(rect, now);
    }

    /// Apply a due selection update. Returns `true` if the selection was recomputed.
    pub fn poll_selection(&mut self, now: Instant) -> bool {
        match self.selection.poll(now) {
            Some(rect) => {
                self.select_rect(rect);
                true
            }
            None => false,
        }
    }

    /// Apply any pending selection update immediately.
    pub fn flush_selection(&mut self) -> bool {
        match self.selection.flush() {
            Some(rect) => {
                self.select_rect(rect);
                true
            }
            None => false,
        }
    }

    fn select_rect(&mut self, rect: Rect) {
        let action = select_in_rect(self.state().nodes(), rect);
        self.dispatch(action);
    }

    fn queue(&self, command: Command, origin: Origin) {
        // the engine holds a receiver, so this cannot fail
        let _ = self.tx.send(Queued { command, origin });
    }

    fn apply(&mut self, queued: Queued) {
        let Queued { command, origin } = queued;
        let before = self.history.present().clone();

        match (&command, origin) {
            (Command::Canvas(action), Origin::Local) => self.history.dispatch(action),
            (Command::Canvas(action), Origin::Remote) => self.history.apply_untracked(action),
            (Command::History(action), _) => {
                if !self.history.apply(*action) {
                    log::debug!("nothing to {:?}", action);
                }
            }
            (Command::DraftText { id, text }, _) if text.is_empty() => {
                self.draft_texts.remove(id);
            }
            (Command::DraftText { id, text }, _) => {
                self.draft_texts.insert(id.clone(), text.clone());
            }
        }

        if let Command::Canvas(action) = &command {
            self.settle_draft_texts(action);
        }

        let commit = Commit {
            command: &command,
            origin,
            before: &before,
            after: self.history.present(),
        };
        for observer in &mut self.observers {
            observer.on_commit(&commit);
        }
    }
}

impl Engine {
    /// Drop previews superseded by a structural change to their node.
    fn settle_draft_texts(&mut self, action: &CanvasAction) {
        if self.draft_texts.is_empty() {
            return;
        }
        match action {
            CanvasAction::Set(_) | CanvasAction::DeleteAll => self.draft_texts.clear(),
            CanvasAction::AddNodes(nodes) | CanvasAction::UpdateNodes(nodes) => {
                for node in nodes {
                    self.draft_texts.remove(node.id());
                }
            }
            CanvasAction::DeleteNodes(ids) => {
                for id in ids {
                    self.draft_texts.remove(id);
                }
            }
            _ => {}
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
