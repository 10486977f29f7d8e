//! Generic undo/redo wrapper around a reducer.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A state that evolves by applying actions.
pub trait Reducer: Clone {
    type Action;

    fn reduce(self, action: &Self::Action) -> Self;

    /// Fold an action someone else made into a stored snapshot.
    fn rebase(self, action: &Self::Action) -> Self {
        self.reduce(action)
    }
}

impl Reducer for crate::canvas::CanvasState {
    type Action = crate::canvas::CanvasAction;

    fn reduce(self, action: &Self::Action) -> Self {
        crate::canvas::CanvasState::reduce(self, action)
    }

    fn rebase(self, action: &Self::Action) -> Self {
        match action {
            // a snapshot may already hold the node, e.g. one taken after a redo
            crate::canvas::CanvasAction::AddNodes(nodes) => {
                let fresh: Vec<_> = nodes
                    .iter()
                    .filter(|node| self.get_node(node.id()).is_none())
                    .cloned()
                    .collect();
                self.add_nodes(fresh)
            }
            _ => self.reduce(action),
        }
    }
}

/// Undo/redo commands. Also carried verbatim over the sync channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// Past/present/future stacks around a reducer.
///
/// Only actions accepted by the `records` predicate create undo entries;
/// everything else updates the present in place.
#[derive(Debug, Clone)]
pub struct Undoable<S: Reducer> {
    past: VecDeque<S>,
    present: S,
    future: Vec<S>,
    records: fn(&S::Action) -> bool,
    limit: Option<usize>,
}

impl<S: Reducer> Undoable<S> {
    pub fn new(present: S, records: fn(&S::Action) -> bool) -> Self {
        Self {
            past: VecDeque::new(),
            present,
            future: Vec::new(),
            records,
            limit: None,
        }
    }

    /// Cap the number of undo entries. The oldest are dropped first.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self.enforce_limit();
        self
    }

    pub fn present(&self) -> &S {
        &self.present
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Apply an action. Recorded actions push the old present and clear redo.
    pub fn dispatch(&mut self, action: &S::Action) {
        let previous = self.present.clone();
        self.present = previous.clone().reduce(action);
        if (self.records)(action) {
            self.past.push_back(previous);
            self.future.clear();
            self.enforce_limit();
        }
    }

    /// Apply an action without creating an undo entry.
    ///
    /// Every stored snapshot is rebased onto the action as well, so stepping
    /// through history never reverts it.
    pub fn apply_untracked(&mut self, action: &S::Action) {
        let present = self.present.clone();
        self.present = present.reduce(action);
        for snapshot in self.past.iter_mut().chain(self.future.iter_mut()) {
            *snapshot = snapshot.clone().rebase(action);
        }
    }

    pub fn apply(&mut self, action: HistoryAction) -> bool {
        match action {
            HistoryAction::Undo => self.undo(),
            HistoryAction::Redo => self.redo(),
        }
    }

    /// Step back. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push(current);
        true
    }

    /// Step forward. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push_back(current);
        self.enforce_limit();
        true
    }

    /// Drop all history and install `present`.
    pub fn reset(&mut self, present: S) {
        self.past.clear();
        self.future.clear();
        self.present = present;
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            while self.past.len() > limit {
                self.past.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasAction, CanvasState};
    use crate::node::{Node, NodeKind};
    use crate::tools::ToolType;
    use kurbo::Point;

    fn history() -> Undoable<CanvasState> {
        Undoable::new(CanvasState::default(), CanvasAction::is_history_significant)
    }

    fn add(id: &str) -> CanvasAction {
        CanvasAction::AddNodes(vec![Node::new(NodeKind::Rectangle, Point::ZERO).with_id(id)])
    }

    fn ids(h: &Undoable<CanvasState>) -> Vec<String> {
        h.present().nodes().iter().map(|n| n.id().to_string()).collect()
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut h = history();
        h.dispatch(&add("a"));
        h.dispatch(&add("b"));
        assert_eq!(ids(&h), ["a", "b"]);

        assert!(h.undo());
        assert_eq!(ids(&h), ["a"]);
        assert!(h.redo());
        assert_eq!(ids(&h), ["a", "b"]);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut h = history();
        assert!(!h.can_undo());
        assert!(!h.undo());
        assert!(!h.redo());
        assert_eq!(*h.present(), CanvasState::default());
    }

    #[test]
    fn test_new_recorded_action_clears_future() {
        let mut h = history();
        h.dispatch(&add("a"));
        h.undo();
        assert!(h.can_redo());
        h.dispatch(&add("b"));
        assert!(!h.can_redo());
        assert_eq!(ids(&h), ["b"]);
    }

    #[test]
    fn test_unrecorded_actions_update_present_only() {
        let mut h = history();
        h.dispatch(&add("a"));
        h.dispatch(&CanvasAction::SetToolType(ToolType::Hand));
        h.dispatch(&CanvasAction::SelectAllNodes);
        assert_eq!(h.past_len(), 1);
        assert_eq!(h.present().tool_type(), ToolType::Hand);
        assert!(h.present().is_selected("a"));

        h.undo();
        assert!(h.present().nodes().is_empty());
    }

    #[test]
    fn test_unrecorded_action_keeps_future() {
        let mut h = history();
        h.dispatch(&add("a"));
        h.undo();
        h.dispatch(&CanvasAction::SetToolType(ToolType::Draw));
        assert!(h.can_redo());
    }

    #[test]
    fn test_untracked_changes_skip_history() {
        let mut h = history();
        h.dispatch(&add("a"));
        h.undo();
        h.apply_untracked(&add("remote"));
        assert_eq!(ids(&h), ["remote"]);
        assert!(!h.can_undo());
        assert!(h.can_redo());

        h.redo();
        assert_eq!(ids(&h), ["a", "remote"]);
    }

    #[test]
    fn test_undo_keeps_untracked_changes() {
        let mut h = history();
        h.dispatch(&add("mine"));
        h.apply_untracked(&add("peer"));
        assert_eq!(ids(&h), ["mine", "peer"]);

        assert!(h.undo());
        assert_eq!(ids(&h), ["peer"]);
        assert!(h.redo());
        assert_eq!(ids(&h), ["mine", "peer"]);

        h.apply_untracked(&CanvasAction::DeleteNodes(vec!["mine".into()]));
        assert!(h.undo());
        assert_eq!(ids(&h), ["peer"]);
    }

    #[test]
    fn test_rebase_skips_nodes_already_in_snapshot() {
        let mut h = history();
        h.dispatch(&add("a"));
        h.dispatch(&add("b"));
        h.undo();
        // the redo snapshot already holds "b"
        h.apply_untracked(&add("b"));
        h.redo();
        assert_eq!(ids(&h), ["a", "b"]);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut h = history().with_limit(Some(2));
        for id in ["a", "b", "c", "d"] {
            h.dispatch(&add(id));
        }
        assert_eq!(h.past_len(), 2);
        assert!(h.undo());
        assert!(h.undo());
        assert!(!h.undo());
        assert_eq!(ids(&h), ["a", "b"]);
    }

    #[test]
    fn test_apply_history_action() {
        let mut h = history();
        h.dispatch(&add("a"));
        assert!(h.apply(HistoryAction::Undo));
        assert!(h.apply(HistoryAction::Redo));
        assert!(!h.apply(HistoryAction::Redo));
    }

    #[test]
    fn test_history_action_wire_names() {
        assert_eq!(serde_json::to_value(HistoryAction::Undo).unwrap(), "undo");
        assert_eq!(serde_json::to_value(HistoryAction::Redo).unwrap(), "redo");
    }

    #[test]
    fn test_reset_drops_history() {
        let mut h = history();
        h.dispatch(&add("a"));
        h.reset(CanvasState::default());
        assert!(!h.can_undo());
        assert!(h.present().nodes().is_empty());
    }
}
