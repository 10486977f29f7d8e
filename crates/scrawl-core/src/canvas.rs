//! Canvas state and its structural operations.
//!
//! `CanvasState` owns the ordered node collection. The order of `nodes` is the
//! z-order (back to front). Every transition goes through one of the
//! operations below, each of which consumes the state and returns the next
//! one; `CanvasAction` is the command form used by the engine pipeline and
//! the history wrapper.

use crate::camera::{StageConfig, StageConfigPatch};
use crate::geometry::{self, DUPLICATION_GAP, ReorderDirection};
use crate::node::{Node, NodeId};
use crate::tools::ToolType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Set of selected node ids.
pub type SelectedNodeIds = BTreeSet<NodeId>;

/// The state of one canvas page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    nodes: Vec<Node>,
    #[serde(default, with = "selection_serde")]
    selected_nodes_ids: SelectedNodeIds,
    #[serde(default)]
    copied_nodes: Option<Vec<Node>>,
    #[serde(default)]
    tool_type: ToolType,
    #[serde(default)]
    stage_config: StageConfig,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            selected_nodes_ids: SelectedNodeIds::new(),
            copied_nodes: None,
            tool_type: ToolType::default(),
            stage_config: StageConfig::default(),
        }
    }
}

/// A structural or view operation on a [`CanvasState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum CanvasAction {
    Set(Box<CanvasState>),
    AddNodes(Vec<Node>),
    UpdateNodes(Vec<Node>),
    DeleteNodes(Vec<NodeId>),
    DeleteAll,
    CopyNodes,
    PasteNodes,
    DuplicateNodes(Vec<NodeId>),
    MoveNodes {
        ids: Vec<NodeId>,
        direction: ReorderDirection,
    },
    SetSelectedNodesIds(Vec<NodeId>),
    SelectAllNodes,
    SetToolType(ToolType),
    SetStageConfig(StageConfigPatch),
}

impl CanvasAction {
    /// Whether this action should be recorded in undo history.
    ///
    /// Selection, tool and viewport changes are excluded.
    pub fn is_history_significant(&self) -> bool {
        matches!(
            self,
            CanvasAction::Set(_)
                | CanvasAction::AddNodes(_)
                | CanvasAction::UpdateNodes(_)
                | CanvasAction::DeleteNodes(_)
                | CanvasAction::DeleteAll
                | CanvasAction::CopyNodes
                | CanvasAction::PasteNodes
                | CanvasAction::DuplicateNodes(_)
                | CanvasAction::MoveNodes { .. }
        )
    }

    pub fn move_to_start(ids: Vec<NodeId>) -> Self {
        CanvasAction::MoveNodes { ids, direction: ReorderDirection::ToStart }
    }

    pub fn move_to_end(ids: Vec<NodeId>) -> Self {
        CanvasAction::MoveNodes { ids, direction: ReorderDirection::ToEnd }
    }

    pub fn move_forward(ids: Vec<NodeId>) -> Self {
        CanvasAction::MoveNodes { ids, direction: ReorderDirection::Forward }
    }

    pub fn move_backward(ids: Vec<NodeId>) -> Self {
        CanvasAction::MoveNodes { ids, direction: ReorderDirection::Backward }
    }
}

impl CanvasState {
    /// Create a state holding `nodes` with default view settings.
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn selected_nodes_ids(&self) -> &SelectedNodeIds {
        &self.selected_nodes_ids
    }

    pub fn copied_nodes(&self) -> Option<&[Node]> {
        self.copied_nodes.as_deref()
    }

    pub fn tool_type(&self) -> ToolType {
        self.tool_type
    }

    pub fn stage_config(&self) -> &StageConfig {
        &self.stage_config
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_nodes_ids.contains(id)
    }

    /// Selected nodes in z-order.
    pub fn selected_nodes(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| self.selected_nodes_ids.contains(node.id()))
            .collect()
    }

    fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(Node::id).collect()
    }

    /// Drop selected ids that no longer refer to a node.
    pub fn normalized(mut self) -> Self {
        let present: HashSet<NodeId> = self.nodes.iter().map(|n| n.node_props.id.clone()).collect();
        self.selected_nodes_ids.retain(|id| present.contains(id));
        self
    }

    /// Apply `action`, producing the next state.
    pub fn reduce(self, action: &CanvasAction) -> Self {
        match action {
            CanvasAction::Set(state) => self.set((**state).clone()),
            CanvasAction::AddNodes(nodes) => self.add_nodes(nodes.clone()),
            CanvasAction::UpdateNodes(nodes) => self.update_nodes(nodes),
            CanvasAction::DeleteNodes(ids) => self.delete_nodes(ids),
            CanvasAction::DeleteAll => self.delete_all(),
            CanvasAction::CopyNodes => self.copy_nodes(),
            CanvasAction::PasteNodes => self.paste_nodes(),
            CanvasAction::DuplicateNodes(ids) => self.duplicate_nodes(ids),
            CanvasAction::MoveNodes { ids, direction } => self.move_nodes(ids, *direction),
            CanvasAction::SetSelectedNodesIds(ids) => self.set_selected_nodes_ids(ids),
            CanvasAction::SelectAllNodes => self.select_all_nodes(),
            CanvasAction::SetToolType(tool) => self.set_tool_type(*tool),
            CanvasAction::SetStageConfig(patch) => self.set_stage_config(*patch),
        }
    }

    /// Replace the whole state.
    pub fn set(self, state: CanvasState) -> Self {
        state.normalized()
    }

    /// Append nodes on top of the stack. Ids are not checked for collisions.
    pub fn add_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Replace nodes with matching ids in place. Unknown ids are ignored.
    pub fn update_nodes(mut self, updates: &[Node]) -> Self {
        for update in updates {
            if let Some(existing) = self.nodes.iter_mut().find(|n| n.id() == update.id()) {
                *existing = update.clone();
            }
        }
        self
    }

    /// Remove nodes by id and unselect them.
    pub fn delete_nodes(mut self, ids: &[NodeId]) -> Self {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.nodes.retain(|node| !doomed.contains(node.id()));
        self.selected_nodes_ids.retain(|id| !doomed.contains(id.as_str()));
        self
    }

    pub fn delete_all(mut self) -> Self {
        self.nodes.clear();
        self.selected_nodes_ids.clear();
        self
    }

    /// Clone the selected nodes under fresh ids into the paste buffer.
    ///
    /// With nothing selected the buffer is left empty.
    pub fn copy_nodes(mut self) -> Self {
        let copies: Vec<Node> = self
            .selected_nodes()
            .into_iter()
            .map(Node::clone_with_new_id)
            .collect();
        self.copied_nodes = if copies.is_empty() { None } else { Some(copies) };
        self
    }

    /// Append the paste buffer, clear it and select exactly the pasted nodes.
    pub fn paste_nodes(mut self) -> Self {
        let Some(copied) = self.copied_nodes.take() else {
            return self;
        };
        self.selected_nodes_ids = copied.iter().map(|n| n.node_props.id.clone()).collect();
        self.nodes.extend(copied);
        self
    }

    /// Append shifted clones of the given nodes and select the clones.
    pub fn duplicate_nodes(mut self, ids: &[NodeId]) -> Self {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let originals: Vec<Node> = self
            .nodes
            .iter()
            .filter(|node| wanted.contains(node.id()))
            .cloned()
            .collect();
        let clones = geometry::duplicate_nodes(&originals, DUPLICATION_GAP);
        if clones.is_empty() {
            return self;
        }
        self.selected_nodes_ids = clones.iter().map(|n| n.node_props.id.clone()).collect();
        self.nodes.extend(clones);
        self
    }

    pub fn move_nodes(mut self, ids: &[NodeId], direction: ReorderDirection) -> Self {
        self.nodes = geometry::reorder_nodes(&self.nodes, ids, direction);
        self
    }

    pub fn move_nodes_to_start(self, ids: &[NodeId]) -> Self {
        self.move_nodes(ids, ReorderDirection::ToStart)
    }

    pub fn move_nodes_to_end(self, ids: &[NodeId]) -> Self {
        self.move_nodes(ids, ReorderDirection::ToEnd)
    }

    pub fn move_nodes_forward(self, ids: &[NodeId]) -> Self {
        self.move_nodes(ids, ReorderDirection::Forward)
    }

    pub fn move_nodes_backward(self, ids: &[NodeId]) -> Self {
        self.move_nodes(ids, ReorderDirection::Backward)
    }

    /// Replace the selection. Ids without a node are dropped.
    pub fn set_selected_nodes_ids(mut self, ids: &[NodeId]) -> Self {
        let present = self.node_ids();
        let selection: SelectedNodeIds = ids
            .iter()
            .filter(|id| present.contains(id.as_str()))
            .cloned()
            .collect();
        self.selected_nodes_ids = selection;
        self
    }

    pub fn select_all_nodes(mut self) -> Self {
        self.selected_nodes_ids = self.nodes.iter().map(|n| n.node_props.id.clone()).collect();
        self
    }

    pub fn set_tool_type(mut self, tool: ToolType) -> Self {
        self.tool_type = tool;
        self
    }

    pub fn set_stage_config(mut self, patch: StageConfigPatch) -> Self {
        self.stage_config.merge(patch);
        self
    }

    /// Serialize the state to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a state from JSON, pruning stale selection entries.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }
}

/// Selection is stored on the wire as `{ "<id>": true, ... }`.
mod selection_serde {
    use super::SelectedNodeIds;
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeMap};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(ids: &SelectedNodeIds, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ids.len()))?;
        for id in ids {
            map.serialize_entry(id, &true)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SelectedNodeIds, D::Error> {
        let raw = BTreeMap::<String, bool>::deserialize(deserializer)?;
        Ok(raw.into_iter().filter(|(_, selected)| *selected).map(|(id, _)| id).collect())
    }
}
