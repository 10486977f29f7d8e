//! Tool system for the whiteboard.
//!
//! The active [`ToolType`] lives in the canvas state; [`DraftManager`] tracks
//! the in-progress pointer interaction and turns it into canvas actions.

use crate::canvas::CanvasAction;
use crate::geometry::normalized_rect;
use crate::node::{Node, NodeKind, create_node};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    #[default]
    Select,
    /// Pans the stage; never creates nodes.
    Hand,
    Rectangle,
    Ellipse,
    Arrow,
    Draw,
    Text,
}

impl ToolType {
    pub const ALL: [ToolType; 7] = [
        ToolType::Select,
        ToolType::Hand,
        ToolType::Rectangle,
        ToolType::Ellipse,
        ToolType::Arrow,
        ToolType::Draw,
        ToolType::Text,
    ];

    /// Kind of node this tool drafts, if any.
    pub fn node_kind(self) -> Option<NodeKind> {
        match self {
            ToolType::Select | ToolType::Hand => None,
            ToolType::Rectangle => Some(NodeKind::Rectangle),
            ToolType::Ellipse => Some(NodeKind::Ellipse),
            ToolType::Arrow => Some(NodeKind::Arrow),
            ToolType::Draw => Some(NodeKind::Draw),
            ToolType::Text => Some(NodeKind::Text),
        }
    }
}

/// State of a pointer interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    /// Rubber-band selection with the select tool.
    Selecting { start: Point, current: Point },
    /// A node is being drafted. Text drafts wait for [`DraftManager::commit_text`].
    Drafting { start: Point, draft: Node },
}

/// Tracks the in-progress interaction on the stage.
#[derive(Debug, Clone, Default)]
pub struct DraftManager {
    pub state: ToolState,
}

impl DraftManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin an interaction on empty canvas at `point` (world coordinates).
    ///
    /// Returns the selection reset to dispatch, if any.
    pub fn press(&mut self, tool: ToolType, point: Point) -> Option<CanvasAction> {
        match tool {
            ToolType::Hand => return None,
            ToolType::Select => {
                self.state = ToolState::Selecting { start: point, current: point };
            }
            _ => {
                if let Some(kind) = tool.node_kind() {
                    self.state = ToolState::Drafting {
                        start: point,
                        draft: create_node(kind, point),
                    };
                }
            }
        }
        Some(CanvasAction::SetSelectedNodesIds(Vec::new()))
    }

    /// Pointer moved. Returns the current selection rectangle while selecting.
    pub fn drag(&mut self, point: Point) -> Option<Rect> {
        match &mut self.state {
            ToolState::Idle => None,
            ToolState::Selecting { start, current } => {
                *current = point;
                Some(normalized_rect(*start, point))
            }
            ToolState::Drafting { start, draft } => {
                draw_node(draft, *start, point);
                None
            }
        }
    }

    /// Pointer released. Returns the actions that commit the draft.
    pub fn release(&mut self, tool: ToolType) -> Vec<CanvasAction> {
        match std::mem::take(&mut self.state) {
            ToolState::Idle | ToolState::Selecting { .. } => Vec::new(),
            // text stays in draft until its content is entered
            ToolState::Drafting { start, draft } if draft.kind == NodeKind::Text => {
                self.state = ToolState::Drafting { start, draft };
                Vec::new()
            }
            ToolState::Drafting { draft, .. } => {
                if draft.kind == NodeKind::Arrow && draft.node_props.points.is_none() {
                    log::debug!("discarding arrow draft without an end point");
                    return Vec::new();
                }
                finish(draft, tool != ToolType::Draw)
            }
        }
    }

    /// Commit a text draft with its final content. Empty text discards it.
    pub fn commit_text(&mut self, text: &str) -> Vec<CanvasAction> {
        match std::mem::take(&mut self.state) {
            ToolState::Drafting { mut draft, .. } if draft.kind == NodeKind::Text => {
                draft.text = Some(text.to_string());
                finish(draft, true)
            }
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// Node currently being drafted.
    pub fn draft(&self) -> Option<&Node> {
        match &self.state {
            ToolState::Drafting { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Rubber-band rectangle while selecting.
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.state {
            ToolState::Selecting { start, current } => Some(normalized_rect(*start, *current)),
            _ => None,
        }
    }
}

fn finish(draft: Node, reset_tool: bool) -> Vec<CanvasAction> {
    if draft.kind == NodeKind::Text && draft.text.as_deref().is_none_or(str::is_empty) {
        return Vec::new();
    }
    let mut actions = vec![CanvasAction::AddNodes(vec![draft])];
    if reset_tool {
        actions.push(CanvasAction::SetToolType(ToolType::Select));
    }
    actions
}

/// Update a draft node's geometry for the pointer at `current`.
fn draw_node(draft: &mut Node, start: Point, current: Point) {
    let props = &mut draft.node_props;
    match draft.kind {
        NodeKind::Rectangle => {
            let rect = normalized_rect(start, current);
            props.point = rect.origin();
            props.width = Some(rect.width());
            props.height = Some(rect.height());
        }
        NodeKind::Ellipse => {
            props.width = Some((current.x - start.x).abs());
            props.height = Some((current.y - start.y).abs());
        }
        NodeKind::Arrow => props.points = Some(vec![current]),
        NodeKind::Draw => props.points.get_or_insert_with(Vec::new).push(current),
        NodeKind::Text => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(actions: &[CanvasAction]) -> &Node {
        match &actions[0] {
            CanvasAction::AddNodes(nodes) => &nodes[0],
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_default_tool() {
        assert_eq!(ToolType::default(), ToolType::Select);
    }

    #[test]
    fn test_tool_wire_names() {
        assert_eq!(serde_json::to_value(ToolType::Hand).unwrap(), "hand");
        assert_eq!(serde_json::to_value(ToolType::Rectangle).unwrap(), "rectangle");
    }

    #[test]
    fn test_hand_tool_does_nothing() {
        let mut dm = DraftManager::new();
        assert!(dm.press(ToolType::Hand, Point::ZERO).is_none());
        assert!(!dm.is_active());
    }

    #[test]
    fn test_press_clears_selection() {
        let mut dm = DraftManager::new();
        assert_eq!(
            dm.press(ToolType::Rectangle, Point::ZERO),
            Some(CanvasAction::SetSelectedNodesIds(Vec::new()))
        );
        assert!(dm.is_active());
    }

    #[test]
    fn test_rectangle_draft_any_direction() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Rectangle, Point::new(100.0, 100.0));
        dm.drag(Point::new(40.0, 70.0));

        let actions = dm.release(ToolType::Rectangle);
        let node = added(&actions);
        assert_eq!(node.kind, NodeKind::Rectangle);
        assert_eq!(node.node_props.point, Point::new(40.0, 70.0));
        assert_eq!(node.node_props.width, Some(60.0));
        assert_eq!(node.node_props.height, Some(30.0));
        assert_eq!(actions[1], CanvasAction::SetToolType(ToolType::Select));
        assert!(!dm.is_active());
    }

    #[test]
    fn test_ellipse_draft_uses_radii() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Ellipse, Point::new(50.0, 50.0));
        dm.drag(Point::new(30.0, 60.0));
        let actions = dm.release(ToolType::Ellipse);
        let node = added(&actions);
        assert_eq!(node.node_props.point, Point::new(50.0, 50.0));
        assert_eq!(node.node_props.width, Some(20.0));
        assert_eq!(node.node_props.height, Some(10.0));
    }

    #[test]
    fn test_arrow_without_points_is_discarded() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Arrow, Point::new(180.0, 100.0));
        assert!(dm.release(ToolType::Arrow).is_empty());
        assert!(!dm.is_active());
    }

    #[test]
    fn test_arrow_draft_commits() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Arrow, Point::new(180.0, 100.0));
        dm.drag(Point::new(200.0, 120.0));
        dm.drag(Point::new(250.0, 130.0));
        let actions = dm.release(ToolType::Arrow);
        let node = added(&actions);
        assert_eq!(node.node_props.point, Point::new(180.0, 100.0));
        assert_eq!(node.node_props.points, Some(vec![Point::new(250.0, 130.0)]));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_draw_keeps_tool() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Draw, Point::ZERO);
        dm.drag(Point::new(1.0, 1.0));
        dm.drag(Point::new(2.0, 3.0));
        let actions = dm.release(ToolType::Draw);
        assert_eq!(actions.len(), 1);
        assert_eq!(
            added(&actions).node_props.points,
            Some(vec![Point::new(1.0, 1.0), Point::new(2.0, 3.0)])
        );
    }

    #[test]
    fn test_text_waits_for_content() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Text, Point::new(5.0, 5.0));
        assert!(dm.release(ToolType::Text).is_empty());
        assert!(dm.draft().is_some());

        let actions = dm.commit_text("hello");
        assert_eq!(added(&actions).text.as_deref(), Some("hello"));
        assert!(dm.draft().is_none());
    }

    #[test]
    fn test_empty_text_is_discarded() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Text, Point::ZERO);
        assert!(dm.commit_text("").is_empty());
        assert!(!dm.is_active());
    }

    #[test]
    fn test_selection_rect_tracks_drag() {
        let mut dm = DraftManager::new();
        dm.press(ToolType::Select, Point::new(10.0, 10.0));
        let rect = dm.drag(Point::new(0.0, 5.0)).unwrap();
        assert_eq!(rect, Rect::new(0.0, 5.0, 10.0, 10.0));
        assert_eq!(dm.selection_rect(), Some(rect));
        assert!(dm.release(ToolType::Select).is_empty());
        assert!(dm.selection_rect().is_none());
    }
}
