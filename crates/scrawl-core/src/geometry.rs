//! Pure geometry helpers: z-order reordering, duplication offsets, arrow
//! control points and axis-aligned intersection tests.

use crate::node::{Node, NodeId, NodeKind};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Horizontal gap in pixels between originals and their duplicates.
pub const DUPLICATION_GAP: f64 = 16.0;

/// Direction of a z-order move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReorderDirection {
    /// Move to the bottom of the stack (drawn first).
    ToStart,
    /// Move to the top of the stack (drawn last).
    ToEnd,
    /// Nudge one slot towards the top.
    Forward,
    /// Nudge one slot towards the bottom.
    Backward,
}

/// Reorder `nodes` by moving those whose id is in `ids`.
///
/// Each id is consumed by its first match, so a later node sharing that id
/// stays where it is. Unknown ids are ignored and lists of one or zero nodes
/// are returned unchanged.
pub fn reorder_nodes(nodes: &[Node], ids: &[NodeId], direction: ReorderDirection) -> Vec<Node> {
    let mut result = nodes.to_vec();
    if result.len() <= 1 {
        return result;
    }

    let mut pending: HashSet<&str> = ids.iter().map(String::as_str).collect();

    match direction {
        ReorderDirection::ToStart | ReorderDirection::ToEnd => {
            let mut moved = Vec::new();
            let mut rest = Vec::with_capacity(result.len());
            for node in result {
                if pending.remove(node.id()) {
                    moved.push(node);
                } else {
                    rest.push(node);
                }
            }
            if direction == ReorderDirection::ToStart {
                // Every match is prepended in scan order, so the last match ends up first.
                moved.reverse();
                moved.extend(rest);
                moved
            } else {
                rest.extend(moved);
                rest
            }
        }
        ReorderDirection::Forward => {
            for index in (0..result.len() - 1).rev() {
                if pending.remove(result[index].id()) {
                    result.swap(index, index + 1);
                }
            }
            result
        }
        ReorderDirection::Backward => {
            for index in 1..result.len() {
                if pending.remove(result[index].id()) {
                    result.swap(index, index - 1);
                }
            }
            result
        }
    }
}

/// Leftmost x of a node, taking its extra points into account.
fn min_x(node: &Node) -> f64 {
    if node.kind.is_multi_point() {
        node.all_points().iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
    } else {
        node.node_props.point.x
    }
}

/// Rightmost x of a node. Ellipses store a radius in `width`, so it is doubled.
fn max_x(node: &Node) -> f64 {
    let props = &node.node_props;
    let width = props.width.unwrap_or(0.0);
    match node.kind {
        NodeKind::Arrow | NodeKind::Draw => node
            .all_points()
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max),
        NodeKind::Ellipse => props.point.x + width * 2.0,
        NodeKind::Rectangle | NodeKind::Text => props.point.x + width,
    }
}

/// Horizontal distance that moves a group of nodes just right of itself.
///
/// Returns `None` for an empty group.
pub fn duplication_offset(nodes: &[Node], gap: f64) -> Option<f64> {
    if nodes.is_empty() {
        return None;
    }
    let min = nodes.iter().map(min_x).fold(f64::INFINITY, f64::min);
    let max = nodes.iter().map(max_x).fold(f64::NEG_INFINITY, f64::max);
    Some((max + gap) - min)
}

/// Clone `nodes` under fresh ids, shifted right past the group's extent.
pub fn duplicate_nodes(nodes: &[Node], gap: f64) -> Vec<Node> {
    let Some(distance) = duplication_offset(nodes, gap) else {
        return Vec::new();
    };
    nodes
        .iter()
        .map(|node| {
            let mut clone = node.clone_with_new_id();
            clone.translate(Vec2::new(distance, 0.0));
            clone
        })
        .collect()
}

/// Clamp an arrow control point into the box spanned by its endpoints.
pub fn clamp_control_point(point: Point, start: Point, end: Point) -> Point {
    let bounds = Rect::from_points(start, end);
    Point::new(
        point.x.clamp(bounds.x0, bounds.x1),
        point.y.clamp(bounds.y0, bounds.y1),
    )
}

fn ratio(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span.abs() < f64::EPSILON {
        return 0.5;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// Bend ratio (0..1, two decimals) for a control point between `start` and `end`.
pub fn bend_ratio(point: Point, start: Point, end: Point) -> f64 {
    let bounds = Rect::from_points(start, end);
    let bx = ratio(point.x, bounds.x0, bounds.x1);
    let by = ratio(point.y, bounds.y0, bounds.y1);
    (((bx + by) / 2.0) * 100.0).round() / 100.0
}

/// Control point position for a bend ratio. Inverse of [`bend_ratio`] along the diagonal.
pub fn bend_point(start: Point, end: Point, bend: f64) -> Point {
    let bounds = Rect::from_points(start, end);
    let t = bend.clamp(0.0, 1.0);
    Point::new(
        bounds.x0 + bounds.width() * t,
        bounds.y0 + bounds.height() * t,
    )
}

/// Rectangle spanned by two dragged corners, regardless of drag direction.
pub fn normalized_rect(a: Point, b: Point) -> Rect {
    Rect::from_points(a, b)
}

/// Axis-aligned overlap: true unless one box lies entirely to one side of the other.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    !(a.x1 < b.x0 || b.x1 < a.x0 || a.y1 < b.y0 || b.y1 < a.y0)
}

/// Ids of the nodes whose bounding box overlaps `rect`, in z-order.
pub fn intersecting_node_ids(nodes: &[Node], rect: Rect) -> Vec<NodeId> {
    nodes
        .iter()
        .filter(|node| rects_overlap(node.bounds(), rect))
        .map(|node| node.node_props.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> Vec<Node> {
        (1..=count)
            .map(|i| Node::new(NodeKind::Rectangle, Point::ZERO).with_id(format!("n{i}")))
            .collect()
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(Node::id).collect()
    }

    fn targets(list: &[&str]) -> Vec<NodeId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_move_to_start() {
        let nodes = numbered(5);
        let result = reorder_nodes(&nodes, &targets(&["n3", "n5"]), ReorderDirection::ToStart);
        assert_eq!(ids(&result), ["n5", "n3", "n1", "n2", "n4"]);
    }

    #[test]
    fn test_move_to_end() {
        let nodes = numbered(5);
        let result = reorder_nodes(&nodes, &targets(&["n2", "n4"]), ReorderDirection::ToEnd);
        assert_eq!(ids(&result), ["n1", "n3", "n5", "n2", "n4"]);
    }

    #[test]
    fn test_move_to_end_adjacent_targets_keep_order() {
        let nodes = numbered(4);
        let result = reorder_nodes(&nodes, &targets(&["n1", "n2"]), ReorderDirection::ToEnd);
        assert_eq!(ids(&result), ["n3", "n4", "n1", "n2"]);
    }

    #[test]
    fn test_move_forward() {
        let nodes = numbered(5);
        let result = reorder_nodes(&nodes, &targets(&["n2", "n4"]), ReorderDirection::Forward);
        assert_eq!(ids(&result), ["n1", "n3", "n2", "n5", "n4"]);
    }

    #[test]
    fn test_move_backward() {
        let nodes = numbered(5);
        let result = reorder_nodes(&nodes, &targets(&["n3", "n5"]), ReorderDirection::Backward);
        assert_eq!(ids(&result), ["n1", "n3", "n2", "n5", "n4"]);
    }

    #[test]
    fn test_forward_moves_exactly_one_slot() {
        let nodes = numbered(5);
        let result = reorder_nodes(&nodes, &targets(&["n1"]), ReorderDirection::Forward);
        assert_eq!(ids(&result), ["n2", "n1", "n3", "n4", "n5"]);
    }

    #[test]
    fn test_edges_stay_put() {
        let nodes = numbered(3);
        let fwd = reorder_nodes(&nodes, &targets(&["n3"]), ReorderDirection::Forward);
        assert_eq!(ids(&fwd), ["n1", "n2", "n3"]);
        let back = reorder_nodes(&nodes, &targets(&["n1"]), ReorderDirection::Backward);
        assert_eq!(ids(&back), ["n1", "n2", "n3"]);
    }

    #[test]
    fn test_single_node_unchanged() {
        let nodes = numbered(1);
        for direction in [
            ReorderDirection::ToStart,
            ReorderDirection::ToEnd,
            ReorderDirection::Forward,
            ReorderDirection::Backward,
        ] {
            let result = reorder_nodes(&nodes, &targets(&["n1"]), direction);
            assert_eq!(ids(&result), ["n1"]);
        }
    }

    #[test]
    fn test_empty_list() {
        let result = reorder_nodes(&[], &targets(&["n1"]), ReorderDirection::ToStart);
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let nodes = numbered(3);
        let result = reorder_nodes(&nodes, &targets(&["zzz"]), ReorderDirection::ToStart);
        assert_eq!(ids(&result), ["n1", "n2", "n3"]);
    }

    #[test]
    fn test_duplicate_ids_move_first_match_only() {
        let nodes: Vec<Node> = numbered(5).into_iter().map(|n| n.with_id("1")).collect();
        let originals: Vec<Point> = nodes.iter().map(|n| n.node_props.point).collect();
        let result = reorder_nodes(&nodes, &targets(&["1", "1"]), ReorderDirection::ToStart);
        assert_eq!(ids(&result), ["1", "1", "1", "1", "1"]);
        assert_eq!(result.len(), originals.len());

        let mut marked = numbered(3);
        marked[0] = marked[0].clone().with_id("dup");
        marked[2] = marked[2].clone().with_id("dup");
        marked[2].node_props.point = Point::new(99.0, 0.0);
        let result = reorder_nodes(&marked, &targets(&["dup"]), ReorderDirection::ToEnd);
        assert_eq!(ids(&result), ["n2", "dup", "dup"]);
        assert_eq!(result[1].node_props.point, Point::new(99.0, 0.0));
        assert_eq!(result[2].node_props.point, Point::ZERO);
    }

    #[test]
    fn test_duplicate_rectangles_offset() {
        let a = Node::new(NodeKind::Rectangle, Point::new(0.0, 0.0)).with_size(50.0, 20.0);
        let b = Node::new(NodeKind::Rectangle, Point::new(100.0, 40.0)).with_size(50.0, 20.0);
        let clones = duplicate_nodes(&[a.clone(), b.clone()], DUPLICATION_GAP);

        let shift = (150.0 + DUPLICATION_GAP) - 0.0;
        assert_eq!(clones.len(), 2);
        assert_eq!(clones[0].node_props.point, Point::new(shift, 0.0));
        assert_eq!(clones[1].node_props.point, Point::new(100.0 + shift, 40.0));
        assert_ne!(clones[0].id(), a.id());
        assert_ne!(clones[1].id(), b.id());
    }

    #[test]
    fn test_duplicate_ellipse_doubles_radius() {
        let e = Node::new(NodeKind::Ellipse, Point::new(10.0, 0.0)).with_size(20.0, 20.0);
        assert_eq!(duplication_offset(&[e], 16.0), Some((10.0 + 40.0 + 16.0) - 10.0));
    }

    #[test]
    fn test_duplicate_path_translates_points() {
        let arrow = Node::new(NodeKind::Arrow, Point::new(20.0, 0.0))
            .with_points(vec![Point::new(5.0, 10.0), Point::new(60.0, 10.0)]);
        let clones = duplicate_nodes(std::slice::from_ref(&arrow), 10.0);
        // min x = 5, max x = 60 => distance 65
        assert_eq!(clones[0].node_props.point, Point::new(85.0, 0.0));
        assert_eq!(
            clones[0].node_props.points,
            Some(vec![Point::new(70.0, 10.0), Point::new(125.0, 10.0)])
        );
    }

    #[test]
    fn test_duplicate_empty() {
        assert!(duplicate_nodes(&[], DUPLICATION_GAP).is_empty());
        assert_eq!(duplication_offset(&[], DUPLICATION_GAP), None);
    }

    #[test]
    fn test_clamp_control_point() {
        let start = Point::new(0.0, 100.0);
        let end = Point::new(100.0, 0.0);
        assert_eq!(
            clamp_control_point(Point::new(150.0, -20.0), start, end),
            Point::new(100.0, 0.0)
        );
        assert_eq!(
            clamp_control_point(Point::new(40.0, 60.0), start, end),
            Point::new(40.0, 60.0)
        );
    }

    #[test]
    fn test_bend_ratio_and_point() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(100.0, 50.0);
        assert_eq!(bend_ratio(Point::new(50.0, 25.0), start, end), 0.5);
        assert_eq!(bend_ratio(Point::new(100.0, 50.0), start, end), 1.0);
        assert_eq!(bend_point(start, end, 0.5), Point::new(50.0, 25.0));
        // Horizontal arrow: the flat axis contributes the midpoint ratio.
        assert_eq!(
            bend_ratio(Point::new(100.0, 0.0), start, Point::new(100.0, 0.0)),
            0.75
        );
    }

    #[test]
    fn test_rects_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rects_overlap(a, Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(rects_overlap(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!rects_overlap(a, Rect::new(11.0, 0.0, 20.0, 10.0)));
        assert!(!rects_overlap(a, Rect::new(0.0, -20.0, 10.0, -1.0)));
    }

    #[test]
    fn test_normalized_rect_any_direction() {
        let r = normalized_rect(Point::new(10.0, 10.0), Point::new(0.0, 0.0));
        assert_eq!(r, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_intersecting_node_ids() {
        let nodes = vec![
            Node::new(NodeKind::Rectangle, Point::new(0.0, 0.0)).with_size(10.0, 10.0).with_id("a"),
            Node::new(NodeKind::Rectangle, Point::new(50.0, 50.0)).with_size(10.0, 10.0).with_id("b"),
            Node::new(NodeKind::Ellipse, Point::new(100.0, 100.0)).with_size(5.0, 5.0).with_id("c"),
        ];
        let rect = normalized_rect(Point::new(96.0, 96.0), Point::new(5.0, 5.0));
        assert_eq!(intersecting_node_ids(&nodes, rect), ["a", "b", "c"]);
        let rect = normalized_rect(Point::new(20.0, 20.0), Point::new(40.0, 40.0));
        assert!(intersecting_node_ids(&nodes, rect).is_empty());
    }
}
