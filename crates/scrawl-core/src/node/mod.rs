//! Node definitions for the whiteboard.

mod style;

pub use style::{FillMode, LineDash, NodeColor, NodeStyle, StrokeSize};

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for nodes. Opaque; never reused once assigned.
pub type NodeId = String;

/// Generate a fresh node id.
pub fn generate_id() -> NodeId {
    Uuid::new_v4().to_string()
}

/// Node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Rectangle,
    /// `point` is the centre, `width`/`height` hold the radii.
    Ellipse,
    Arrow,
    /// Freehand path.
    Draw,
    Text,
}

impl NodeKind {
    /// Whether this kind stores its geometry in `points`.
    pub fn is_multi_point(self) -> bool {
        matches!(self, NodeKind::Arrow | NodeKind::Draw)
    }
}

/// Geometry and identity of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProps {
    pub id: NodeId,
    /// Primary anchor (origin corner, centre for ellipses, start point for paths).
    #[serde(with = "point_serde")]
    pub point: Point,
    /// Additional coordinates for multi-point nodes, in world space.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "points_serde")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Arrow bend ratio (0..1). `None` means a straight arrow through the midpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bend: Option<f64>,
}

fn default_visible() -> bool {
    true
}

/// A drawable entity on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Text content; only meaningful for [`NodeKind::Text`].
    #[serde(default)]
    pub text: Option<String>,
    pub style: NodeStyle,
    pub node_props: NodeProps,
}

impl Node {
    /// Create a node of the given kind anchored at `point` with default style.
    pub fn new(kind: NodeKind, point: Point) -> Self {
        Self {
            kind,
            text: None,
            style: NodeStyle::default(),
            node_props: NodeProps {
                id: generate_id(),
                point,
                points: None,
                width: None,
                height: None,
                rotation: 0.0,
                visible: true,
                bend: None,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.node_props.id
    }

    /// Builder-style id override (used for hydration and tests).
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.node_props.id = id.into();
        self
    }

    /// Builder-style size override.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.node_props.width = Some(width);
        self.node_props.height = Some(height);
        self
    }

    /// Builder-style points override.
    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.node_props.points = Some(points);
        self
    }

    /// Replace this node's id with a fresh one.
    pub fn regenerate_id(&mut self) {
        self.node_props.id = generate_id();
    }

    /// Clone this node under a fresh id.
    pub fn clone_with_new_id(&self) -> Self {
        let mut clone = self.clone();
        clone.regenerate_id();
        clone
    }

    /// Translate the anchor and every additional point.
    pub fn translate(&mut self, delta: Vec2) {
        self.node_props.point += delta;
        if let Some(points) = self.node_props.points.as_mut() {
            for p in points.iter_mut() {
                *p += delta;
            }
        }
    }

    /// Anchor followed by every additional point.
    pub fn all_points(&self) -> Vec<Point> {
        let mut pts = vec![self.node_props.point];
        if let Some(points) = &self.node_props.points {
            pts.extend(points.iter().copied());
        }
        pts
    }

    /// Axis-aligned bounding box in world coordinates, rotation included.
    pub fn bounds(&self) -> Rect {
        let props = &self.node_props;
        let p = props.point;
        let w = props.width.unwrap_or(0.0);
        let h = props.height.unwrap_or(0.0);

        match self.kind {
            NodeKind::Arrow | NodeKind::Draw => points_bounds(&self.all_points()),
            NodeKind::Ellipse => {
                let (rx, ry) = (w.abs(), h.abs());
                rotated(Rect::new(p.x - rx, p.y - ry, p.x + rx, p.y + ry), props.rotation, p)
            }
            NodeKind::Rectangle | NodeKind::Text => {
                rotated(Rect::from_points(p, Point::new(p.x + w, p.y + h)), props.rotation, p)
            }
        }
    }
}

/// Create a node at `point` with default style values.
pub fn create_node(kind: NodeKind, point: Point) -> Node {
    Node::new(kind, point)
}

/// Bounding box of a set of points.
pub fn points_bounds(points: &[Point]) -> Rect {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
}

fn rotated(rect: Rect, degrees: f64, pivot: Point) -> Rect {
    if degrees == 0.0 {
        return rect;
    }
    Affine::rotate_about(degrees.to_radians(), pivot).transform_rect_bbox(rect)
}

/// Serialize a point as `[x, y]`.
pub(crate) mod point_serde {
    use kurbo::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        [point.x, point.y].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
        Ok(Point::new(x, y))
    }
}

/// Serialize an optional point list as `[[x, y], ...]`.
pub(crate) mod points_serde {
    use kurbo::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        points: &Option<Vec<Point>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        points
            .as_ref()
            .map(|pts| pts.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<Point>>, D::Error> {
        let raw = Option::<Vec<[f64; 2]>>::deserialize(deserializer)?;
        Ok(raw.map(|pts| pts.into_iter().map(|[x, y]| Point::new(x, y)).collect()))
    }
}
