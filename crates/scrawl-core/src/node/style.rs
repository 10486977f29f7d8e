//! Style enumerations for nodes.
//!
//! Every style field is a small closed set so peers always agree on the
//! palette; renderers convert to concrete colors and widths at draw time.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Palette colors available for strokes and fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    #[default]
    Black,
    Gray,
    Red,
    Orange,
    Yellow,
    Green,
    Teal,
    Blue,
    Indigo,
    Violet,
}

impl NodeColor {
    /// All palette entries in display order.
    pub const ALL: [NodeColor; 10] = [
        NodeColor::Black,
        NodeColor::Gray,
        NodeColor::Red,
        NodeColor::Orange,
        NodeColor::Yellow,
        NodeColor::Green,
        NodeColor::Teal,
        NodeColor::Blue,
        NodeColor::Indigo,
        NodeColor::Violet,
    ];

    /// RGB components of this palette entry.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            NodeColor::Black => (0x1e, 0x1e, 0x1e),
            NodeColor::Gray => (0x86, 0x8e, 0x96),
            NodeColor::Red => (0xe0, 0x31, 0x31),
            NodeColor::Orange => (0xf0, 0x8c, 0x00),
            NodeColor::Yellow => (0xfa, 0xb0, 0x05),
            NodeColor::Green => (0x2f, 0x9e, 0x44),
            NodeColor::Teal => (0x0c, 0xa6, 0x78),
            NodeColor::Blue => (0x19, 0x71, 0xc2),
            NodeColor::Indigo => (0x3b, 0x5b, 0xdb),
            NodeColor::Violet => (0x70, 0x48, 0xe8),
        }
    }

    /// Convert to a renderer color.
    pub fn to_color(self) -> Color {
        let (r, g, b) = self.rgb();
        Color::from_rgba8(r, g, b, 255)
    }
}

/// Stroke size categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl StrokeSize {
    pub const ALL: [StrokeSize; 4] = [
        StrokeSize::Small,
        StrokeSize::Medium,
        StrokeSize::Large,
        StrokeSize::ExtraLarge,
    ];

    /// Stroke width in world pixels.
    pub fn width(self) -> f64 {
        match self {
            StrokeSize::Small => 2.0,
            StrokeSize::Medium => 4.0,
            StrokeSize::Large => 6.0,
            StrokeSize::ExtraLarge => 8.0,
        }
    }
}

/// Line dash categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDash {
    Solid,
    Dashed,
    Dotted,
}

impl LineDash {
    pub const ALL: [LineDash; 3] = [LineDash::Solid, LineDash::Dashed, LineDash::Dotted];

    /// Dash pattern as `[dash, gap]` in world pixels. Solid lines use `[0, 0]`.
    pub fn dash_array(self) -> [f64; 2] {
        match self {
            LineDash::Solid => [0.0, 0.0],
            LineDash::Dashed => [16.0, 12.0],
            LineDash::Dotted => [1.0, 12.0],
        }
    }

    /// Dash pattern scaled by the stage zoom.
    pub fn scaled_dash_array(self, scale: f64) -> [f64; 2] {
        let [dash, gap] = self.dash_array();
        [dash * scale, gap * scale]
    }
}

/// Fill mode for closed shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    Solid,
    Semi,
}

/// Style properties of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub color: NodeColor,
    pub size: StrokeSize,
    pub line: LineDash,
    pub animated: bool,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<FillMode>,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            color: NodeColor::default(),
            size: StrokeSize::ALL[1],
            line: LineDash::ALL[0],
            animated: false,
            opacity: 1.0,
            fill: None,
        }
    }
}

impl NodeStyle {
    /// Stroke width at the given stage scale.
    pub fn stroke_width(&self, scale: f64) -> f64 {
        self.size.width() * scale
    }

    /// Stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Color {
        let rgba = self.color.to_color().to_rgba8();
        let alpha = (rgba.a as f64 * self.opacity.clamp(0.0, 1.0)) as u8;
        Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
    }
}
