//! Stage configuration: the pan/zoom view transform.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum allowed stage scale.
pub const MIN_SCALE: f64 = 0.1;
/// Maximum allowed stage scale.
pub const MAX_SCALE: f64 = 10.0;
/// Scale factor applied per wheel step.
pub const ZOOM_STEP: f64 = 1.1;

/// Stage position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StagePosition {
    pub x: f64,
    pub y: f64,
}

impl From<StagePosition> for Vec2 {
    fn from(p: StagePosition) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for StagePosition {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// View transform of the canvas. Not node data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub position: StagePosition,
    pub scale: f64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            position: StagePosition::default(),
            scale: 1.0,
        }
    }
}

/// Partial stage update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<StagePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl StageConfig {
    /// Merge a partial update into this config.
    pub fn merge(&mut self, patch: StageConfigPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(scale) = patch.scale {
            self.scale = scale;
        }
    }

    /// World to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(Vec2::from(self.position)) * Affine::scale(self.scale)
    }

    /// Screen to world transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-Vec2::from(self.position))
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Zoom for a wheel event, keeping `pointer` (screen coordinates) fixed.
    ///
    /// Negative `delta_y` zooms in. Returns `None` when the resulting scale
    /// would leave `[MIN_SCALE, MAX_SCALE]`.
    pub fn zoomed_at(&self, pointer: Point, delta_y: f64) -> Option<StageConfigPatch> {
        let new_scale = if delta_y < 0.0 {
            self.scale * ZOOM_STEP
        } else {
            self.scale / ZOOM_STEP
        };
        if !(MIN_SCALE..=MAX_SCALE).contains(&new_scale) {
            return None;
        }

        let world = self.screen_to_world(pointer);
        let position = StagePosition {
            x: pointer.x - world.x * new_scale,
            y: pointer.y - world.y * new_scale,
        };
        Some(StageConfigPatch {
            position: Some(position),
            scale: Some(new_scale),
        })
    }
}
