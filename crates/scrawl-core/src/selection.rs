//! Rubber-band selection and its update throttle.

use crate::canvas::CanvasAction;
use crate::geometry::intersecting_node_ids;
use crate::node::Node;
use kurbo::Rect;
use std::time::{Duration, Instant};

/// Default delay between a drag update and the resulting selection change.
pub const SELECTION_THROTTLE: Duration = Duration::from_millis(35);

/// Coalesces rapid rubber-band updates into at most one selection change per
/// window. The latest rectangle wins.
#[derive(Debug, Clone)]
pub struct SelectionThrottle {
    delay: Duration,
    deadline: Option<Instant>,
    pending: Option<Rect>,
}

impl Default for SelectionThrottle {
    fn default() -> Self {
        Self::new(SELECTION_THROTTLE)
    }
}

impl SelectionThrottle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending: None,
        }
    }

    /// Record the latest selection rectangle.
    pub fn request(&mut self, rect: Rect, now: Instant) {
        self.pending = Some(rect);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.delay);
        }
    }

    /// Return the pending rectangle once the window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Rect> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Return the pending rectangle immediately, e.g. on pointer release.
    pub fn flush(&mut self) -> Option<Rect> {
        self.deadline = None;
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Selection action for every node touching `rect`.
pub fn select_in_rect(nodes: &[Node], rect: Rect) -> CanvasAction {
    CanvasAction::SetSelectedNodesIds(intersecting_node_ids(nodes, rect))
}
