// ── Drag session ──
//
// Ephemeral state of one move gesture. Owned by the drag source, never
// persisted, destroyed on drop, cancel, or tap.

use strum::Display;

use super::geometry::Point;
use crate::model::DragPayload;

/// How the gesture is being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum InputModality {
    /// Mouse / pen: the platform's native drag protocol carries the payload.
    Pointer,
    /// Touch-only: long-press to arm, signals travel over the event bus.
    Touch,
}

/// One in-flight drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub payload: DragPayload,
    pub modality: InputModality,
    /// Where the gesture started.
    pub origin: Point,
    /// Latest pointer / touch position.
    pub position: Point,
    /// Floating visual proxy position (touch only).
    pub proxy: Option<Point>,
}

impl DragSession {
    pub(crate) fn new(payload: DragPayload, modality: InputModality, origin: Point) -> Self {
        Self {
            payload,
            modality,
            origin,
            position: origin,
            proxy: matches!(modality, InputModality::Touch).then_some(origin),
        }
    }

    pub(crate) fn move_to(&mut self, point: Point) {
        self.position = point;
        if let Some(proxy) = self.proxy.as_mut() {
            *proxy = point;
        }
    }
}
