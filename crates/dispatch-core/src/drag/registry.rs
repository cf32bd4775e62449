// ── Drop zone registry ──
//
// Shared map of mounted drop zones and their bounds. Touch drags have no
// platform hit-testing, so the drag source asks the registry which zone
// lies under the release point.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::geometry::{Point, Rect};
use crate::model::ZoneId;

/// Cheaply cloneable handle to the zone map of one board.
#[derive(Clone, Default)]
pub struct ZoneRegistry {
    zones: Rc<RefCell<IndexMap<ZoneId, Rect>>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or move a zone.
    pub fn register(&self, id: ZoneId, bounds: Rect) {
        self.zones.borrow_mut().insert(id, bounds);
    }

    pub fn unregister(&self, id: &ZoneId) {
        self.zones.borrow_mut().shift_remove(id);
    }

    pub fn bounds(&self, id: &ZoneId) -> Option<Rect> {
        self.zones.borrow().get(id).copied()
    }

    /// The zone containing `point`. When zones overlap, the most recently
    /// registered one wins (it is drawn on top).
    pub fn zone_at(&self, point: Point) -> Option<ZoneId> {
        self.zones
            .borrow()
            .iter()
            .rev()
            .find(|(_, bounds)| bounds.contains(point))
            .map(|(id, _)| id.clone())
    }

    pub fn len(&self) -> usize {
        self.zones.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_at_finds_containing_zone() {
        let registry = ZoneRegistry::new();
        registry.register("Patrol".into(), Rect::new(0, 0, 10, 10));
        registry.register("Traffic".into(), Rect::new(10, 0, 10, 10));

        assert_eq!(registry.zone_at(Point::new(12, 3)), Some("Traffic".into()));
        assert_eq!(registry.zone_at(Point::new(30, 3)), None);
    }

    #[test]
    fn overlapping_zones_prefer_latest() {
        let registry = ZoneRegistry::new();
        registry.register("Below".into(), Rect::new(0, 0, 10, 10));
        registry.register("Above".into(), Rect::new(5, 5, 10, 10));
        assert_eq!(registry.zone_at(Point::new(6, 6)), Some("Above".into()));
    }

    #[test]
    fn unregister_removes_zone() {
        let registry = ZoneRegistry::new();
        registry.register("Patrol".into(), Rect::new(0, 0, 10, 10));
        registry.unregister(&"Patrol".into());
        assert!(registry.is_empty());
        assert_eq!(registry.zone_at(Point::new(1, 1)), None);
    }
}
