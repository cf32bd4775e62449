// ── Drag guard ──
//
// On touch devices "draggable" is a persistent affordance rather than a
// momentary gesture, so an interrupted gesture (a second finger, a lost
// touch-end) can leave a source stuck armed or active. The guard is told
// about every fresh interaction on the board and force-resets any watched
// source whose element the interaction landed outside of.

use tracing::debug;

use super::geometry::Point;
use super::session::InputModality;
use super::source::{DragSource, DragState, WeakDragSource};

/// Explicit listener over a set of drag sources.
#[derive(Default)]
pub struct DragGuard {
    sources: Vec<WeakDragSource>,
}

impl DragGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching `source`. The guard does not keep it alive.
    pub fn watch(&mut self, source: &DragSource) {
        self.sources.push(source.downgrade());
    }

    /// Number of sources still alive.
    pub fn watched(&self) -> usize {
        self.sources.iter().filter(|s| s.upgrade().is_some()).count()
    }

    /// A new touch or pointer-down happened at `at`. Returns how many
    /// sources were reset.
    pub fn on_interaction(&mut self, at: Point) -> usize {
        self.sources.retain(|s| s.upgrade().is_some());

        let mut reset = 0;
        for source in self.sources.iter().filter_map(WeakDragSource::upgrade) {
            if !Self::is_stuck_outside(&source, at) {
                continue;
            }
            if source.force_reset() {
                debug!(officer = %source.officer().id, x = at.x, y = at.y, "drag guard reset stuck source");
                reset += 1;
            }
        }
        reset
    }

    fn is_stuck_outside(source: &DragSource, at: Point) -> bool {
        let touch_affordance = match source.state() {
            DragState::Armed => true,
            DragState::Active => source
                .session()
                .is_some_and(|s| s.modality == InputModality::Touch),
            DragState::Idle => source.is_draggable(),
        };
        touch_affordance && !source.bounds().is_some_and(|b| b.contains(at))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::bus::{DragSignal, EventBus, record};
    use crate::drag::geometry::Rect;
    use crate::drag::registry::ZoneRegistry;
    use crate::drag::source::GestureConfig;
    use crate::model::Officer;

    fn source(bus: &EventBus, id: &str, bounds: Rect) -> DragSource {
        let source = DragSource::new(
            Officer::new(id, id),
            bus.clone(),
            ZoneRegistry::new(),
            GestureConfig::default(),
        );
        source.set_bounds(bounds);
        source
    }

    #[test]
    fn outside_touch_resets_armed_and_active_sources() {
        let bus = EventBus::new();
        let (_sub, seen) = record(&bus);
        let armed = source(&bus, "O1", Rect::new(0, 0, 10, 2));
        let active = source(&bus, "O2", Rect::new(0, 2, 10, 2));
        let idle = source(&bus, "O3", Rect::new(0, 4, 10, 2));

        let mut guard = DragGuard::new();
        guard.watch(&armed);
        guard.watch(&active);
        guard.watch(&idle);

        let t0 = Instant::now();
        armed.touch_start(Point::new(1, 0), t0);
        active.touch_start(Point::new(1, 2), t0);
        active.tick(t0 + Duration::from_millis(500));
        assert!(active.is_draggable());

        assert_eq!(guard.on_interaction(Point::new(40, 20)), 2);
        assert_eq!(armed.state(), DragState::Idle);
        assert_eq!(active.state(), DragState::Idle);
        assert!(!active.is_draggable());
        assert_eq!(*seen.borrow(), vec![DragSignal::End]);
    }

    #[test]
    fn touch_inside_the_element_is_left_alone() {
        let bus = EventBus::new();
        let armed = source(&bus, "O1", Rect::new(0, 0, 10, 2));
        let mut guard = DragGuard::new();
        guard.watch(&armed);

        armed.touch_start(Point::new(1, 0), Instant::now());
        assert_eq!(guard.on_interaction(Point::new(3, 1)), 0);
        assert_eq!(armed.state(), DragState::Armed);
    }

    #[test]
    fn pointer_drags_are_not_touched() {
        let bus = EventBus::new();
        let pointer = source(&bus, "O1", Rect::new(0, 0, 10, 2));
        let mut guard = DragGuard::new();
        guard.watch(&pointer);

        pointer.begin_drag(Point::new(1, 1));
        assert_eq!(guard.on_interaction(Point::new(50, 50)), 0);
        assert_eq!(pointer.state(), DragState::Active);
    }

    #[test]
    fn dropped_sources_are_forgotten() {
        let bus = EventBus::new();
        let mut guard = DragGuard::new();
        {
            let temp = source(&bus, "O1", Rect::new(0, 0, 1, 1));
            guard.watch(&temp);
            assert_eq!(guard.watched(), 1);
        }
        assert_eq!(guard.watched(), 0);
        assert_eq!(guard.on_interaction(Point::new(5, 5)), 0);
    }
}
