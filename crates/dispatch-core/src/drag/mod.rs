// ── Drag-and-assign interaction engine ──
//
// Everything here runs on the UI thread. Handles are `Rc`-based and cheap
// to clone; nothing is `Send`.

pub mod geometry;
pub mod guard;
pub mod registry;
pub mod session;
pub mod source;
pub mod zone;

pub use geometry::{Point, Rect};
pub use guard::DragGuard;
pub use registry::ZoneRegistry;
pub use session::{DragSession, InputModality};
pub use source::{DragOutcome, DragSource, DragState, GestureConfig, Haptics, NoHaptics};
pub use zone::{DropEvent, DropZone};

use std::rc::Rc;

use crate::bus::EventBus;
use crate::config::BoardConfig;
use crate::model::{Officer, ZoneId};

/// Shared wiring for one board: the bus, the zone map, and gesture tuning.
///
/// Sources and zones built through the context are connected to each
/// other; sources are also registered with the context's drag guard.
pub struct DragContext {
    bus: EventBus,
    zones: ZoneRegistry,
    gesture: GestureConfig,
    guard: DragGuard,
    haptics: Rc<dyn Haptics>,
}

impl DragContext {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            bus: EventBus::new(),
            zones: ZoneRegistry::new(),
            gesture: GestureConfig::from(config),
            guard: DragGuard::new(),
            haptics: Rc::new(NoHaptics),
        }
    }

    /// Haptics hook handed to every source built afterwards.
    pub fn with_haptics(mut self, haptics: Rc<dyn Haptics>) -> Self {
        self.haptics = haptics;
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    /// Build a drag source for `officer`, watched by the guard.
    pub fn source(&mut self, officer: Officer) -> DragSource {
        let source = DragSource::new(officer, self.bus.clone(), self.zones.clone(), self.gesture)
            .with_haptics(Rc::clone(&self.haptics));
        self.guard.watch(&source);
        source
    }

    /// Mount a drop zone listening on the context's bus.
    pub fn zone(
        &self,
        id: ZoneId,
        bounds: Rect,
        on_drop: impl FnMut(DropEvent) + 'static,
    ) -> DropZone {
        let zone = DropZone::new(id, bounds, self.zones.clone(), on_drop);
        zone.attach(&self.bus);
        zone
    }

    /// Forward a fresh interaction to the drag guard.
    pub fn interaction(&mut self, at: Point) -> usize {
        self.guard.on_interaction(at)
    }
}
