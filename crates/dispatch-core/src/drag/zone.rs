//! Drop zone controller — one per assignment slot on the board.
//!
//! Tracks `Neutral ↔ Hovering` from two inputs: native drag-over /
//! drag-leave / drop events (pointer devices), and synthetic
//! [`DragSignal`]s from the [`EventBus`] (touch devices). Every accepted
//! drop invokes the caller's callback exactly once.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::geometry::{Point, Rect};
use super::registry::ZoneRegistry;
use super::session::InputModality;
use crate::bus::{DragSignal, EventBus, Subscription};
use crate::model::{DragPayload, OfficerId, ZoneId};

/// An accepted drop, handed to the assignment callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEvent {
    pub zone_id: ZoneId,
    pub officer_id: OfficerId,
    pub modality: InputModality,
}

type DropCallback = Box<dyn FnMut(DropEvent)>;

struct ZoneState {
    bounds: Rect,
    hovering: bool,
    /// Set once this gesture has delivered its drop; cleared by the next
    /// `End` signal or native drag-over.
    dropped: bool,
}

struct ZoneInner {
    id: ZoneId,
    registry: ZoneRegistry,
    state: RefCell<ZoneState>,
    on_drop: RefCell<DropCallback>,
    subscription: RefCell<Option<Subscription>>,
}

impl Drop for ZoneInner {
    fn drop(&mut self) {
        self.registry.unregister(&self.id);
    }
}

/// Cheaply cloneable handle to one drop zone.
#[derive(Clone)]
pub struct DropZone {
    inner: Rc<ZoneInner>,
}

impl DropZone {
    /// Mount a zone and register its bounds for touch hit-testing.
    pub fn new(
        id: ZoneId,
        bounds: Rect,
        registry: ZoneRegistry,
        on_drop: impl FnMut(DropEvent) + 'static,
    ) -> Self {
        registry.register(id.clone(), bounds);
        Self {
            inner: Rc::new(ZoneInner {
                id,
                registry,
                state: RefCell::new(ZoneState {
                    bounds,
                    hovering: false,
                    dropped: false,
                }),
                on_drop: RefCell::new(Box::new(on_drop)),
                subscription: RefCell::new(None),
            }),
        }
    }

    /// Listen for synthetic signals on `bus`. Re-attaching replaces the
    /// previous subscription.
    pub fn attach(&self, bus: &EventBus) {
        let weak: Weak<ZoneInner> = Rc::downgrade(&self.inner);
        let subscription = bus.subscribe(move |signal| {
            if let Some(inner) = weak.upgrade() {
                DropZone { inner }.handle_signal(signal);
            }
        });
        self.inner.subscription.replace(Some(subscription));
    }

    /// Stop listening for synthetic signals.
    pub fn detach(&self) {
        if let Some(subscription) = self.inner.subscription.take() {
            subscription.cancel();
        }
    }

    pub fn id(&self) -> &ZoneId {
        &self.inner.id
    }

    pub fn is_hovering(&self) -> bool {
        self.inner.state.borrow().hovering
    }

    pub fn bounds(&self) -> Rect {
        self.inner.state.borrow().bounds
    }

    /// Move or resize the zone after a layout pass.
    pub fn set_bounds(&self, bounds: Rect) {
        self.inner.state.borrow_mut().bounds = bounds;
        self.inner.registry.register(self.inner.id.clone(), bounds);
    }

    // ── Native (pointer) events ──────────────────────────────────────

    /// Native drag-over: the pointer is above this zone.
    pub fn drag_over(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.hovering = true;
        state.dropped = false;
    }

    /// Native drag-leave.
    pub fn drag_leave(&self) {
        self.inner.state.borrow_mut().hovering = false;
    }

    /// Native drop carrying the platform's drag data. Returns `true` if the
    /// drop was accepted and the callback ran.
    pub fn drop(&self, drag_data: &str) -> bool {
        let Some(payload) = DragPayload::from_drag_data(drag_data) else {
            self.inner.state.borrow_mut().hovering = false;
            return false;
        };
        self.accept(payload.officer_id, InputModality::Pointer)
    }

    // ── Synthetic (touch) events ─────────────────────────────────────

    fn handle_signal(&self, signal: &DragSignal) {
        match signal {
            DragSignal::Move { x, y, .. } => {
                let mut state = self.inner.state.borrow_mut();
                state.hovering = state.bounds.contains(Point::new(*x, *y));
            }
            DragSignal::Drop {
                target_zone_id,
                officer_id,
                ..
            } => {
                if *target_zone_id == self.inner.id {
                    self.accept(officer_id.clone(), InputModality::Touch);
                }
            }
            DragSignal::End => {
                let mut state = self.inner.state.borrow_mut();
                state.hovering = false;
                state.dropped = false;
            }
        }
    }

    fn accept(&self, officer_id: OfficerId, modality: InputModality) -> bool {
        {
            let mut state = self.inner.state.borrow_mut();
            state.hovering = false;
            if state.dropped {
                debug!(zone = %self.inner.id, officer = %officer_id, "duplicate drop ignored");
                return false;
            }
            state.dropped = true;
        }

        debug!(zone = %self.inner.id, officer = %officer_id, %modality, "drop accepted");
        let event = DropEvent {
            zone_id: self.inner.id.clone(),
            officer_id,
            modality,
        };
        (&mut *self.inner.on_drop.borrow_mut())(event);
        true
    }
}

impl std::fmt::Debug for DropZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropZone")
            .field("id", &self.inner.id)
            .field("hovering", &self.is_hovering())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn zone_with_log(
        id: &str,
        bounds: Rect,
        registry: &ZoneRegistry,
    ) -> (DropZone, Rc<RefCell<Vec<DropEvent>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let zone = DropZone::new(id.into(), bounds, registry.clone(), move |event| {
            sink.borrow_mut().push(event);
        });
        (zone, log)
    }

    fn mv(x: u16, y: u16) -> DragSignal {
        DragSignal::Move {
            x,
            y,
            officer_id: "O1".into(),
        }
    }

    fn drop_on(zone: &str) -> DragSignal {
        DragSignal::Drop {
            target_zone_id: zone.into(),
            officer_id: "O1".into(),
            x: 0,
            y: 0,
        }
    }

    #[test]
    fn native_drop_invokes_callback_once() {
        let registry = ZoneRegistry::new();
        let (zone, log) = zone_with_log("Patrol", Rect::new(0, 0, 10, 10), &registry);

        zone.drag_over();
        assert!(zone.is_hovering());
        assert!(zone.drop(r#"{"officerId":"O1","officerName":"Ada"}"#));
        assert!(!zone.drop(r#"{"officerId":"O1","officerName":"Ada"}"#));

        assert!(!zone.is_hovering());
        assert_eq!(
            *log.borrow(),
            vec![DropEvent {
                zone_id: "Patrol".into(),
                officer_id: "O1".into(),
                modality: InputModality::Pointer,
            }]
        );

        // A fresh drag-over re-arms the zone for the next gesture.
        zone.drag_over();
        assert!(zone.drop("O2"));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn drag_leave_clears_hover() {
        let registry = ZoneRegistry::new();
        let (zone, _log) = zone_with_log("Patrol", Rect::new(0, 0, 10, 10), &registry);
        zone.drag_over();
        zone.drag_leave();
        assert!(!zone.is_hovering());
    }

    #[test]
    fn empty_native_drop_is_rejected() {
        let registry = ZoneRegistry::new();
        let (zone, log) = zone_with_log("Patrol", Rect::new(0, 0, 10, 10), &registry);
        zone.drag_over();
        assert!(!zone.drop("  "));
        assert!(!zone.is_hovering());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn synthetic_moves_toggle_hover_by_bounds() {
        let bus = EventBus::new();
        let registry = ZoneRegistry::new();
        let (zone, _log) = zone_with_log("Patrol", Rect::new(10, 0, 10, 5), &registry);
        zone.attach(&bus);

        bus.publish(mv(12, 2));
        assert!(zone.is_hovering());
        bus.publish(mv(25, 2));
        assert!(!zone.is_hovering());
        bus.publish(mv(19, 4));
        assert!(zone.is_hovering());
        bus.publish(DragSignal::End);
        assert!(!zone.is_hovering());
    }

    #[test]
    fn synthetic_drop_is_addressed_by_zone_identity() {
        let bus = EventBus::new();
        let registry = ZoneRegistry::new();
        let (patrol, patrol_log) = zone_with_log("Patrol", Rect::new(0, 0, 10, 5), &registry);
        let (traffic, traffic_log) = zone_with_log("Traffic", Rect::new(10, 0, 10, 5), &registry);
        patrol.attach(&bus);
        traffic.attach(&bus);

        bus.publish(drop_on("Traffic"));
        bus.publish(drop_on("Traffic"));
        bus.publish(DragSignal::End);

        assert!(patrol_log.borrow().is_empty());
        assert_eq!(traffic_log.borrow().len(), 1);
        assert_eq!(traffic_log.borrow()[0].modality, InputModality::Touch);
    }

    #[test]
    fn native_and_synthetic_drop_in_one_gesture_invoke_once() {
        let bus = EventBus::new();
        let registry = ZoneRegistry::new();
        let (zone, log) = zone_with_log("Patrol", Rect::new(0, 0, 10, 5), &registry);
        zone.attach(&bus);

        bus.publish(drop_on("Patrol"));
        assert!(!zone.drop("O1"));
        bus.publish(DragSignal::End);

        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn detach_stops_synthetic_handling() {
        let bus = EventBus::new();
        let registry = ZoneRegistry::new();
        let (zone, log) = zone_with_log("Patrol", Rect::new(0, 0, 10, 5), &registry);
        zone.attach(&bus);
        zone.detach();
        zone.detach();

        bus.publish(drop_on("Patrol"));
        assert!(log.borrow().is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn dropping_the_zone_unregisters_its_bounds() {
        let bus = EventBus::new();
        let registry = ZoneRegistry::new();
        let (zone, _log) = zone_with_log("Patrol", Rect::new(0, 0, 10, 5), &registry);
        zone.attach(&bus);
        assert_eq!(registry.zone_at(Point::new(1, 1)), Some("Patrol".into()));

        zone.set_bounds(Rect::new(50, 0, 10, 5));
        assert_eq!(registry.zone_at(Point::new(1, 1)), None);
        assert_eq!(registry.zone_at(Point::new(51, 1)), Some("Patrol".into()));

        drop(zone);
        assert!(registry.is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
