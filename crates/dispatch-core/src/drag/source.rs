//! Drag source controller — one per draggable officer element.
//!
//! Drives two gesture protocols behind one state machine:
//!
//! ```text
//! Idle ──begin_drag──────────────────────────▶ Active ──end_drag──▶ Idle
//! Idle ──touch_start──▶ Armed ──long press──▶ Active ──touch_end──▶ Idle
//!                        │                      │
//!                        └─ move / release ─────┴─ force_reset ───▶ Idle
//! ```
//!
//! Pointer drags go straight to `Active` and hand their payload to the
//! platform as native drag data; they never touch the [`EventBus`]. Touch
//! drags must be held for the long-press duration before they activate,
//! which separates drag intent from taps and scrolls. Once active, every
//! touch-move publishes [`DragSignal::Move`], and release publishes an
//! optional [`DragSignal::Drop`] followed by an unconditional
//! [`DragSignal::End`].
//!
//! The long-press timer is driven by timestamps: the host calls
//! [`DragSource::tick`] periodically, and every touch handler first fires
//! a timer that is already due.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use strum::Display;
use tracing::debug;

use super::geometry::{Point, Rect};
use super::registry::ZoneRegistry;
use super::session::{DragSession, InputModality};
use crate::bus::{DragSignal, EventBus};
use crate::config::BoardConfig;
use crate::model::{DragPayload, Officer};

/// Gesture tuning shared by every source on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    pub long_press: Duration,
    pub touch_tolerance: u16,
}

impl From<&BoardConfig> for GestureConfig {
    fn from(config: &BoardConfig) -> Self {
        Self {
            long_press: config.long_press,
            touch_tolerance: config.touch_tolerance,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::from(&BoardConfig::default())
    }
}

/// Feedback hook fired when a touch drag activates.
pub trait Haptics {
    fn pulse(&self);
}

/// Haptics for devices without a vibration motor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self) {}
}

/// Current phase of the source's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DragState {
    Idle,
    /// Touch held, waiting for the long-press timer.
    Armed,
    Active,
}

/// How the last gesture that reached `Active` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DragOutcome {
    Dropped,
    Cancelled,
}

struct PendingPress {
    start: Point,
    last: Point,
    deadline: Instant,
}

struct SourceState {
    phase: DragState,
    session: Option<DragSession>,
    press: Option<PendingPress>,
    /// Persistent "element is draggable" affordance (touch only).
    draggable: bool,
    bounds: Option<Rect>,
    last_outcome: Option<DragOutcome>,
}

pub(crate) struct SourceInner {
    officer: Officer,
    bus: EventBus,
    zones: ZoneRegistry,
    gesture: GestureConfig,
    haptics: Rc<dyn Haptics>,
    state: RefCell<SourceState>,
}

/// Cheaply cloneable handle to one drag source.
#[derive(Clone)]
pub struct DragSource {
    inner: Rc<SourceInner>,
}

impl DragSource {
    pub fn new(officer: Officer, bus: EventBus, zones: ZoneRegistry, gesture: GestureConfig) -> Self {
        Self {
            inner: Rc::new(SourceInner {
                officer,
                bus,
                zones,
                gesture,
                haptics: Rc::new(NoHaptics),
                state: RefCell::new(SourceState {
                    phase: DragState::Idle,
                    session: None,
                    press: None,
                    draggable: false,
                    bounds: None,
                    last_outcome: None,
                }),
            }),
        }
    }

    /// Replace the haptics hook. Only valid before the handle is cloned.
    pub fn with_haptics(mut self, haptics: Rc<dyn Haptics>) -> Self {
        if let Some(inner) = Rc::get_mut(&mut self.inner) {
            inner.haptics = haptics;
        }
        self
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn officer(&self) -> &Officer {
        &self.inner.officer
    }

    pub fn state(&self) -> DragState {
        self.inner.state.borrow().phase
    }

    pub fn session(&self) -> Option<DragSession> {
        self.inner.state.borrow().session.clone()
    }

    /// Whether the element currently shows the touch drag affordance.
    pub fn is_draggable(&self) -> bool {
        self.inner.state.borrow().draggable
    }

    /// Position of the floating proxy, while a touch drag is active.
    pub fn proxy(&self) -> Option<Point> {
        self.inner
            .state
            .borrow()
            .session
            .as_ref()
            .and_then(|s| s.proxy)
    }

    pub fn last_outcome(&self) -> Option<DragOutcome> {
        self.inner.state.borrow().last_outcome
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.inner.state.borrow().bounds
    }

    /// Update where the element is drawn (used by the drag guard).
    pub fn set_bounds(&self, bounds: Rect) {
        self.inner.state.borrow_mut().bounds = Some(bounds);
    }

    pub fn payload(&self) -> DragPayload {
        self.inner.officer.drag_payload()
    }

    /// Native drag data for the in-flight pointer drag.
    pub fn drag_data(&self) -> Option<String> {
        let state = self.inner.state.borrow();
        state
            .session
            .as_ref()
            .filter(|s| s.modality == InputModality::Pointer)
            .map(|s| s.payload.to_drag_data())
    }

    // ── Pointer protocol ─────────────────────────────────────────────

    /// Native drag-start. Returns the drag data to hand to the platform, or
    /// `None` if another gesture is already in progress.
    pub fn begin_drag(&self, at: Point) -> Option<String> {
        let mut state = self.inner.state.borrow_mut();
        if state.phase != DragState::Idle {
            return None;
        }
        let session = DragSession::new(self.payload(), InputModality::Pointer, at);
        let data = session.payload.to_drag_data();
        state.session = Some(session);
        state.phase = DragState::Active;
        debug!(officer = %self.inner.officer.id, "pointer drag started");
        Some(data)
    }

    /// Native drag-over tracking; updates the session position only.
    pub fn pointer_move(&self, at: Point) {
        let mut state = self.inner.state.borrow_mut();
        if let Some(session) = state
            .session
            .as_mut()
            .filter(|s| s.modality == InputModality::Pointer)
        {
            session.move_to(at);
        }
    }

    /// Native drag-end.
    pub fn end_drag(&self, outcome: DragOutcome) {
        let mut state = self.inner.state.borrow_mut();
        let is_pointer = state
            .session
            .as_ref()
            .is_some_and(|s| s.modality == InputModality::Pointer);
        if state.phase != DragState::Active || !is_pointer {
            return;
        }
        state.session = None;
        state.phase = DragState::Idle;
        state.last_outcome = Some(outcome);
        debug!(officer = %self.inner.officer.id, %outcome, "pointer drag ended");
    }

    /// Pointer pressed at `at`. Starts a native drag if the press lands on
    /// the element (or its bounds are not known yet).
    pub fn pointer_down(&self, at: Point) -> Option<String> {
        if self.bounds().is_some_and(|b| !b.contains(at)) {
            return None;
        }
        self.begin_drag(at)
    }

    /// Pointer released; `accepted` is whether a zone took the drop.
    pub fn pointer_up(&self, accepted: bool) {
        self.end_drag(if accepted {
            DragOutcome::Dropped
        } else {
            DragOutcome::Cancelled
        });
    }

    // ── Touch protocol ───────────────────────────────────────────────

    /// Touch-start on the element: arm the long-press timer.
    pub fn touch_start(&self, at: Point, now: Instant) {
        let mut state = self.inner.state.borrow_mut();
        if state.phase != DragState::Idle {
            return;
        }
        state.press = Some(PendingPress {
            start: at,
            last: at,
            deadline: now + self.inner.gesture.long_press,
        });
        state.phase = DragState::Armed;
        debug!(officer = %self.inner.officer.id, "touch armed");
    }

    /// Fire the long-press timer if it is due. Returns `true` if the
    /// source became active.
    pub fn tick(&self, now: Instant) -> bool {
        let activated = {
            let mut state = self.inner.state.borrow_mut();
            self.fire_due(&mut state, now)
        };
        if activated {
            self.inner.haptics.pulse();
        }
        activated
    }

    /// Touch-move anywhere after a touch-start on this element.
    pub fn touch_move(&self, at: Point, now: Instant) {
        self.tick(now);

        let signal = {
            let mut state = self.inner.state.borrow_mut();
            match state.phase {
                DragState::Idle => None,
                DragState::Armed => {
                    let moved_too_far = state
                        .press
                        .as_ref()
                        .is_some_and(|p| p.start.distance(at) > self.inner.gesture.touch_tolerance);
                    if moved_too_far {
                        debug!(officer = %self.inner.officer.id, "touch moved before long press, treating as scroll");
                        Self::reset(&mut state);
                    } else if let Some(press) = state.press.as_mut() {
                        press.last = at;
                    }
                    None
                }
                DragState::Active => state
                    .session
                    .as_mut()
                    .filter(|s| s.modality == InputModality::Touch)
                    .map(|session| {
                        session.move_to(at);
                        DragSignal::Move {
                            x: at.x,
                            y: at.y,
                            officer_id: session.payload.officer_id.clone(),
                        }
                    }),
            }
        };

        if let Some(signal) = signal {
            self.inner.bus.publish(signal);
        }
    }

    /// Touch-end. Publishes `Drop` (if released over a zone) then `End`.
    pub fn touch_end(&self, at: Point, now: Instant) {
        self.tick(now);

        let officer_id = {
            let mut state = self.inner.state.borrow_mut();
            match state.phase {
                DragState::Idle => return,
                DragState::Armed => {
                    debug!(officer = %self.inner.officer.id, "touch released before long press, treating as tap");
                    Self::reset(&mut state);
                    return;
                }
                DragState::Active => {
                    let Some(session) = state.session.as_ref() else {
                        Self::reset(&mut state);
                        return;
                    };
                    if session.modality != InputModality::Touch {
                        return;
                    }
                    session.payload.officer_id.clone()
                }
            }
        };

        let target = self.inner.zones.zone_at(at);
        let outcome = match target {
            Some(target_zone_id) => {
                debug!(officer = %officer_id, zone = %target_zone_id, "touch drop");
                self.inner.bus.publish(DragSignal::Drop {
                    target_zone_id,
                    officer_id,
                    x: at.x,
                    y: at.y,
                });
                DragOutcome::Dropped
            }
            None => {
                debug!(officer = %officer_id, "touch released outside every zone");
                DragOutcome::Cancelled
            }
        };

        {
            let mut state = self.inner.state.borrow_mut();
            Self::reset(&mut state);
            state.last_outcome = Some(outcome);
        }
        self.inner.bus.publish(DragSignal::End);
    }

    /// Abandon whatever gesture is in progress.
    ///
    /// An active touch drag still publishes `End` so drop zones clear
    /// their hover state. Returns `true` if anything was reset.
    pub fn force_reset(&self) -> bool {
        let publish_end = {
            let mut state = self.inner.state.borrow_mut();
            let publish_end = match state.phase {
                DragState::Idle => {
                    let was_stuck = state.draggable;
                    state.draggable = false;
                    return was_stuck;
                }
                DragState::Armed => false,
                DragState::Active => {
                    state.last_outcome = Some(DragOutcome::Cancelled);
                    state
                        .session
                        .as_ref()
                        .is_some_and(|s| s.modality == InputModality::Touch)
                }
            };
            Self::reset(&mut state);
            publish_end
        };

        debug!(officer = %self.inner.officer.id, "drag source force-reset");
        if publish_end {
            self.inner.bus.publish(DragSignal::End);
        }
        true
    }

    // ── Internals ────────────────────────────────────────────────────

    fn fire_due(&self, state: &mut SourceState, now: Instant) -> bool {
        if state.phase != DragState::Armed {
            return false;
        }
        let Some(press) = state.press.as_ref().filter(|p| now >= p.deadline) else {
            return false;
        };
        let mut session = DragSession::new(self.payload(), InputModality::Touch, press.start);
        session.move_to(press.last);
        state.session = Some(session);
        state.press = None;
        state.draggable = true;
        state.phase = DragState::Active;
        debug!(officer = %self.inner.officer.id, "long press elapsed, touch drag active");
        true
    }

    fn reset(state: &mut SourceState) {
        state.phase = DragState::Idle;
        state.session = None;
        state.press = None;
        state.draggable = false;
    }

    pub(crate) fn downgrade(&self) -> WeakDragSource {
        WeakDragSource(Rc::downgrade(&self.inner))
    }
}

impl std::fmt::Debug for DragSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragSource")
            .field("officer", &self.inner.officer.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Non-owning handle held by the drag guard.
#[derive(Clone)]
pub(crate) struct WeakDragSource(Weak<SourceInner>);

impl WeakDragSource {
    pub(crate) fn upgrade(&self) -> Option<DragSource> {
        self.0.upgrade().map(|inner| DragSource { inner })
    }
}
