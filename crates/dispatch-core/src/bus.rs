//! Synchronous, in-process drag signal bus.
//!
//! Touch-only devices have no native drag-and-drop, so the drag source
//! publishes lifecycle signals here and every drop zone listens. Dispatch
//! is immediate: a signal nobody is subscribed to at publish time is lost.
//! Pointer flows never touch the bus.
//!
//! The bus lives on the UI thread and is `!Send`.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::model::{OfficerId, ZoneId};

/// The three synthetic drag lifecycle signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSignal {
    /// The dragged officer moved to `(x, y)`.
    Move { x: u16, y: u16, officer_id: OfficerId },
    /// The officer was released over `target_zone_id`.
    Drop {
        target_zone_id: ZoneId,
        officer_id: OfficerId,
        x: u16,
        y: u16,
    },
    /// The gesture is over, whatever its outcome.
    End,
}

impl DragSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "drag-move",
            Self::Drop { .. } => "drag-drop",
            Self::End => "drag-end",
        }
    }
}

type Handler = Rc<RefCell<dyn FnMut(&DragSignal)>>;

/// Cheaply cloneable handle to a shared bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    subscribers: RefCell<Vec<(u64, Handler)>>,
    next_id: Cell<u64>,
    /// Signals published from inside a handler, delivered after the
    /// current one so handlers never re-enter each other.
    pending: RefCell<VecDeque<DragSignal>>,
    dispatching: Cell<bool>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future signal.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// cancelled or dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl FnMut(&DragSignal) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let handler: Handler = Rc::new(RefCell::new(handler));
        self.inner.subscribers.borrow_mut().push((id, handler));
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id: Cell::new(Some(id)),
        }
    }

    /// Deliver `signal` to every current subscriber, in subscription order.
    pub fn publish(&self, signal: DragSignal) {
        self.inner.pending.borrow_mut().push_back(signal);
        if self.inner.dispatching.replace(true) {
            return;
        }
        let _reset = DispatchReset(&self.inner.dispatching);

        loop {
            let Some(signal) = self.inner.pending.borrow_mut().pop_front() else {
                break;
            };
            let handlers: Vec<(u64, Handler)> = self.inner.subscribers.borrow().clone();
            trace!(signal = signal.kind(), subscribers = handlers.len(), "dispatching drag signal");

            for (id, handler) in handlers {
                // A handler may have been unsubscribed by an earlier one.
                if !self.inner.is_subscribed(id) {
                    continue;
                }
                (&mut *handler.borrow_mut())(&signal);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

impl BusInner {
    fn is_subscribed(&self, id: u64) -> bool {
        self.subscribers.borrow().iter().any(|(sid, _)| *sid == id)
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }
}

/// Clears the dispatching flag even if a handler panics.
struct DispatchReset<'a>(&'a Cell<bool>);

impl Drop for DispatchReset<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle returned by [`EventBus::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    bus: Weak<BusInner>,
    id: Cell<Option<u64>>,
}

impl Subscription {
    /// Unsubscribe now. Safe to call more than once.
    pub fn cancel(&self) {
        if let (Some(id), Some(bus)) = (self.id.take(), self.bus.upgrade()) {
            bus.unsubscribe(id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.get().is_some() && self.bus.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id.get())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Test helper: a subscriber that records every signal it sees.
#[cfg(test)]
pub(crate) fn record(bus: &EventBus) -> (Subscription, Rc<RefCell<Vec<DragSignal>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let sub = bus.subscribe(move |signal| sink.borrow_mut().push(signal.clone()));
    (sub, seen)
}
