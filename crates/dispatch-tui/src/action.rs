//! UI actions. Every state change on the board flows through one of these.

use std::fmt;
use std::sync::Arc;

use dispatch_core::{AssignmentSnapshot, FeedStatus, OfficerId, SlotName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient status-bar message.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Board commands ──
    /// Persist `officer_id` into `slot` (a completed drop or a key binding).
    Assign { officer_id: OfficerId, slot: SlotName },
    Unassign(OfficerId),
    Refresh,
    /// Abandon the gesture in progress.
    CancelDrag,
    ToggleTouch,

    // ── Data ──
    SnapshotUpdated(Arc<AssignmentSnapshot>),
    FeedStatusChanged(FeedStatus),
    /// A store write finished, successfully or not.
    WriteSettled,

    Notify(Notification),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign { officer_id, slot } => write!(f, "assign {officer_id} → {slot}"),
            Self::Unassign(officer_id) => write!(f, "unassign {officer_id}"),
            Self::SnapshotUpdated(snap) => write!(f, "snapshot ({} assigned)", snap.total()),
            Self::FeedStatusChanged(status) => write!(f, "feed {status}"),
            other => write!(f, "{other:?}"),
        }
    }
}
