// ── Persistence collaborator contract ──
//
// The engine treats the assignment table as an opaque store with three
// operations: list, set, and subscribe-to-changes. Everything above this
// module talks to `AssignmentBackend`, never to a concrete database.

mod memory;

use std::future::Future;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::model::{AssignmentChange, AssignmentRecord, OfficerId, SlotName};

pub use memory::MemoryBackend;

/// Backend read/write failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("backend unavailable")]
    Unavailable,

    #[error("write rejected: {message}")]
    Rejected { message: String },

    #[error("backend timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// The persistence layer as consumed by the store and reconciler.
///
/// Futures are `Send` so the reconciler can drive them from a spawned task.
pub trait AssignmentBackend: Send + Sync + 'static {
    /// Every persisted `(slot, officer)` row.
    fn list_assignments(
        &self,
    ) -> impl Future<Output = Result<Vec<AssignmentRecord>, PersistenceError>> + Send;

    /// Move `officer_id` into `slot`, or clear its assignment with `None`.
    fn set_assignment(
        &self,
        officer_id: &OfficerId,
        slot: Option<&SlotName>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Open a change feed scoped to the assignment collection.
    ///
    /// Dropping the returned [`ChangeFeed`] unsubscribes.
    fn subscribe_to_assignment_changes(
        &self,
    ) -> impl Future<Output = Result<ChangeFeed, PersistenceError>> + Send;
}

/// What a [`ChangeFeed`] yields on each receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A row changed.
    Change(AssignmentChange),
    /// The subscriber fell behind and missed `n` notifications.
    Lagged(u64),
    /// The feed is gone; no further notifications will arrive.
    Closed,
}

/// Subscription to the assignment change feed.
pub struct ChangeFeed {
    rx: broadcast::Receiver<AssignmentChange>,
}

impl ChangeFeed {
    pub fn new(rx: broadcast::Receiver<AssignmentChange>) -> Self {
        Self { rx }
    }

    /// Wait for the next notification.
    pub async fn recv(&mut self) -> FeedEvent {
        match self.rx.recv().await {
            Ok(change) => FeedEvent::Change(change),
            Err(broadcast::error::RecvError::Lagged(n)) => FeedEvent::Lagged(n),
            Err(broadcast::error::RecvError::Closed) => FeedEvent::Closed,
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("pending", &self.rx.len())
            .finish()
    }
}
