// ── Reactive assignment store ──
//
// Holds the canonical slot → officers snapshot and mediates every write
// to the persistence backend. Mutations are broadcast to subscribers via
// a `watch` channel and to registered change listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, warn};

use super::snapshot::AssignmentSnapshot;
use crate::config::BoardConfig;
use crate::error::CoreError;
use crate::model::{OfficerId, SlotName};
use crate::persistence::AssignmentBackend;
use crate::stream::SnapshotStream;

type Listener = Arc<dyn Fn(&Arc<AssignmentSnapshot>) + Send + Sync>;

/// Handle returned by [`AssignmentStore::on_assignment_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Canonical assignment state for one board.
///
/// Cheaply cloneable via `Arc`. `fetch_all`, `assign` and `unassign` are
/// serialized: each one fully applies or fully rolls back before the
/// next begins. Readers see optimistic values immediately.
pub struct AssignmentStore<B: AssignmentBackend> {
    inner: Arc<StoreInner<B>>,
}

impl<B: AssignmentBackend> Clone for AssignmentStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StoreInner<B> {
    backend: Arc<B>,
    slots: Vec<SlotName>,
    snapshot: watch::Sender<Arc<AssignmentSnapshot>>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
    op_lock: AsyncMutex<()>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl<B: AssignmentBackend> AssignmentStore<B> {
    /// Create an empty store over `backend`. Call [`fetch_all`](Self::fetch_all)
    /// to load persisted assignments.
    pub fn new(backend: Arc<B>, config: &BoardConfig) -> Self {
        let slots = config.slots.clone();
        let (snapshot, _) = watch::channel(Arc::new(AssignmentSnapshot::empty(&slots)));
        let (last_refresh, _) = watch::channel(None);

        Self {
            inner: Arc::new(StoreInner {
                backend,
                slots,
                snapshot,
                last_refresh,
                op_lock: AsyncMutex::new(()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    pub fn slots(&self) -> &[SlotName] {
        &self.inner.slots
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<AssignmentSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes, including optimistic ones.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot.subscribe())
    }

    pub fn slot_of(&self, officer: &OfficerId) -> Option<SlotName> {
        self.inner.snapshot.borrow().slot_of(officer).cloned()
    }

    /// Per-slot head count of the current snapshot.
    pub fn counts(&self) -> IndexMap<SlotName, usize> {
        self.inner.snapshot.borrow().counts()
    }

    /// When the snapshot was last replaced from the backend.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_refresh.borrow()
    }

    pub fn subscribe_last_refresh(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.inner.last_refresh.subscribe()
    }

    // ── Change listeners ─────────────────────────────────────────────

    /// Call `listener` after every successful `assign`, `unassign` or
    /// `fetch_all`. Rolled-back writes are not reported.
    pub fn on_assignment_changed(
        &self,
        listener: impl Fn(&Arc<AssignmentSnapshot>) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(lid, _)| *lid != id);
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Replace the snapshot with the backend's current rows.
    ///
    /// On failure the snapshot is left untouched.
    pub async fn fetch_all(&self) -> Result<Arc<AssignmentSnapshot>, CoreError> {
        let _op = self.inner.op_lock.lock().await;

        let records = self
            .inner
            .backend
            .list_assignments()
            .await
            .map_err(|e| {
                warn!(error = %e, "assignment fetch failed");
                CoreError::persistence("fetch_all", &e)
            })?;

        let row_count = records.len();
        let snapshot = Arc::new(AssignmentSnapshot::from_records(&self.inner.slots, records));
        self.publish(Arc::clone(&snapshot));
        self.inner.last_refresh.send_replace(Some(Utc::now()));

        info!(rows = row_count, assigned = snapshot.total(), "assignment snapshot refreshed");
        self.notify_listeners(&snapshot);
        Ok(snapshot)
    }

    /// Move `officer_id` into `target`, optimistically, then persist.
    ///
    /// On persistence failure the pre-call snapshot is restored.
    pub async fn assign(
        &self,
        officer_id: &OfficerId,
        target: &SlotName,
    ) -> Result<Arc<AssignmentSnapshot>, CoreError> {
        if !self.inner.slots.contains(target) {
            return Err(CoreError::UnknownSlot {
                slot: target.to_string(),
            });
        }

        let _op = self.inner.op_lock.lock().await;
        let before = self.snapshot();
        let optimistic = Arc::new(before.with_assignment(officer_id, target));
        self.publish(Arc::clone(&optimistic));
        debug!(officer = %officer_id, slot = %target, "optimistic assign published");

        match self
            .inner
            .backend
            .set_assignment(officer_id, Some(target))
            .await
        {
            Ok(()) => {
                info!(officer = %officer_id, slot = %target, "officer assigned");
                self.notify_listeners(&optimistic);
                Ok(optimistic)
            }
            Err(e) => {
                warn!(officer = %officer_id, slot = %target, error = %e, "assign failed, rolling back");
                self.publish(before);
                Err(CoreError::persistence("assign", &e))
            }
        }
    }

    /// Remove `officer_id` from every slot, optimistically, then persist.
    ///
    /// Unassigning an officer that holds no slot still persists the clear
    /// and succeeds.
    pub async fn unassign(&self, officer_id: &OfficerId) -> Result<Arc<AssignmentSnapshot>, CoreError> {
        let _op = self.inner.op_lock.lock().await;
        let before = self.snapshot();
        let optimistic = Arc::new(before.without(officer_id));
        self.publish(Arc::clone(&optimistic));
        debug!(officer = %officer_id, "optimistic unassign published");

        match self.inner.backend.set_assignment(officer_id, None).await {
            Ok(()) => {
                info!(officer = %officer_id, "officer unassigned");
                self.notify_listeners(&optimistic);
                Ok(optimistic)
            }
            Err(e) => {
                warn!(officer = %officer_id, error = %e, "unassign failed, rolling back");
                self.publish(before);
                Err(CoreError::persistence("unassign", &e))
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn publish(&self, snapshot: Arc<AssignmentSnapshot>) {
        self.inner.snapshot.send_if_modified(|current| {
            if **current == *snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    fn notify_listeners(&self, snapshot: &Arc<AssignmentSnapshot>) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

impl<B: AssignmentBackend> std::fmt::Debug for AssignmentStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentStore")
            .field("slots", &self.inner.slots)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}
