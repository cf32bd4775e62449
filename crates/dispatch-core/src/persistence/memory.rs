// ── In-process assignment backend ──
//
// A shared assignment table with a broadcast change feed. Clones share
// the same table, so two stores over clones of one backend behave like
// two clients of the same server. Failure knobs let callers exercise
// rollback and feed-degradation paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use super::{AssignmentBackend, ChangeFeed, PersistenceError};
use crate::model::{AssignmentChange, AssignmentRecord, ChangeKind, OfficerId, SlotName};

const FEED_CHANNEL_CAPACITY: usize = 256;

/// In-memory implementation of [`AssignmentBackend`].
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    /// officer → slot; insertion order is the row order returned by `list`.
    table: Mutex<IndexMap<OfficerId, SlotName>>,
    feed: Mutex<Option<broadcast::Sender<AssignmentChange>>>,
    failing_writes: AtomicU32,
    failing_reads: AtomicU32,
    feed_down: AtomicBool,
    write_delay_ms: AtomicU64,
    write_count: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backend pre-populated with `records`. Later rows for the
    /// same officer overwrite earlier ones.
    pub fn with_records(records: impl IntoIterator<Item = AssignmentRecord>) -> Self {
        let table = records
            .into_iter()
            .map(|r| (r.officer_id, r.slot_name))
            .collect();
        Self {
            inner: Arc::new(MemoryInner {
                table: Mutex::new(table),
                ..MemoryInner::default()
            }),
        }
    }

    /// Parse a JSON array of `{slotName, officerId}` rows.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<AssignmentRecord> = serde_json::from_str(json)?;
        Ok(Self::with_records(records))
    }

    /// Export the table as a JSON array of rows.
    pub async fn to_json(&self) -> Result<String, serde_json::Error> {
        let rows = self.rows().await;
        serde_json::to_string_pretty(&rows)
    }

    /// Current rows, in table order.
    pub async fn rows(&self) -> Vec<AssignmentRecord> {
        self.inner
            .table
            .lock()
            .await
            .iter()
            .map(|(officer, slot)| AssignmentRecord::new(slot.clone(), officer.clone()))
            .collect()
    }

    // ── Failure knobs ────────────────────────────────────────────────

    /// Fail the next `n` calls to `set_assignment`.
    pub fn fail_next_writes(&self, n: u32) {
        self.inner.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `list_assignments`.
    pub fn fail_next_reads(&self, n: u32) {
        self.inner.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Make `set_assignment` sleep before committing.
    pub fn set_write_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Refuse new subscriptions until [`restore_feed`](Self::restore_feed).
    pub async fn take_feed_down(&self) {
        self.inner.feed_down.store(true, Ordering::SeqCst);
        // Dropping the sender closes every open subscription.
        self.inner.feed.lock().await.take();
    }

    pub fn restore_feed(&self) {
        self.inner.feed_down.store(false, Ordering::SeqCst);
    }

    /// Number of committed writes.
    pub fn write_count(&self) -> u64 {
        self.inner.write_count.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn notify(&self, change: AssignmentChange) {
        if let Some(tx) = self.inner.feed.lock().await.as_ref() {
            // No receivers is fine: nobody is listening.
            let _ = tx.send(change);
        }
    }
}

impl AssignmentBackend for MemoryBackend {
    async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>, PersistenceError> {
        if Self::take_failure(&self.inner.failing_reads) {
            return Err(PersistenceError::Unavailable);
        }
        Ok(self.rows().await)
    }

    async fn set_assignment(
        &self,
        officer_id: &OfficerId,
        slot: Option<&SlotName>,
    ) -> Result<(), PersistenceError> {
        let delay = self.inner.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if Self::take_failure(&self.inner.failing_writes) {
            return Err(PersistenceError::Unavailable);
        }

        let kind = {
            let mut table = self.inner.table.lock().await;
            match slot {
                Some(slot) => match table.insert(officer_id.clone(), slot.clone()) {
                    Some(_) => ChangeKind::Update,
                    None => ChangeKind::Insert,
                },
                None => {
                    if table.shift_remove(officer_id).is_none() {
                        // Clearing an absent row is a committed no-op.
                        self.inner.write_count.fetch_add(1, Ordering::SeqCst);
                        return Ok(());
                    }
                    ChangeKind::Delete
                }
            }
        };

        self.inner.write_count.fetch_add(1, Ordering::SeqCst);
        debug!(officer = %officer_id, %kind, "assignment row written");

        self.notify(AssignmentChange {
            kind,
            officer_id: officer_id.clone(),
            slot_name: slot.cloned(),
            at: Utc::now(),
        })
        .await;

        Ok(())
    }

    async fn subscribe_to_assignment_changes(&self) -> Result<ChangeFeed, PersistenceError> {
        if self.inner.feed_down.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable);
        }
        let mut feed = self.inner.feed.lock().await;
        let tx = feed.get_or_insert_with(|| broadcast::channel(FEED_CHANNEL_CAPACITY).0);
        Ok(ChangeFeed::new(tx.subscribe()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::persistence::FeedEvent;

    fn seeded() -> MemoryBackend {
        MemoryBackend::with_records([
            AssignmentRecord::new("Unassigned", "O1"),
            AssignmentRecord::new("Patrol", "O2"),
        ])
    }

    #[tokio::test]
    async fn set_assignment_moves_and_clears_rows() {
        let backend = seeded();

        backend
            .set_assignment(&"O1".into(), Some(&"Traffic".into()))
            .await
            .unwrap();
        backend.set_assignment(&"O2".into(), None).await.unwrap();

        assert_eq!(
            backend.list_assignments().await.unwrap(),
            vec![AssignmentRecord::new("Traffic", "O1")]
        );
        assert_eq!(backend.write_count(), 2);
    }

    #[tokio::test]
    async fn writes_are_announced_on_the_feed() {
        let backend = seeded();
        let mut feed = backend.subscribe_to_assignment_changes().await.unwrap();

        backend
            .set_assignment(&"O3".into(), Some(&"Patrol".into()))
            .await
            .unwrap();
        backend
            .set_assignment(&"O1".into(), Some(&"Patrol".into()))
            .await
            .unwrap();
        backend.set_assignment(&"O2".into(), None).await.unwrap();

        let kinds: Vec<ChangeKind> = [feed.recv().await, feed.recv().await, feed.recv().await]
            .into_iter()
            .map(|event| match event {
                FeedEvent::Change(change) => change.kind,
                other => panic!("unexpected feed event: {other:?}"),
            })
            .collect();
        assert_eq!(kinds, [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]);
    }

    #[tokio::test]
    async fn failure_knobs_fail_exactly_n_calls() {
        let backend = seeded();
        backend.fail_next_writes(1);
        backend.fail_next_reads(1);

        assert_eq!(
            backend.set_assignment(&"O1".into(), None).await,
            Err(PersistenceError::Unavailable)
        );
        assert!(backend.set_assignment(&"O1".into(), None).await.is_ok());
        assert!(backend.list_assignments().await.is_err());
        assert!(backend.list_assignments().await.is_ok());
    }

    #[tokio::test]
    async fn taking_the_feed_down_closes_subscribers() {
        let backend = seeded();
        let mut feed = backend.subscribe_to_assignment_changes().await.unwrap();

        backend.take_feed_down().await;
        assert_eq!(feed.recv().await, FeedEvent::Closed);
        assert!(backend.subscribe_to_assignment_changes().await.is_err());

        backend.restore_feed();
        assert!(backend.subscribe_to_assignment_changes().await.is_ok());
    }

    #[tokio::test]
    async fn json_round_trip_preserves_rows() {
        let backend = seeded();
        let json = backend.to_json().await.unwrap();
        assert!(json.contains("\"slotName\": \"Patrol\""));

        let restored = MemoryBackend::from_json(&json).unwrap();
        assert_eq!(restored.rows().await, backend.rows().await);
    }
}
