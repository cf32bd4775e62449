// ── Reactive snapshot stream ──
//
// Subscription type for consuming assignment changes from the store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::AssignmentSnapshot;

/// A subscription to the assignment snapshot.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct SnapshotStream {
    current: Arc<AssignmentSnapshot>,
    receiver: watch::Receiver<Arc<AssignmentSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<AssignmentSnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<AssignmentSnapshot> {
        &self.current
    }

    /// The latest snapshot, which may be newer than `current()`.
    pub fn latest(&self) -> Arc<AssignmentSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<AssignmentSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current snapshot first.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

impl std::fmt::Debug for SnapshotStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStream")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<AssignmentSnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<AssignmentSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::model::{AssignmentRecord, SlotName};

    fn slots() -> Vec<SlotName> {
        vec![SlotName::from("Unassigned"), SlotName::from("Patrol")]
    }

    fn patrol(officer: &str) -> Arc<AssignmentSnapshot> {
        Arc::new(AssignmentSnapshot::from_records(
            &slots(),
            [AssignmentRecord::new("Patrol", officer)],
        ))
    }

    #[test]
    fn changed_waits_for_a_new_value() {
        let (tx, rx) = watch::channel(Arc::new(AssignmentSnapshot::empty(&slots())));
        let mut stream = SnapshotStream::new(rx);

        {
            let mut changed = task::spawn(stream.changed());
            assert_pending!(changed.poll());

            tx.send_replace(patrol("O1"));
            assert!(changed.is_woken());
            let snap = assert_ready!(changed.poll()).unwrap();
            assert_eq!(snap.slot_of(&"O1".into()), Some(&SlotName::from("Patrol")));
        }

        assert_eq!(stream.current().total(), 1);
    }

    #[test]
    fn latest_runs_ahead_of_current() {
        let (tx, rx) = watch::channel(Arc::new(AssignmentSnapshot::empty(&slots())));
        let stream = SnapshotStream::new(rx);

        tx.send_replace(patrol("O2"));
        assert_eq!(stream.current().total(), 0);
        assert_eq!(stream.latest().total(), 1);
    }

    #[tokio::test]
    async fn into_stream_yields_current_then_changes() {
        let (tx, rx) = watch::channel(patrol("O1"));
        let mut stream = SnapshotStream::new(rx).into_stream();

        let first = stream.next().await.unwrap();
        assert!(first.contains(&"O1".into()));

        tx.send_replace(patrol("O2"));
        let second = stream.next().await.unwrap();
        assert!(second.contains(&"O2".into()));

        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
