//! Data bridge: forwards store snapshots and feed status into the action loop.
//!
//! Runs as a background task. Performs the initial load, then forwards
//! every snapshot change (optimistic or reconciled) and every feed status
//! transition as an [`Action`] until cancelled.

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dispatch_core::{AssignmentStore, FeedStatus, MemoryBackend};

use crate::action::{Action, Notification, NotificationLevel};

pub async fn spawn_data_bridge(
    store: AssignmentStore<MemoryBackend>,
    mut feed_status: watch::Receiver<FeedStatus>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut snapshots = store.subscribe();

    if let Err(e) = store.fetch_all().await {
        warn!(error = %e, "initial assignment load failed");
        let _ = action_tx.send(Action::Notify(Notification::new(
            NotificationLevel::Error,
            format!("initial load failed: {e}"),
        )));
    }

    // Push current state so the board has data immediately.
    let _ = action_tx.send(Action::SnapshotUpdated(snapshots.latest()));
    let status = *feed_status.borrow_and_update();
    let _ = action_tx.send(Action::FeedStatusChanged(status));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(snap) = snapshots.changed() => {
                debug!(assigned = snap.total(), "dispatching SnapshotUpdated");
                let _ = action_tx.send(Action::SnapshotUpdated(snap));
            }
            Ok(()) = feed_status.changed() => {
                let status = *feed_status.borrow_and_update();
                let _ = action_tx.send(Action::FeedStatusChanged(status));
            }
            else => break,
        }
    }

    debug!("data bridge shut down");
}
