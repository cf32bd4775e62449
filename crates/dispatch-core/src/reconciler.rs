// ── Realtime reconciler ──
//
// Keeps an `AssignmentStore` converged with the backend. Any change-feed
// notification, whatever row it names, triggers a full refetch. When the
// feed is unavailable the reconciler falls back to periodic polling and
// keeps retrying the subscription.

use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BoardConfig;
use crate::error::CoreError;
use crate::persistence::{AssignmentBackend, ChangeFeed, FeedEvent};
use crate::store::AssignmentStore;

/// Freshness of the store as seen by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FeedStatus {
    /// Started, no subscription attempt has finished yet.
    Connecting,
    /// Subscribed to the change feed and the last refetch succeeded.
    Live,
    /// Feed unavailable; refetching every polling interval.
    Polling,
    /// The last refetch failed, or the feed is down and polling is disabled.
    Stale,
    /// `stop()` was called.
    Stopped,
}

type DataChanged = Arc<dyn Fn() + Send + Sync>;

/// Handle to the background reconcile task.
///
/// Dropping the handle cancels the task.
pub struct Reconciler {
    cancel: CancellationToken,
    status: watch::Receiver<FeedStatus>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Reconciler {
    /// Spawn the reconcile task on the current tokio runtime.
    ///
    /// `on_data_changed` runs after every successful refetch.
    pub fn start<B: AssignmentBackend>(
        store: AssignmentStore<B>,
        config: &BoardConfig,
        on_data_changed: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (status_tx, status) = watch::channel(FeedStatus::Connecting);

        let task = ReconcileTask {
            store,
            polling_interval: config.polling_interval,
            realtime: config.realtime_enabled,
            status: status_tx,
            on_data_changed: Arc::new(on_data_changed),
        };
        let handle = tokio::spawn(task.run(cancel.clone()));
        info!(
            realtime = config.realtime_enabled,
            polling_secs = config.polling_interval.as_secs(),
            "reconciler started"
        );

        Self {
            cancel,
            status,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Watch the feed status.
    pub fn status(&self) -> watch::Receiver<FeedStatus> {
        self.status.clone()
    }

    pub fn current_status(&self) -> FeedStatus {
        *self.status.borrow()
    }

    /// Cancel the task and wait for it to finish. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "reconciler task ended abnormally");
            }
            info!("reconciler stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("status", &self.current_status())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

// ── Background task ──────────────────────────────────────────────

struct ReconcileTask<B: AssignmentBackend> {
    store: AssignmentStore<B>,
    polling_interval: Duration,
    realtime: bool,
    status: watch::Sender<FeedStatus>,
    on_data_changed: DataChanged,
}

/// Why `follow_feed` returned.
enum FeedExit {
    Cancelled,
    Closed,
}

impl<B: AssignmentBackend> ReconcileTask<B> {
    async fn run(self, cancel: CancellationToken) {
        loop {
            if self.realtime {
                match self.subscribe().await {
                    Ok(feed) => {
                        info!("subscribed to assignment change feed");
                        // Catch up on anything written before the subscription.
                        self.refresh(FeedStatus::Live).await;
                        if let FeedExit::Cancelled = self.follow_feed(feed, &cancel).await {
                            break;
                        }
                        warn!("assignment change feed closed");
                    }
                    Err(e) => {
                        warn!(error = %e, "subscribe failed");
                    }
                }
            }

            if self.polling_interval.is_zero() {
                warn!("polling disabled, assignments may go stale");
                self.set_status(FeedStatus::Stale);
                cancel.cancelled().await;
                break;
            }

            self.set_status(FeedStatus::Polling);
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.polling_interval) => {
                    self.refresh(FeedStatus::Polling).await;
                }
            }
        }

        self.status.send_replace(FeedStatus::Stopped);
        debug!("reconcile task exiting");
    }

    async fn subscribe(&self) -> Result<ChangeFeed, CoreError> {
        self.store
            .backend()
            .subscribe_to_assignment_changes()
            .await
            .map_err(|e| CoreError::feed_unavailable(&e))
    }

    async fn follow_feed(&self, mut feed: ChangeFeed, cancel: &CancellationToken) -> FeedExit {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return FeedExit::Cancelled,
                event = feed.recv() => match event {
                    FeedEvent::Change(change) => {
                        debug!(kind = %change.kind, officer = %change.officer_id, "assignment change notified");
                        self.refresh(FeedStatus::Live).await;
                    }
                    FeedEvent::Lagged(missed) => {
                        warn!(missed, "change feed lagged, refetching");
                        self.refresh(FeedStatus::Live).await;
                    }
                    FeedEvent::Closed => return FeedExit::Closed,
                },
            }
        }
    }

    /// Full refetch. Failures are logged and mark the store stale.
    async fn refresh(&self, healthy: FeedStatus) {
        match self.store.fetch_all().await {
            Ok(_) => {
                self.set_status(healthy);
                (self.on_data_changed)();
            }
            Err(e) => {
                warn!(error = %e, "reconcile refetch failed");
                self.set_status(FeedStatus::Stale);
            }
        }
    }

    fn set_status(&self, status: FeedStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            debug!(from = %current, to = %status, "feed status changed");
            *current = status;
            true
        });
    }
}
