//! Store worker: runs assignment writes off the UI thread.
//!
//! Drop callbacks fire synchronously inside the gesture handlers; they
//! enqueue a [`StoreCommand`] and return. The worker applies commands in
//! order and reports failures back as notifications.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dispatch_core::{AssignmentStore, MemoryBackend, OfficerId, Roster, SlotName};

use crate::action::{Action, Notification, NotificationLevel};

#[derive(Debug, Clone)]
pub enum StoreCommand {
    Assign { officer_id: OfficerId, slot: SlotName },
    Unassign(OfficerId),
    Refresh,
}

pub async fn store_worker(
    store: AssignmentStore<MemoryBackend>,
    roster: Roster,
    mut rx: mpsc::UnboundedReceiver<StoreCommand>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    loop {
        let cmd = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            cmd = rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };

        debug!(?cmd, "store command");
        let notification = match &cmd {
            StoreCommand::Assign { officer_id, slot } => match store.assign(officer_id, slot).await {
                Ok(_) => Notification::new(
                    NotificationLevel::Success,
                    format!("{} → {slot}", roster.label(officer_id)),
                ),
                Err(e) => {
                    warn!(officer = %officer_id, slot = %slot, error = %e, "assign failed");
                    Notification::new(
                        NotificationLevel::Error,
                        format!("could not assign {}: {e}", roster.label(officer_id)),
                    )
                }
            },
            StoreCommand::Unassign(officer_id) => match store.unassign(officer_id).await {
                Ok(_) => Notification::new(
                    NotificationLevel::Info,
                    format!("{} taken off the board", roster.label(officer_id)),
                ),
                Err(e) => {
                    warn!(officer = %officer_id, error = %e, "unassign failed");
                    Notification::new(
                        NotificationLevel::Error,
                        format!("could not unassign {}: {e}", roster.label(officer_id)),
                    )
                }
            },
            StoreCommand::Refresh => match store.fetch_all().await {
                Ok(snap) => Notification::new(
                    NotificationLevel::Info,
                    format!("refreshed, {} assigned", snap.total()),
                ),
                Err(e) => Notification::new(NotificationLevel::Warning, format!("refresh failed: {e}")),
            },
        };

        let settled = !matches!(cmd, StoreCommand::Refresh);
        if action_tx.send(Action::Notify(notification)).is_err() {
            break;
        }
        if settled {
            let _ = action_tx.send(Action::WriteSettled);
        }
    }
    debug!("store worker stopped");
}
