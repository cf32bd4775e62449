#![allow(clippy::unwrap_used)]
// Integration tests for `Reconciler` over a shared `MemoryBackend`.
//
// Two stores over clones of one backend behave like two clients of the
// same server: writes from one reach the other through the change feed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::timeout;

use dispatch_core::{
    AssignmentRecord, AssignmentSnapshot, AssignmentStore, BoardConfig, FeedStatus, MemoryBackend,
    Reconciler,
};

// ── Helpers ─────────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(60);

fn config() -> BoardConfig {
    BoardConfig::with_slots(["Unassigned", "Patrol", "Traffic"]).unwrap()
}

fn seeded() -> MemoryBackend {
    MemoryBackend::with_records([
        AssignmentRecord::new("Unassigned", "O1"),
        AssignmentRecord::new("Unassigned", "O2"),
        AssignmentRecord::new("Unassigned", "O3"),
    ])
}

fn client(backend: &MemoryBackend, config: &BoardConfig) -> AssignmentStore<MemoryBackend> {
    AssignmentStore::new(Arc::new(backend.clone()), config)
}

fn start(store: &AssignmentStore<MemoryBackend>, config: &BoardConfig) -> Reconciler {
    Reconciler::start(store.clone(), config, || {})
}

async fn wait_for_status(reconciler: &Reconciler, want: FeedStatus) {
    let mut status = reconciler.status();
    timeout(WAIT, status.wait_for(|s| *s == want))
        .await
        .unwrap_or_else(|_| panic!("feed status never became {want}"))
        .unwrap();
}

async fn wait_until(
    store: &AssignmentStore<MemoryBackend>,
    pred: impl Fn(&AssignmentSnapshot) -> bool,
) {
    let mut stream = store.subscribe();
    timeout(WAIT, async {
        while !pred(&stream.latest()) {
            stream.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
}

// ── Feed-driven reconciliation ──────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_remote_write_reaches_other_client() {
    let config = config();
    let backend = seeded();
    let local = client(&backend, &config);
    let remote = client(&backend, &config);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let reconciler = Reconciler::start(
        local.clone(),
        &config,
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );
    wait_for_status(&reconciler, FeedStatus::Live).await;
    assert_eq!(local.snapshot().total(), 3);

    remote.assign(&"O2".into(), &"Traffic".into()).await.unwrap();
    wait_until(&local, |snap| snap.slot_of(&"O2".into()) == Some(&"Traffic".into())).await;

    assert!(calls.load(Ordering::SeqCst) >= 2);
    assert!(local.last_refresh().is_some());
    reconciler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_remote_change_during_inflight_assign_converges() {
    let config = config();
    let backend = seeded();
    let local = client(&backend, &config);
    let remote = client(&backend, &config);
    let reconciler = start(&local, &config);
    wait_for_status(&reconciler, FeedStatus::Live).await;

    backend.set_write_delay(Duration::from_millis(200));
    let writer = local.clone();
    let inflight =
        tokio::spawn(async move { writer.assign(&"O1".into(), &"Patrol".into()).await });
    let other =
        tokio::spawn(async move { remote.assign(&"O3".into(), &"Traffic".into()).await });
    inflight.await.unwrap().unwrap();
    other.await.unwrap().unwrap();

    let fresh = client(&backend, &config).fetch_all().await.unwrap();
    wait_until(&local, |snap| *snap == *fresh).await;
    assert_eq!(*local.snapshot(), *fresh);
    assert_eq!(local.slot_of(&"O1".into()), Some("Patrol".into()));
    assert_eq!(local.slot_of(&"O3".into()), Some("Traffic".into()));
    reconciler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_refetch_marks_stale_then_recovers() {
    let config = config();
    let backend = seeded();
    let local = client(&backend, &config);
    let remote = client(&backend, &config);
    let reconciler = start(&local, &config);
    wait_for_status(&reconciler, FeedStatus::Live).await;

    backend.fail_next_reads(1);
    remote.assign(&"O1".into(), &"Patrol".into()).await.unwrap();
    wait_for_status(&reconciler, FeedStatus::Stale).await;
    assert_eq!(local.slot_of(&"O1".into()), Some("Unassigned".into()));

    remote.assign(&"O2".into(), &"Patrol".into()).await.unwrap();
    wait_for_status(&reconciler, FeedStatus::Live).await;
    wait_until(&local, |snap| snap.slot(&"Patrol".into()).is_some_and(|o| o.len() == 2)).await;
    reconciler.stop().await;
}

// ── Degradation ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_degrades_to_polling_when_feed_unavailable() {
    let config = config();
    let backend = seeded();
    backend.take_feed_down().await;
    let local = client(&backend, &config);
    let remote = client(&backend, &config);
    let reconciler = start(&local, &config);

    wait_for_status(&reconciler, FeedStatus::Polling).await;
    remote.assign(&"O3".into(), &"Traffic".into()).await.unwrap();

    // Picked up by the next poll, not by the feed.
    wait_until(&local, |snap| snap.slot_of(&"O3".into()) == Some(&"Traffic".into())).await;
    assert_eq!(reconciler.current_status(), FeedStatus::Polling);
    reconciler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_resubscribes_once_feed_returns() {
    let config = config();
    let backend = seeded();
    backend.take_feed_down().await;
    let local = client(&backend, &config);
    let reconciler = start(&local, &config);
    wait_for_status(&reconciler, FeedStatus::Polling).await;

    backend.restore_feed();
    wait_for_status(&reconciler, FeedStatus::Live).await;
    reconciler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_feed_closing_mid_run_falls_back_to_polling() {
    let config = config();
    let backend = seeded();
    let local = client(&backend, &config);
    let reconciler = start(&local, &config);
    wait_for_status(&reconciler, FeedStatus::Live).await;

    backend.take_feed_down().await;
    wait_for_status(&reconciler, FeedStatus::Polling).await;
    reconciler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_polling_disabled_reports_stale() {
    let config = BoardConfig {
        polling_interval: Duration::ZERO,
        ..config()
    };
    let backend = seeded();
    backend.take_feed_down().await;
    let local = client(&backend, &config);
    let reconciler = start(&local, &config);

    wait_for_status(&reconciler, FeedStatus::Stale).await;
    reconciler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_realtime_disabled_polls_only() {
    let config = BoardConfig {
        realtime_enabled: false,
        ..config()
    };
    let backend = seeded();
    let local = client(&backend, &config);
    let remote = client(&backend, &config);
    let reconciler = start(&local, &config);

    wait_for_status(&reconciler, FeedStatus::Polling).await;
    remote.unassign(&"O1".into()).await.unwrap();
    wait_until(&local, |snap| !snap.contains(&"O1".into()) && snap.total() == 2).await;
    reconciler.stop().await;
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let config = config();
    let backend = seeded();
    let local = client(&backend, &config);
    let reconciler = start(&local, &config);
    wait_for_status(&reconciler, FeedStatus::Live).await;

    reconciler.stop().await;
    reconciler.stop().await;

    assert!(reconciler.is_stopped());
    assert_eq!(reconciler.current_status(), FeedStatus::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_first_subscription() {
    let config = config();
    let backend = seeded();
    let local = client(&backend, &config);
    let reconciler = start(&local, &config);

    reconciler.stop().await;
    assert_eq!(reconciler.current_status(), FeedStatus::Stopped);
}
