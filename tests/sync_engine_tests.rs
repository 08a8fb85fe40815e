use async_trait::async_trait;
use caresync::config::Config;
use caresync::core::cache::StoreInvalidator;
use caresync::core::connectivity::{ConnectivityMonitor, ManualSource};
use caresync::core::dispatcher::ActionDispatcher;
use caresync::core::engine::SyncEngine;
use caresync::core::orchestrator::{SyncOrchestrator, SyncState};
use caresync::core::retry::RetryPolicy;
use caresync::db::store::QueueStore;
use caresync::errors::{AppError, DispatchError};
use caresync::models::action::{PendingAction, QueryKey};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

mod common;
use common::{
    CollectingReporter, RecordingDispatcher, insert_foreign_row, medication_log, setup_test_db,
    shift_checkin, timeline_entry,
};

fn engine_with(
    store: Arc<QueueStore>,
    dispatcher: Arc<RecordingDispatcher>,
    reporter: Arc<CollectingReporter>,
) -> SyncEngine {
    SyncEngine::assemble(
        &Config::default(),
        store,
        dispatcher,
        Arc::new(ManualSource::new(false)),
        reporter,
    )
}

#[test]
fn queue_survives_store_reopen() {
    let (_dir, db_path) = setup_test_db("reopen");

    let first_ids: Vec<i64> = {
        let store = QueueStore::open(&db_path).unwrap();
        store.enqueue(&medication_log("med-1")).unwrap();
        store.enqueue(&shift_checkin("shift-2")).unwrap();
        store.list_all().unwrap().iter().map(|a| a.id).collect()
    };

    let store = QueueStore::open(&db_path).unwrap();
    let actions = store.list_all().unwrap();
    assert_eq!(actions.iter().map(|a| a.id).collect::<Vec<_>>(), first_ids);
    assert_eq!(actions[0].decode().unwrap(), medication_log("med-1"));
    assert_eq!(actions[1].action_type, "shift_checkin");
    assert!(actions.iter().all(|a| a.retry_count == 0));
}

#[tokio::test]
async fn offline_medication_log_syncs_when_connection_returns() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let reporter = Arc::new(CollectingReporter::default());
    let engine = engine_with(Arc::clone(&store), Arc::clone(&dispatcher), Arc::clone(&reporter));

    let monitor = ConnectivityMonitor::new(false);
    let _sub = engine.orchestrator.attach(&monitor);

    store.enqueue(&medication_log("med-1")).unwrap();
    assert_eq!(dispatcher.calls(), 0);
    assert_eq!(engine.orchestrator.pending_count().unwrap(), 1);

    monitor.report(true);

    tokio::time::timeout(Duration::from_secs(5), async {
        while reporter.reports.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("drain never finished");

    assert_eq!(dispatcher.calls(), 1);
    assert_eq!(engine.orchestrator.pending_count().unwrap(), 0);
    assert!(engine.orchestrator.last_sync().unwrap().is_some());

    let report = reporter.reports.lock().unwrap()[0].clone();
    assert_eq!((report.synced, report.failed, report.retained), (1, 0, 0));
    assert_eq!(
        report.invalidated,
        BTreeSet::from([QueryKey::Medications, QueryKey::Timeline])
    );

    let stamped: Vec<String> = StoreInvalidator::stamps(&store)
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(stamped, vec!["medications", "timeline"]);
}

#[tokio::test]
async fn always_failing_action_is_dropped_on_third_drain() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    let dispatcher = Arc::new(RecordingDispatcher::failing(&["cr-1"]));
    let reporter = Arc::new(CollectingReporter::default());
    let engine = engine_with(Arc::clone(&store), Arc::clone(&dispatcher), Arc::clone(&reporter));

    store.enqueue(&timeline_entry("cr-1", "Fell in the garden")).unwrap();

    let first = engine.orchestrator.sync_now().await.unwrap().unwrap();
    assert_eq!((first.synced, first.failed, first.retained), (0, 0, 1));
    assert_eq!(store.list_all().unwrap()[0].retry_count, 1);

    engine.orchestrator.sync_now().await.unwrap();
    assert_eq!(store.list_all().unwrap()[0].retry_count, 2);

    let third = engine.orchestrator.sync_now().await.unwrap().unwrap();
    assert_eq!((third.synced, third.failed, third.retained), (0, 1, 0));
    assert!(store.list_all().unwrap().is_empty());
    assert_eq!(dispatcher.calls(), 3);

    // Nothing synced: last sync and cache stamps stay untouched.
    assert_eq!(engine.orchestrator.last_sync().unwrap(), None);
    assert!(StoreInvalidator::stamps(&store).unwrap().is_empty());

    let drops: Vec<_> = store
        .audit_entries()
        .unwrap()
        .into_iter()
        .filter(|e| e.operation == "drop")
        .collect();
    assert_eq!(drops.len(), 1);
    assert_eq!(drops[0].target, "timeline_entry");
}

#[tokio::test]
async fn actions_of_different_types_go_out_in_enqueue_order() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let engine = engine_with(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        Arc::new(CollectingReporter::default()),
    );

    store.enqueue(&shift_checkin("shift-1")).unwrap();
    store.enqueue(&timeline_entry("cr-1", "Lunch")).unwrap();
    store.enqueue(&medication_log("med-1")).unwrap();

    let report = engine.orchestrator.sync_now().await.unwrap().unwrap();
    assert_eq!(report.synced, 3);
    assert_eq!(
        dispatcher.seen_types(),
        vec!["shift_checkin", "timeline_entry", "medication_log"]
    );
    assert_eq!(
        report.invalidated,
        BTreeSet::from([QueryKey::Medications, QueryKey::Timeline, QueryKey::Shifts])
    );
}

#[tokio::test]
async fn retained_action_keeps_its_place_ahead_of_newer_ones() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    let dispatcher = Arc::new(RecordingDispatcher::failing(&["med-1"]));
    let engine = engine_with(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        Arc::new(CollectingReporter::default()),
    );

    let a = store.enqueue(&medication_log("med-1")).unwrap();
    store.enqueue(&shift_checkin("shift-1")).unwrap();

    let report = engine.orchestrator.sync_now().await.unwrap().unwrap();
    assert_eq!((report.synced, report.retained), (1, 1));

    let c = store.enqueue(&shift_checkin("shift-2")).unwrap();
    dispatcher.heal("med-1");
    dispatcher.seen.lock().unwrap().clear();

    engine.orchestrator.sync_now().await.unwrap();
    let ids: Vec<i64> = dispatcher
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(ids, vec![a.id, c.id]);
    assert!(store.list_all().unwrap().is_empty());
}

#[derive(Default)]
struct GatedDispatcher {
    started: Notify,
    release: Notify,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait]
impl ActionDispatcher for GatedDispatcher {
    async fn dispatch(&self, _action: &PendingAction) -> Result<(), DispatchError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn second_trigger_during_drain_is_a_no_op() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    store.enqueue(&medication_log("med-1")).unwrap();
    let gate = Arc::new(GatedDispatcher::default());
    let o = Arc::new(SyncOrchestrator::new(
        Arc::clone(&store),
        gate.clone(),
        RetryPolicy::default(),
    ));

    let first = tokio::spawn({
        let o = Arc::clone(&o);
        async move { o.sync_now().await }
    });

    gate.started.notified().await;
    assert_eq!(o.state(), SyncState::Syncing);
    assert!(o.sync_now().await.unwrap().is_none());
    assert!(o.sync_if_pending().await.unwrap().is_none());

    gate.release.notify_one();
    let report = first.await.unwrap().unwrap().unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(o.state(), SyncState::Idle);
    assert_eq!(gate.max_active.load(Ordering::SeqCst), 1);
}

struct EnqueueDuringDrain {
    store: Arc<QueueStore>,
    done: AtomicBool,
    calls: AtomicUsize,
}

#[async_trait]
impl ActionDispatcher for EnqueueDuringDrain {
    async fn dispatch(&self, _action: &PendingAction) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.done.swap(true, Ordering::SeqCst) {
            self.store
                .enqueue(&shift_checkin("late"))
                .map_err(|e| DispatchError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn actions_enqueued_mid_drain_wait_for_the_next_one() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    store.enqueue(&medication_log("med-1")).unwrap();
    let dispatcher = Arc::new(EnqueueDuringDrain {
        store: Arc::clone(&store),
        done: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
    });
    let o = SyncOrchestrator::new(Arc::clone(&store), dispatcher.clone(), RetryPolicy::default());

    let report = o.sync_now().await.unwrap().unwrap();
    assert_eq!((report.attempted, report.synced), (1, 1));
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 1);

    let pending = store.list_all().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].decode().unwrap(), shift_checkin("late"));

    let next = o.sync_now().await.unwrap().unwrap();
    assert_eq!(next.synced, 1);
    assert!(store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn startup_drain_runs_only_with_pending_actions() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let reporter = Arc::new(CollectingReporter::default());
    let engine = engine_with(Arc::clone(&store), Arc::clone(&dispatcher), Arc::clone(&reporter));

    assert!(engine.orchestrator.sync_if_pending().await.unwrap().is_none());
    assert!(reporter.reports.lock().unwrap().is_empty());

    store.enqueue(&shift_checkin("shift-1")).unwrap();
    let report = engine.orchestrator.sync_if_pending().await.unwrap().unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(reporter.reports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn custom_budget_from_config_is_honoured() {
    let store = Arc::new(QueueStore::in_memory().unwrap());
    let dispatcher = Arc::new(RecordingDispatcher::failing(&["shift-1"]));
    let cfg = Config {
        max_attempts: 1,
        ..Config::default()
    };
    let engine = SyncEngine::assemble(
        &cfg,
        Arc::clone(&store),
        dispatcher,
        Arc::new(ManualSource::new(true)),
        Arc::new(CollectingReporter::default()),
    );

    store.enqueue(&shift_checkin("shift-1")).unwrap();
    let report = engine.orchestrator.sync_now().await.unwrap().unwrap();
    assert_eq!(report.failed, 1);
    assert!(store.list_all().unwrap().is_empty());
    assert!(engine.probe().await);
}

#[tokio::test]
async fn unreadable_row_is_skipped_without_blocking_its_neighbours() {
    let (_dir, db_path) = setup_test_db("foreign_row");
    let store = Arc::new(QueueStore::open(&db_path).unwrap());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let reporter = Arc::new(CollectingReporter::default());
    let engine = engine_with(Arc::clone(&store), Arc::clone(&dispatcher), Arc::clone(&reporter));

    store.enqueue(&medication_log("med-1")).unwrap();
    let foreign = insert_foreign_row(&db_path, "vital_signs");
    store.enqueue(&shift_checkin("shift-1")).unwrap();

    let err = engine.orchestrator.sync_now().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Dispatch(DispatchError::UnknownActionType(ref t)) if t == "vital_signs"
    ));
    assert_eq!(engine.orchestrator.state(), SyncState::Idle);

    // Both neighbours went out and the pass was fully accounted for.
    assert_eq!(dispatcher.seen_types(), vec!["medication_log", "shift_checkin"]);
    let remaining = store.list_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, foreign);
    assert_eq!(remaining[0].retry_count, 0);
    assert!(engine.orchestrator.last_sync().unwrap().is_some());
    assert!(!StoreInvalidator::stamps(&store).unwrap().is_empty());

    let report = reporter.reports.lock().unwrap()[0].clone();
    assert_eq!(
        (report.attempted, report.synced, report.skipped),
        (3, 2, 1)
    );
    assert_eq!(
        report.invalidated,
        BTreeSet::from([QueryKey::Medications, QueryKey::Timeline, QueryKey::Shifts])
    );

    // Later drains keep raising it but still deliver newer actions.
    store.enqueue(&timeline_entry("cr-1", "Nap")).unwrap();
    assert!(engine.orchestrator.sync_now().await.is_err());
    assert_eq!(dispatcher.seen_types().last().unwrap(), "timeline_entry");
    assert_eq!(store.list_all().unwrap().len(), 1);
}
