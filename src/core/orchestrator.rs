//! Sync orchestrator: drains the queue through the dispatcher.
//!
//! ```text
//! Idle ──(online | sync now | startup with pending rows)──▶ Syncing
//! Syncing ──(snapshot fully processed, or store error)──▶ Idle
//! ```
//!
//! A row that no longer matches the dispatch table is left in place and
//! skipped; the rest of the snapshot is still sent and accounted for, then
//! the first such error is returned to the caller.
//!
//! Only the orchestrator removes queued rows or bumps their retry counter.
//! Everything else gets read-only views (`pending_count`, `last_sync`).

use crate::core::cache::CacheInvalidator;
use crate::core::connectivity::{ConnectivityMonitor, Subscription};
use crate::core::dispatcher::ActionDispatcher;
use crate::core::report::SyncReporter;
use crate::core::retry::RetryPolicy;
use crate::db::store::QueueStore;
use crate::errors::{AppResult, DispatchError};
use crate::models::action::{PendingAction, QueryKey};
use crate::models::sync_report::DrainReport;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// Clears the syncing flag however the drain ends.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum Outcome {
    Synced,
    Retained,
    Dropped,
    Skipped(DispatchError),
}

pub struct SyncOrchestrator {
    store: Arc<QueueStore>,
    dispatcher: Arc<dyn ActionDispatcher>,
    policy: RetryPolicy,
    cache: Option<Arc<dyn CacheInvalidator>>,
    reporter: Option<Arc<dyn SyncReporter>>,
    syncing: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<QueueStore>,
        dispatcher: Arc<dyn ActionDispatcher>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            dispatcher,
            policy,
            cache: None,
            reporter: None,
            syncing: AtomicBool::new(false),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn SyncReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn state(&self) -> SyncState {
        if self.syncing.load(Ordering::SeqCst) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    pub fn pending_count(&self) -> AppResult<usize> {
        self.store.pending_count()
    }

    pub fn last_sync(&self) -> AppResult<Option<DateTime<Utc>>> {
        self.store.get_last_sync()
    }

    fn try_begin(&self) -> Option<SyncingGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncingGuard(&self.syncing))
    }

    /// Manual "sync now". Returns `Ok(None)` when a drain is already running.
    pub async fn sync_now(&self) -> AppResult<Option<DrainReport>> {
        let Some(_guard) = self.try_begin() else {
            debug!("drain already running, request ignored");
            return Ok(None);
        };

        let (report, invalid) = self.drain().await?;
        if let Some(reporter) = &self.reporter {
            reporter.drain_finished(&report);
        }
        match invalid {
            Some(e) => Err(e.into()),
            None => Ok(Some(report)),
        }
    }

    /// Startup trigger: drain only when something is queued.
    pub async fn sync_if_pending(&self) -> AppResult<Option<DrainReport>> {
        if self.store.pending_count()? == 0 {
            return Ok(None);
        }
        self.sync_now().await
    }

    /// Drain on every offline→online transition of `monitor`.
    /// Must be called from within a tokio runtime.
    pub fn attach(self: &Arc<Self>, monitor: &ConnectivityMonitor) -> Subscription {
        let weak = Arc::downgrade(self);
        monitor.on_status_change(move |status| {
            let Some(this) = weak.upgrade() else {
                return;
            };
            if let Some(reporter) = &this.reporter {
                reporter.connectivity_changed(status);
            }
            if status.is_online() {
                tokio::spawn(async move {
                    if let Err(e) = this.sync_now().await {
                        error!(error = %e, "automatic sync failed");
                    }
                });
            }
        })
    }

    /// Process the snapshot. The second value is the first programming
    /// error met, if any.
    async fn drain(&self) -> AppResult<(DrainReport, Option<DispatchError>)> {
        // Rows enqueued after this point wait for the next drain.
        let snapshot = self.store.list_all()?;
        let mut report = DrainReport::begin(snapshot.len());
        let mut touched: BTreeSet<QueryKey> = BTreeSet::new();
        let mut invalid: Option<DispatchError> = None;

        info!(pending = snapshot.len(), "drain started");

        for action in &snapshot {
            match self.process(action).await? {
                Outcome::Synced => {
                    report.synced += 1;
                    if let Some(kind) = action.kind() {
                        touched.extend(kind.affected_queries().iter().copied());
                    }
                }
                Outcome::Retained => report.retained += 1,
                Outcome::Dropped => report.failed += 1,
                Outcome::Skipped(e) => {
                    report.skipped += 1;
                    invalid.get_or_insert(e);
                }
            }
        }

        report.finished_at = Utc::now();

        if report.synced > 0 {
            self.store.set_last_sync(report.finished_at)?;
            if let Some(cache) = &self.cache {
                let keys: Vec<QueryKey> = touched.iter().copied().collect();
                if let Err(e) = cache.invalidate(&keys) {
                    warn!(error = %e, "cache invalidation failed");
                }
            }
            report.invalidated = touched;
        }

        info!(
            synced = report.synced,
            failed = report.failed,
            retained = report.retained,
            skipped = report.skipped,
            "drain finished"
        );
        if !report.is_empty()
            && let Err(e) = self.store.audit(
                "sync",
                "",
                &format!(
                    "synced={} failed={} retained={} skipped={}",
                    report.synced, report.failed, report.retained, report.skipped
                ),
            )
        {
            warn!(error = %e, "failed to write audit log");
        }

        Ok((report, invalid))
    }

    /// Dispatch one action and settle its row. Only store faults escape.
    /// Rows that do not match the dispatch table are left untouched.
    async fn process(&self, action: &PendingAction) -> AppResult<Outcome> {
        match self.dispatcher.dispatch(action).await {
            Ok(()) => {
                self.store.remove(action.id)?;
                debug!(action_id = action.id, action_type = %action.action_type, "action synced");
                Ok(Outcome::Synced)
            }
            Err(e) if e.is_programming_error() => {
                error!(
                    action_id = action.id,
                    action_type = %action.action_type,
                    error = %e,
                    "action does not match the dispatch table, skipped"
                );
                Ok(Outcome::Skipped(e))
            }
            Err(e) => self.settle_failure(action, &e),
        }
    }

    fn settle_failure(&self, action: &PendingAction, err: &DispatchError) -> AppResult<Outcome> {
        let attempts = action.retry_count.saturating_add(1);

        if self.policy.should_retry(attempts) {
            self.store.update_retry_count(action.id, attempts)?;
            warn!(
                action_id = action.id,
                action_type = %action.action_type,
                attempts,
                error = %err,
                "dispatch failed, will retry"
            );
            return Ok(Outcome::Retained);
        }

        self.store.remove(action.id)?;
        warn!(
            action_id = action.id,
            action_type = %action.action_type,
            attempts,
            error = %err,
            "dispatch failed, retry budget exhausted, action dropped"
        );
        if let Err(e) = self.store.audit(
            "drop",
            &action.action_type,
            &format!("action #{} dropped after {} attempts: {}", action.id, attempts, err),
        ) {
            warn!(error = %e, "failed to write audit log");
        }
        Ok(Outcome::Dropped)
    }
}
