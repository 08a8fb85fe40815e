#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use async_trait::async_trait;
use caresync::core::dispatcher::ActionDispatcher;
use caresync::core::report::SyncReporter;
use caresync::errors::DispatchError;
use caresync::models::action::{
    ActionRequest, MedicationLog, MedicationLogBody, MedicationStatus, PendingAction, ShiftEvent,
    ShiftEventBody, TimelineEntry, TimelineEntryBody,
};
use caresync::models::sync_report::DrainReport;
use serde_json::Map;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn cs() -> Command {
    cargo_bin_cmd!("caresync")
}

/// Unique DB path inside a fresh temp dir; keep the `TempDir` alive.
pub fn setup_test_db(name: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path: PathBuf = dir.path().join(format!("{}_caresync.sqlite", name));
    (dir, path.to_string_lossy().to_string())
}

pub fn medication_log(id: &str) -> ActionRequest {
    ActionRequest::MedicationLog(MedicationLog {
        medication_id: id.to_string(),
        body: MedicationLogBody {
            status: MedicationStatus::Taken,
            scheduled_time: None,
            notes: None,
            extra: Map::new(),
        },
    })
}

pub fn timeline_entry(recipient: &str, title: &str) -> ActionRequest {
    ActionRequest::TimelineEntry(TimelineEntry {
        care_recipient_id: recipient.to_string(),
        body: TimelineEntryBody {
            entry_type: "note".to_string(),
            title: title.to_string(),
            description: None,
            extra: Map::new(),
        },
    })
}

pub fn shift_checkin(shift: &str) -> ActionRequest {
    ActionRequest::ShiftCheckin(ShiftEvent {
        shift_id: shift.to_string(),
        body: ShiftEventBody::default(),
    })
}

/// Records every dispatched action; fails those whose target id is listed.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub seen: Mutex<Vec<(i64, String)>>,
    pub failing_targets: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl RecordingDispatcher {
    pub fn failing(targets: &[&str]) -> Self {
        let d = Self::default();
        d.failing_targets
            .lock()
            .unwrap()
            .extend(targets.iter().map(|t| t.to_string()));
        d
    }

    pub fn heal(&self, target: &str) {
        self.failing_targets.lock().unwrap().remove(target);
    }

    pub fn seen_types(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn dispatch(&self, action: &PendingAction) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request = action.decode()?;
        self.seen
            .lock()
            .unwrap()
            .push((action.id, action.action_type.clone()));
        if self
            .failing_targets
            .lock()
            .unwrap()
            .contains(request.target_id())
        {
            return Err(DispatchError::Rejected {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        Ok(())
    }
}

/// Collects drain reports instead of printing them.
#[derive(Default)]
pub struct CollectingReporter {
    pub reports: Mutex<Vec<DrainReport>>,
}

impl SyncReporter for CollectingReporter {
    fn drain_finished(&self, report: &DrainReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// Insert a row the dispatch table does not know, as a newer build might.
pub fn insert_foreign_row(db_path: &str, action_type: &str) -> i64 {
    let conn = rusqlite::Connection::open(db_path).expect("open db");
    conn.execute(
        "INSERT INTO pending_actions (action_type, payload, retry_count, created_at)
         VALUES (?1, '{}', 0, '2026-03-01T08:00:00.000Z')",
        [action_type],
    )
    .expect("insert row");
    conn.last_insert_rowid()
}
