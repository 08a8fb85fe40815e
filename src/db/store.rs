//! Durable queue of pending actions plus the `lastSync` marker.
//!
//! Every mutation is a single-row statement, so a `list_all` running
//! alongside a `remove` never loses unrelated rows. Errors from SQLite are
//! returned as-is; an `Ok(vec![])` from [`QueueStore::list_all`] always
//! means the queue really is empty.

use crate::db::initialize::init_db;
use crate::db::log::{AuditEntry, audit, load_audit};
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::action::{ActionRequest, PendingAction};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct QueueStore {
    pool: Mutex<DbPool>,
    path: Option<String>,
}

impl QueueStore {
    /// Open (or create) the queue database at `path` and run migrations.
    pub fn open(path: &str) -> AppResult<Self> {
        let pool = DbPool::new(path)?;
        init_db(&pool.conn)?;
        debug!(path, "queue store opened");
        Ok(Self {
            pool: Mutex::new(pool),
            path: Some(path.to_string()),
        })
    }

    /// Non-durable store, for tests and dry runs.
    pub fn in_memory() -> AppResult<Self> {
        let pool = DbPool::in_memory()?;
        init_db(&pool.conn)?;
        Ok(Self {
            pool: Mutex::new(pool),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let pool = self
            .pool
            .lock()
            .map_err(|_| AppError::StoreUnavailable("connection lock poisoned".into()))?;
        f(&pool.conn)
    }

    pub fn enqueue(&self, action: &ActionRequest) -> AppResult<PendingAction> {
        let stored = self.with_conn(|conn| {
            let stored = queries::insert_action(conn, action)?;
            if let Err(e) = audit(
                conn,
                "enqueue",
                stored.action_type.as_str(),
                &format!("queued action #{}", stored.id),
            ) {
                warn!(error = %e, "failed to write audit log");
            }
            Ok(stored)
        })?;
        debug!(action_id = stored.id, action_type = %stored.action_type, "action enqueued");
        Ok(stored)
    }

    /// All queued actions, oldest first.
    pub fn list_all(&self) -> AppResult<Vec<PendingAction>> {
        self.with_conn(queries::load_actions)
    }

    pub fn pending_count(&self) -> AppResult<usize> {
        self.with_conn(queries::count_actions)
    }

    pub fn count_by_type(&self) -> AppResult<Vec<(String, i64)>> {
        self.with_conn(queries::count_actions_by_type)
    }

    /// Removing an id that is not queued is a no-op.
    pub fn remove(&self, id: i64) -> AppResult<()> {
        let n = self.with_conn(|conn| queries::delete_action(conn, id))?;
        if n == 0 {
            debug!(action_id = id, "remove: action already gone");
        }
        Ok(())
    }

    pub fn update_retry_count(&self, id: i64, retry_count: u32) -> AppResult<()> {
        let n = self.with_conn(|conn| queries::set_retry_count(conn, id, retry_count))?;
        if n == 0 {
            debug!(action_id = id, "update_retry_count: action already gone");
        }
        Ok(())
    }

    pub fn get_last_sync(&self) -> AppResult<Option<DateTime<Utc>>> {
        let raw = self.with_conn(|conn| queries::get_meta(conn, queries::META_LAST_SYNC))?;
        raw.map(|s| queries::parse_timestamp(&s)).transpose()
    }

    pub fn set_last_sync(&self, ts: DateTime<Utc>) -> AppResult<()> {
        self.with_conn(|conn| {
            queries::set_meta(
                conn,
                queries::META_LAST_SYNC,
                &queries::format_timestamp(&ts),
            )
        })
    }

    pub fn get_meta(&self, key: &str) -> AppResult<Option<String>> {
        self.with_conn(|conn| queries::get_meta(conn, key))
    }

    pub fn set_meta(&self, key: &str, value: &str) -> AppResult<()> {
        self.with_conn(|conn| queries::set_meta(conn, key, value))
    }

    pub fn meta_with_prefix(&self, prefix: &str) -> AppResult<Vec<(String, String)>> {
        self.with_conn(|conn| queries::load_meta_with_prefix(conn, prefix))
    }

    pub fn audit(&self, operation: &str, target: &str, message: &str) -> AppResult<()> {
        self.with_conn(|conn| audit(conn, operation, target, message))
    }

    pub fn audit_entries(&self) -> AppResult<Vec<AuditEntry>> {
        self.with_conn(load_audit)
    }

    pub fn integrity_check(&self) -> AppResult<String> {
        self.with_conn(|conn| {
            let res: String = conn.query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;
            Ok(res)
        })
    }

    pub fn vacuum(&self) -> AppResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch("VACUUM;")?;
            Ok(())
        })
    }

    pub fn run_migrations(&self) -> AppResult<()> {
        self.with_conn(init_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action::{ShiftEvent, ShiftEventBody};

    fn checkin(shift: &str) -> ActionRequest {
        ActionRequest::ShiftCheckin(ShiftEvent {
            shift_id: shift.into(),
            body: ShiftEventBody::default(),
        })
    }

    #[test]
    fn enqueue_assigns_increasing_ids_and_zero_retries() {
        let store = QueueStore::in_memory().unwrap();
        let a = store.enqueue(&checkin("s1")).unwrap();
        let b = store.enqueue(&checkin("s2")).unwrap();

        assert!(b.id > a.id);
        assert_eq!(a.retry_count, 0);
        assert_eq!(store.list_all().unwrap(), vec![a, b]);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = QueueStore::in_memory().unwrap();
        let a = store.enqueue(&checkin("s1")).unwrap();
        let b = store.enqueue(&checkin("s2")).unwrap();

        store.remove(a.id).unwrap();
        store.remove(a.id).unwrap();

        assert_eq!(store.list_all().unwrap(), vec![b]);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let store = QueueStore::in_memory().unwrap();
        let a = store.enqueue(&checkin("s1")).unwrap();
        store.remove(a.id).unwrap();
        let b = store.enqueue(&checkin("s2")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn update_retry_count_touches_only_the_counter() {
        let store = QueueStore::in_memory().unwrap();
        let a = store.enqueue(&checkin("s1")).unwrap();

        store.update_retry_count(a.id, 2).unwrap();
        store.update_retry_count(9999, 1).unwrap();

        let rows = store.list_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].retry_count, 2);
        assert_eq!(rows[0].payload, a.payload);
        assert_eq!(rows[0].action_type, a.action_type);
    }

    #[test]
    fn last_sync_starts_empty_and_round_trips() {
        let store = QueueStore::in_memory().unwrap();
        assert_eq!(store.get_last_sync().unwrap(), None);

        let now = DateTime::parse_from_rfc3339("2026-10-19T08:30:00.250Z")
            .unwrap()
            .with_timezone(&Utc);
        store.set_last_sync(now).unwrap();
        assert_eq!(store.get_last_sync().unwrap(), Some(now));
    }

    #[test]
    fn enqueue_is_audited() {
        let store = QueueStore::in_memory().unwrap();
        store.enqueue(&checkin("s1")).unwrap();
        let entries = store.audit_entries().unwrap();
        assert!(
            entries
                .iter()
                .any(|e| e.operation == "enqueue" && e.target == "shift_checkin")
        );
    }
}
