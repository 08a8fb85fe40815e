use rusqlite::{Connection, OptionalExtension, Result};
use tracing::{info, warn};

/// Ensure that the `log` table exists.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
    let exists: Option<String> = stmt.query_row([name], |row| row.get(0)).optional()?;
    Ok(exists.is_some())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info('{table}')"))?;
    let cols = stmt.query_map([], |row| row.get::<_, String>(1))?;

    for c in cols {
        if c? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Create the `pending_actions` table. AUTOINCREMENT keeps ids monotonic,
/// so `ORDER BY id` is the enqueue order even after rows are removed.
fn create_pending_actions_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS pending_actions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            action_type  TEXT NOT NULL,
            payload      TEXT NOT NULL,
            retry_count  INTEGER NOT NULL DEFAULT 0 CHECK(retry_count >= 0),
            created_at   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn create_meta_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn migration_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn mark_applied(conn: &Connection, version: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    Ok(())
}

/// Queue files written before retries were tracked lack `retry_count`.
fn migrate_add_retry_count(conn: &Connection) -> Result<()> {
    let version = "20260301_0002_add_retry_count";

    if migration_applied(conn, version)? {
        return Ok(());
    }

    if !has_column(conn, "pending_actions", "retry_count")? {
        warn!(version, "adding retry_count column to pending_actions");
        conn.execute(
            "ALTER TABLE pending_actions ADD COLUMN retry_count INTEGER NOT NULL DEFAULT 0;",
            [],
        )?;
    }

    mark_applied(conn, version, "pending_actions.retry_count present")?;
    info!(version, "migration applied");
    Ok(())
}

/// Rename the pre-release `queue` table, if any, to `pending_actions`.
fn migrate_rename_legacy_queue(conn: &Connection) -> Result<()> {
    let version = "20260301_0001_rename_queue_table";

    if migration_applied(conn, version)? {
        return Ok(());
    }

    if table_exists(conn, "queue")? && !table_exists(conn, "pending_actions")? {
        warn!(version, "renaming legacy queue table to pending_actions");
        conn.execute_batch("ALTER TABLE queue RENAME TO pending_actions;")?;
    }

    mark_applied(conn, version, "legacy queue table renamed")?;
    info!(version, "migration applied");
    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// Invoked by db::initialize::init_db(); safe to run on every open.
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    migrate_rename_legacy_queue(conn)?;

    create_pending_actions_table(conn)?;
    create_meta_table(conn)?;

    migrate_add_retry_count(conn)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();
        run_pending_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM log WHERE operation = 'migration_applied'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(applied, 2);
    }

    #[test]
    fn legacy_queue_table_gains_retry_count() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
             );
             INSERT INTO queue (action_type, payload, created_at)
             VALUES ('shift_checkin', '{}', '2026-01-01T00:00:00Z');",
        )
        .unwrap();

        run_pending_migrations(&conn).unwrap();

        assert!(!table_exists(&conn, "queue").unwrap());
        assert!(has_column(&conn, "pending_actions", "retry_count").unwrap());
        let retries: i64 = conn
            .query_row("SELECT retry_count FROM pending_actions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(retries, 0);
    }
}
