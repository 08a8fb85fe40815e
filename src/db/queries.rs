use crate::errors::{AppError, AppResult};
use crate::models::action::{ActionRequest, PendingAction};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

pub const META_LAST_SYNC: &str = "last_sync";

pub fn map_row(row: &Row) -> Result<PendingAction> {
    let created_str: String = row.get("created_at")?;
    let created_at = parse_timestamp(&created_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(PendingAction {
        id: row.get("id")?,
        action_type: row.get("action_type")?,
        payload: row.get("payload")?,
        retry_count: row.get("retry_count")?,
        created_at,
    })
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidTimestamp(s.to_string()))
}

pub fn insert_action(conn: &Connection, action: &ActionRequest) -> AppResult<PendingAction> {
    // Stored with millisecond precision; return exactly what a reload yields.
    let created_at = Utc::now().trunc_subsecs(3);
    let payload = action.payload_json()?;
    let action_type = action.kind().to_db_str();

    conn.execute(
        "INSERT INTO pending_actions (action_type, payload, retry_count, created_at)
         VALUES (?1, ?2, 0, ?3)",
        params![action_type, payload, format_timestamp(&created_at)],
    )?;

    Ok(PendingAction {
        id: conn.last_insert_rowid(),
        action_type: action_type.to_string(),
        payload,
        retry_count: 0,
        created_at,
    })
}

pub fn load_actions(conn: &Connection) -> AppResult<Vec<PendingAction>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, action_type, payload, retry_count, created_at
         FROM pending_actions
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count_actions(conn: &Connection) -> AppResult<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM pending_actions", [], |row| row.get(0))?;
    Ok(n as usize)
}

pub fn count_actions_by_type(conn: &Connection) -> AppResult<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT action_type, COUNT(*) FROM pending_actions
         GROUP BY action_type
         ORDER BY action_type",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Returns the number of rows deleted (0 when the id is already gone).
pub fn delete_action(conn: &Connection, id: i64) -> AppResult<usize> {
    let n = conn.execute("DELETE FROM pending_actions WHERE id = ?1", [id])?;
    Ok(n)
}

pub fn set_retry_count(conn: &Connection, id: i64, retry_count: u32) -> AppResult<usize> {
    let n = conn.execute(
        "UPDATE pending_actions SET retry_count = ?1 WHERE id = ?2",
        params![retry_count, id],
    )?;
    Ok(n)
}

pub fn get_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    let v = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

pub fn load_meta_with_prefix(conn: &Connection, prefix: &str) -> AppResult<Vec<(String, String)>> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM meta WHERE key LIKE ?1 || '%' ORDER BY key")?;
    let rows = stmt.query_map([prefix], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
