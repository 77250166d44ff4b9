use crate::time_utils;
use crate::{LifecycleError, LifecycleResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

pub struct OutboxStorage;

#[derive(Debug, Clone, Serialize)]
pub struct OutboxEntry {
    pub id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub queued_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

fn entry_from_row(row: &Row) -> rusqlite::Result<OutboxEntry> {
    let queued_str: String = row.get("queued_at")?;
    let sent_str: Option<String> = row.get("sent_at")?;
    Ok(OutboxEntry {
        id: row.get("id")?,
        recipient: row.get("recipient")?,
        subject: row.get("subject")?,
        body: row.get("body")?,
        queued_at: time_utils::from_sqlite(&queued_str).unwrap_or_else(|_| Utc::now()),
        sent_at: sent_str.and_then(|s| time_utils::from_sqlite(&s).ok()),
    })
}

impl OutboxStorage {
    pub fn enqueue(conn: &Connection, recipient: &str, subject: &str, body: &str) -> LifecycleResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO outbox (id, recipient, subject, body, queued_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, recipient, subject, body, time_utils::to_sqlite(&Utc::now())],
        )
        .map_err(|e| LifecycleError::Repository(format!("Enqueue outbox message failed: {}", e)))?;
        tracing::debug!(id = %id, recipient = recipient, "Message queued");
        Ok(id)
    }

    /// Pending messages, oldest first.
    pub fn list(conn: &Connection, limit: usize) -> LifecycleResult<Vec<OutboxEntry>> {
        let mut stmt = conn
            .prepare(
                "SELECT * FROM outbox WHERE sent_at IS NULL
                 ORDER BY queued_at ASC, rowid ASC LIMIT ?1",
            )
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit as i64], entry_from_row)
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn count_pending(conn: &Connection) -> LifecycleResult<usize> {
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM outbox WHERE sent_at IS NULL", [], |r| r.get(0))
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        Ok(n as usize)
    }

    pub fn mark_sent(conn: &Connection, id: &str) -> LifecycleResult<bool> {
        let n = conn
            .execute(
                "UPDATE outbox SET sent_at = ?1 WHERE id = ?2 AND sent_at IS NULL",
                params![time_utils::to_sqlite(&Utc::now()), id],
            )
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        Ok(n > 0)
    }
}
