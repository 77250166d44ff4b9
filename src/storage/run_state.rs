use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::constants::RUN_STATE_KEY;
use crate::time_utils;
use crate::{LifecycleError, LifecycleResult};

pub struct RunStateStorage;

impl RunStateStorage {
    pub fn get(conn: &Connection) -> LifecycleResult<Option<DateTime<Utc>>> {
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM run_state WHERE key = ?1",
                params![RUN_STATE_KEY],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| LifecycleError::RunState(format!("Read last run failed: {}", e)))?;

        match value {
            None => Ok(None),
            Some(s) => time_utils::from_sqlite(&s)
                .map(Some)
                .map_err(|e| LifecycleError::RunState(format!("Corrupt last run '{}': {}", s, e))),
        }
    }

    pub fn set(conn: &Connection, at: &DateTime<Utc>) -> LifecycleResult<()> {
        conn.execute(
            "INSERT INTO run_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![RUN_STATE_KEY, time_utils::to_sqlite(at)],
        )
        .map_err(|e| LifecycleError::RunState(format!("Write last run failed: {}", e)))?;
        Ok(())
    }
}
