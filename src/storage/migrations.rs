use crate::{LifecycleError, LifecycleResult};
use rusqlite::Connection;

/// Schema version actuelle
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Retourne la version de schema actuelle (0 si table absente)
pub fn get_schema_version(conn: &Connection) -> LifecycleResult<u32> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |r| r.get(0),
        )
        .map_err(|e| LifecycleError::Repository(e.to_string()))?;

    if !exists {
        return Ok(0);
    }

    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .map_err(|e| LifecycleError::Repository(e.to_string()))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: u32) -> LifecycleResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        rusqlite::params![version],
    )
    .map_err(|e| LifecycleError::Repository(e.to_string()))?;
    Ok(())
}

const ACCOUNTS_V1: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    mail TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    last_login_at TEXT,
    last_access_at TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    protected INTEGER NOT NULL DEFAULT 0,
    admin_notified INTEGER NOT NULL DEFAULT 0,
    admin_notified_at TEXT,
    user_notified INTEGER NOT NULL DEFAULT 0,
    block_warned_at TEXT,
    user_block_notified INTEGER NOT NULL DEFAULT 0,
    admin_block_notified INTEGER NOT NULL DEFAULT 0,
    delete_warned_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_accounts_status ON accounts(status);
CREATE INDEX IF NOT EXISTS idx_accounts_last_access ON accounts(last_access_at);

CREATE TABLE IF NOT EXISTS account_roles (
    account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    PRIMARY KEY (account_id, role)
);

CREATE TABLE IF NOT EXISTS account_sessions (
    id TEXT PRIMARY KEY,
    account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_account ON account_sessions(account_id);

-- No FK: content outlives its author
CREATE TABLE IF NOT EXISTS owned_content (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    kind TEXT NOT NULL DEFAULT 'node',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_content_owner ON owned_content(owner_id);

CREATE TABLE IF NOT EXISTS run_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

pub fn migrate(conn: &Connection) -> LifecycleResult<()> {
    let version = get_schema_version(conn)?;

    if version < 1 {
        conn.execute_batch(ACCOUNTS_V1)
            .map_err(|e| LifecycleError::Repository(format!("V1 migration failed: {}", e)))?;
        set_schema_version(conn, 1)?;
    }

    // V2: outbox for queued delivery
    if version < 2 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS outbox (
                id TEXT PRIMARY KEY,
                recipient TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                queued_at TEXT NOT NULL,
                sent_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_outbox_pending ON outbox(sent_at, queued_at);",
        )
        .map_err(|e| LifecycleError::Repository(format!("V2 migration failed: {}", e)))?;
        set_schema_version(conn, 2)?;
    }

    Ok(())
}
