use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::account::{AccountActivityRecord, AccountId, AccountStatus, AccountUpdate};
use crate::constants::{ANONYMOUS_ACCOUNT_ID, PRIMORDIAL_ADMIN_ID};
use crate::predicate::{cutoff, AccountQuery, WarningFilter};
use crate::repository::{AccountEraser, AccountRepository, ContentOwnershipChecker, RunStateStore};
use crate::storage::run_state::RunStateStorage;
use crate::time_utils;
use crate::{LifecycleError, LifecycleResult};

pub struct AccountStorage;

// ── Row mapping ──

fn conversion_failure(
    row: &Row,
    column: &str,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn time_col(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    time_utils::from_sqlite(&raw).map_err(|e| conversion_failure(row, column, e))
}

fn opt_time_col(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| time_utils::from_sqlite(&s).map_err(|e| conversion_failure(row, column, e)))
        .transpose()
}

/// Unparseable timestamps or statuses are errors, never defaulted.
fn account_from_row(row: &Row) -> rusqlite::Result<AccountActivityRecord> {
    let status_str: String = row.get("status")?;
    let status: AccountStatus = status_str
        .parse()
        .map_err(|e: String| conversion_failure(row, "status", e))?;

    Ok(AccountActivityRecord {
        id: AccountId(row.get::<_, i64>("id")? as u64),
        name: row.get("name")?,
        mail: row.get("mail")?,
        created_at: time_col(row, "created_at")?,
        last_login_at: opt_time_col(row, "last_login_at")?,
        last_access_at: opt_time_col(row, "last_access_at")?,
        status,
        protected: row.get::<_, i32>("protected")? != 0,
        admin_notified: row.get::<_, i32>("admin_notified")? != 0,
        admin_notified_at: opt_time_col(row, "admin_notified_at")?,
        user_notified: row.get::<_, i32>("user_notified")? != 0,
        block_warned_at: opt_time_col(row, "block_warned_at")?,
        user_block_notified: row.get::<_, i32>("user_block_notified")? != 0,
        admin_block_notified: row.get::<_, i32>("admin_block_notified")? != 0,
        delete_warned_at: opt_time_col(row, "delete_warned_at")?,
    })
}

fn time_value(dt: &DateTime<Utc>) -> Value {
    Value::Text(time_utils::to_sqlite(dt))
}

fn opt_time_value(dt: &Option<DateTime<Utc>>) -> Value {
    match dt {
        Some(dt) => time_value(dt),
        None => Value::Null,
    }
}

fn bool_value(b: bool) -> Value {
    Value::Integer(b as i64)
}

// ── Query translation ──

/// WHERE clause for `query`. Exact for flags, status and thresholds; warning
/// filters only check expiry, episode staleness is left to `matches`.
fn where_clause(query: &AccountQuery, now: DateTime<Utc>) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if !query.include_reserved {
        clauses.push("id NOT IN (?, ?)".into());
        values.push(Value::Integer(ANONYMOUS_ACCOUNT_ID as i64));
        values.push(Value::Integer(PRIMORDIAL_ADMIN_ID as i64));
    }
    if let Some(status) = query.status {
        clauses.push("status = ?".into());
        values.push(Value::Text(status.as_str().into()));
    }
    if let Some(duration) = query.inactive_for {
        let limit = time_value(&cutoff(now, duration));
        clauses.push(
            "((last_login_at IS NOT NULL AND last_access_at IS NOT NULL AND last_access_at < ?)
              OR (last_login_at IS NULL AND created_at < ?))"
                .into(),
        );
        values.push(limit.clone());
        values.push(limit);
    }
    if let Some(window) = query.accessed_within {
        clauses.push("(last_access_at IS NOT NULL AND last_access_at > ?)".into());
        values.push(time_value(&cutoff(now, window)));
    }
    for (column, flag) in [
        ("admin_notified", query.admin_notified),
        ("user_notified", query.user_notified),
        ("protected", query.protected),
    ] {
        if let Some(v) = flag {
            clauses.push(format!("{} = ?", column));
            values.push(bool_value(v));
        }
    }
    for (column, filter) in [
        ("block_warned_at", query.block_warning),
        ("delete_warned_at", query.delete_warning),
    ] {
        match filter {
            WarningFilter::Any => {}
            WarningFilter::Warnable { .. } => {
                clauses.push(format!("({0} IS NULL OR {0} < ?)", column));
                values.push(time_value(&now));
            }
            WarningFilter::Actionable { .. } => {
                clauses.push(format!("({0} IS NOT NULL AND {0} < ?)", column));
                values.push(time_value(&now));
            }
        }
    }

    let sql = if clauses.is_empty() {
        String::from("1 = 1")
    } else {
        clauses.join(" AND ")
    };
    (sql, values)
}

/// SET clause for a field set; `None` fields are skipped.
fn set_clause(update: &AccountUpdate) -> (Vec<&'static str>, Vec<Value>) {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    if let Some(status) = update.status {
        columns.push("status = ?");
        values.push(Value::Text(status.as_str().into()));
    }
    for (column, flag) in [
        ("protected = ?", update.protected),
        ("admin_notified = ?", update.admin_notified),
        ("user_notified = ?", update.user_notified),
        ("user_block_notified = ?", update.user_block_notified),
        ("admin_block_notified = ?", update.admin_block_notified),
    ] {
        if let Some(v) = flag {
            columns.push(column);
            values.push(bool_value(v));
        }
    }
    for (column, at) in [
        ("admin_notified_at = ?", &update.admin_notified_at),
        ("block_warned_at = ?", &update.block_warned_at),
        ("delete_warned_at = ?", &update.delete_warned_at),
    ] {
        if let Some(at) = at {
            columns.push(column);
            values.push(opt_time_value(at));
        }
    }
    (columns, values)
}

// ── CRUD ──

impl AccountStorage {
    pub fn insert(conn: &Connection, record: &AccountActivityRecord) -> LifecycleResult<()> {
        conn.execute(
            "INSERT INTO accounts (
                id, name, mail, created_at, last_login_at, last_access_at,
                status, protected, admin_notified, admin_notified_at, user_notified,
                block_warned_at, user_block_notified, admin_block_notified, delete_warned_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record.id.0 as i64,
                record.name,
                record.mail,
                time_utils::to_sqlite(&record.created_at),
                record.last_login_at.map(|dt| time_utils::to_sqlite(&dt)),
                record.last_access_at.map(|dt| time_utils::to_sqlite(&dt)),
                record.status.as_str(),
                record.protected as i32,
                record.admin_notified as i32,
                record.admin_notified_at.map(|dt| time_utils::to_sqlite(&dt)),
                record.user_notified as i32,
                record.block_warned_at.map(|dt| time_utils::to_sqlite(&dt)),
                record.user_block_notified as i32,
                record.admin_block_notified as i32,
                record.delete_warned_at.map(|dt| time_utils::to_sqlite(&dt)),
            ],
        )
        .map_err(|e| LifecycleError::Repository(format!("Insert account failed: {}", e)))?;
        tracing::debug!(account_id = %record.id, "Account inserted");
        Ok(())
    }

    pub fn get(conn: &Connection, id: AccountId) -> LifecycleResult<Option<AccountActivityRecord>> {
        conn.query_row(
            "SELECT * FROM accounts WHERE id = ?1",
            params![id.0 as i64],
            account_from_row,
        )
        .optional()
        .map_err(|e| LifecycleError::Repository(e.to_string()))
    }

    pub fn list(conn: &Connection, status: Option<AccountStatus>) -> LifecycleResult<Vec<AccountActivityRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT * FROM accounts WHERE (?1 IS NULL OR status = ?1) ORDER BY id ASC",
            )
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        let rows = stmt
            .query_map(params![status.map(|s| s.as_str())], account_from_row)
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| LifecycleError::Repository(e.to_string()))
    }

    pub fn count_by_status(conn: &Connection, status: AccountStatus) -> LifecycleResult<usize> {
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM accounts WHERE status = ?1",
                params![status.as_str()],
                |r| r.get(0),
            )
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        Ok(n as usize)
    }

    pub fn count_protected(conn: &Connection) -> LifecycleResult<usize> {
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM accounts WHERE protected = 1", [], |r| r.get(0))
            .map_err(|e| LifecycleError::Repository(e.to_string()))?;
        Ok(n as usize)
    }

    pub fn add_content(conn: &Connection, owner: AccountId, kind: &str) -> LifecycleResult<()> {
        conn.execute(
            "INSERT INTO owned_content (owner_id, kind, created_at) VALUES (?1, ?2, ?3)",
            params![owner.0 as i64, kind, time_utils::to_sqlite(&Utc::now())],
        )
        .map_err(|e| LifecycleError::Repository(format!("Insert content failed: {}", e)))?;
        Ok(())
    }

    pub fn add_role(conn: &Connection, id: AccountId, role: &str) -> LifecycleResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO account_roles (account_id, role) VALUES (?1, ?2)",
            params![id.0 as i64, role],
        )
        .map_err(|e| LifecycleError::Repository(format!("Insert role failed: {}", e)))?;
        Ok(())
    }

    pub fn add_session(conn: &Connection, id: AccountId) -> LifecycleResult<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO account_sessions (id, account_id, created_at) VALUES (?1, ?2, ?3)",
            params![session_id, id.0 as i64, time_utils::to_sqlite(&Utc::now())],
        )
        .map_err(|e| LifecycleError::Repository(format!("Insert session failed: {}", e)))?;
        Ok(session_id)
    }
}

// ── Collaborator implementations ──

/// SQLite-backed implementation of every engine collaborator.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl AccountRepository for SqliteStore<'_> {
    fn query(&self, query: &AccountQuery, now: DateTime<Utc>) -> LifecycleResult<Vec<AccountActivityRecord>> {
        let (filter, values) = where_clause(query, now);
        let sql = format!("SELECT * FROM accounts WHERE {} ORDER BY id ASC", filter);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| LifecycleError::Repository(format!("Prepare candidate query failed: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(values), account_from_row)
            .map_err(|e| LifecycleError::Repository(format!("Candidate query failed: {}", e)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| LifecycleError::Repository(format!("Candidate row decode failed: {}", e)))
    }

    fn batch_update(&self, updates: &BTreeMap<AccountId, AccountUpdate>) -> LifecycleResult<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| LifecycleError::Repository(format!("Begin batch update failed: {}", e)))?;
        let mut changed = 0usize;
        for (id, update) in updates {
            let (columns, mut values) = set_clause(update);
            if columns.is_empty() {
                continue;
            }
            let sql = format!("UPDATE accounts SET {} WHERE id = ?", columns.join(", "));
            values.push(Value::Integer(id.0 as i64));
            changed += tx
                .execute(&sql, params_from_iter(values))
                .map_err(|e| LifecycleError::Repository(format!("Update account {} failed: {}", id, e)))?;
        }
        // Dropping an uncommitted transaction rolls it back
        tx.commit()
            .map_err(|e| LifecycleError::Repository(format!("Commit batch update failed: {}", e)))?;
        Ok(changed)
    }

    fn delete(&self, id: AccountId) -> LifecycleResult<()> {
        let n = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1", params![id.0 as i64])
            .map_err(|e| LifecycleError::Repository(format!("Delete account {} failed: {}", id, e)))?;
        if n == 0 {
            return Err(LifecycleError::AccountNotFound(id.to_string()));
        }
        Ok(())
    }
}

impl ContentOwnershipChecker for SqliteStore<'_> {
    fn owns_content(&self, id: AccountId) -> LifecycleResult<bool> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM owned_content WHERE owner_id = ?1",
                params![id.0 as i64],
                |r| r.get(0),
            )
            .map_err(|e| LifecycleError::OwnershipCheck(format!("account {}: {}", id, e)))?;
        Ok(n > 0)
    }
}

impl AccountEraser for SqliteStore<'_> {
    /// Sessions, roles, then the account row, in one transaction.
    /// Owned content is left in place.
    fn erase(&self, id: AccountId) -> LifecycleResult<()> {
        let eraser_err = |e: rusqlite::Error| LifecycleError::Eraser(format!("account {}: {}", id, e));
        let tx = self.conn.unchecked_transaction().map_err(eraser_err)?;
        tx.execute("DELETE FROM account_sessions WHERE account_id = ?1", params![id.0 as i64])
            .map_err(eraser_err)?;
        tx.execute("DELETE FROM account_roles WHERE account_id = ?1", params![id.0 as i64])
            .map_err(eraser_err)?;
        let n = tx
            .execute("DELETE FROM accounts WHERE id = ?1", params![id.0 as i64])
            .map_err(eraser_err)?;
        if n == 0 {
            return Err(LifecycleError::AccountNotFound(id.to_string()));
        }
        tx.commit().map_err(eraser_err)?;
        Ok(())
    }
}

impl RunStateStore for SqliteStore<'_> {
    fn last_run_at(&self) -> LifecycleResult<Option<DateTime<Utc>>> {
        RunStateStorage::get(self.conn)
    }

    fn record_run(&self, at: DateTime<Utc>) -> LifecycleResult<()> {
        RunStateStorage::set(self.conn, &at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use chrono::Duration;

    #[test]
    fn test_insert_and_get_roundtrip_fields() {
        let conn = setup_db();
        let now = fixed_now();
        let rec = AccountBuilder::new(7)
            .logged_in_days_ago(now, 12)
            .block_warned_at(now + Duration::days(3))
            .protected(true)
            .build();
        AccountStorage::insert(&conn, &rec).unwrap();
        let got = AccountStorage::get(&conn, AccountId(7)).unwrap().unwrap();
        assert_eq!(got, rec);
    }

    #[test]
    fn test_get_missing_is_none() {
        let conn = setup_db();
        assert!(AccountStorage::get(&conn, AccountId(99)).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_timestamp_is_an_error() {
        let conn = setup_db();
        AccountStorage::insert(&conn, &AccountBuilder::new(7).build()).unwrap();
        conn.execute("UPDATE accounts SET last_access_at = 'yesterday' WHERE id = 7", [])
            .unwrap();

        assert!(AccountStorage::get(&conn, AccountId(7)).is_err());
        let store = SqliteStore::new(&conn);
        assert!(store.query(&AccountQuery::new(), fixed_now()).is_err());
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let conn = setup_db();
        AccountStorage::insert(&conn, &AccountBuilder::new(7).build()).unwrap();
        conn.execute("UPDATE accounts SET status = 'frozen' WHERE id = 7", [])
            .unwrap();

        assert!(AccountStorage::get(&conn, AccountId(7)).is_err());
    }

    #[test]
    fn test_query_inactivity_matches_predicate() {
        let conn = setup_db();
        let now = fixed_now();
        AccountStorage::insert(&conn, &AccountBuilder::new(2).logged_in_days_ago(now, 40).build()).unwrap();
        AccountStorage::insert(&conn, &AccountBuilder::new(3).logged_in_days_ago(now, 10).build()).unwrap();
        AccountStorage::insert(&conn, &AccountBuilder::new(4).created_days_ago(now, 400).build()).unwrap();
        AccountStorage::insert(&conn, &AccountBuilder::new(5).created_days_ago(now, 20).build()).unwrap();
        // Reserved accounts never come back
        AccountStorage::insert(&conn, &AccountBuilder::new(1).created_days_ago(now, 900).build()).unwrap();

        let store = SqliteStore::new(&conn);
        let q = AccountQuery::new().inactive_for(Duration::days(30));
        let ids: Vec<u64> = store.query(&q, now).unwrap().iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_query_flags_and_warning_filters() {
        let conn = setup_db();
        let now = fixed_now();
        AccountStorage::insert(
            &conn,
            &AccountBuilder::new(2)
                .logged_in_days_ago(now, 40)
                .block_warned_at(now + Duration::days(1))
                .build(),
        )
        .unwrap();
        AccountStorage::insert(
            &conn,
            &AccountBuilder::new(3)
                .logged_in_days_ago(now, 40)
                .block_warned_at(now - Duration::days(1))
                .build(),
        )
        .unwrap();
        AccountStorage::insert(&conn, &AccountBuilder::new(4).logged_in_days_ago(now, 40).build()).unwrap();

        let store = SqliteStore::new(&conn);
        let lead = Some(Duration::days(7));
        let warnable = AccountQuery::new().block_warning(WarningFilter::Warnable { lead });
        let actionable = AccountQuery::new().block_warning(WarningFilter::Actionable { lead });
        let ids = |q: &AccountQuery| -> Vec<u64> {
            store.query(q, now).unwrap().iter().map(|r| r.id.0).collect()
        };
        // SQL keeps expired warnings as warnable; `matches` narrows them.
        assert_eq!(ids(&warnable), vec![3, 4]);
        assert_eq!(ids(&actionable), vec![3]);
    }

    #[test]
    fn test_batch_update_applies_all_fields() {
        let conn = setup_db();
        let now = fixed_now();
        AccountStorage::insert(&conn, &AccountBuilder::new(2).build()).unwrap();
        AccountStorage::insert(&conn, &AccountBuilder::new(3).build()).unwrap();

        let mut updates = BTreeMap::new();
        updates.insert(
            AccountId(2),
            AccountUpdate::default()
                .status(AccountStatus::Blocked)
                .user_block_notified(true)
                .admin_notified(Some(now)),
        );
        updates.insert(AccountId(3), AccountUpdate::default().delete_warned_at(Some(now)));
        let store = SqliteStore::new(&conn);
        assert_eq!(store.batch_update(&updates).unwrap(), 2);

        let two = AccountStorage::get(&conn, AccountId(2)).unwrap().unwrap();
        assert_eq!(two.status, AccountStatus::Blocked);
        assert!(two.user_block_notified);
        assert!(two.admin_notified);
        assert_eq!(two.admin_notified_at, Some(now));
        let three = AccountStorage::get(&conn, AccountId(3)).unwrap().unwrap();
        assert_eq!(three.delete_warned_at, Some(now));
    }

    #[test]
    fn test_batch_update_rolls_back_on_failure() {
        let conn = setup_db();
        AccountStorage::insert(&conn, &AccountBuilder::new(2).build()).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_three BEFORE UPDATE ON accounts WHEN NEW.id = 3
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        AccountStorage::insert(&conn, &AccountBuilder::new(3).build()).unwrap();

        let mut updates = BTreeMap::new();
        updates.insert(AccountId(2), AccountUpdate::default().user_notified(true));
        updates.insert(AccountId(3), AccountUpdate::default().user_notified(true));
        let store = SqliteStore::new(&conn);
        assert!(matches!(store.batch_update(&updates), Err(LifecycleError::Repository(_))));

        let two = AccountStorage::get(&conn, AccountId(2)).unwrap().unwrap();
        assert!(!two.user_notified, "first update must be rolled back");
    }

    #[test]
    fn test_erase_removes_dependents_but_keeps_content() {
        let conn = setup_db();
        AccountStorage::insert(&conn, &AccountBuilder::new(2).build()).unwrap();
        AccountStorage::add_role(&conn, AccountId(2), "editor").unwrap();
        AccountStorage::add_session(&conn, AccountId(2)).unwrap();
        AccountStorage::add_content(&conn, AccountId(2), "comment").unwrap();

        let store = SqliteStore::new(&conn);
        store.erase(AccountId(2)).unwrap();

        assert!(AccountStorage::get(&conn, AccountId(2)).unwrap().is_none());
        let count = |table: &str| -> i64 {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(count("account_roles"), 0);
        assert_eq!(count("account_sessions"), 0);
        assert_eq!(count("owned_content"), 1);
    }

    #[test]
    fn test_erase_missing_account() {
        let conn = setup_db();
        let err = SqliteStore::new(&conn).erase(AccountId(42)).unwrap_err();
        assert!(matches!(err, LifecycleError::AccountNotFound(_)));
    }

    #[test]
    fn test_owns_content() {
        let conn = setup_db();
        AccountStorage::insert(&conn, &AccountBuilder::new(2).build()).unwrap();
        let store = SqliteStore::new(&conn);
        assert!(!store.owns_content(AccountId(2)).unwrap());
        AccountStorage::add_content(&conn, AccountId(2), "node").unwrap();
        assert!(store.owns_content(AccountId(2)).unwrap());
    }
}
