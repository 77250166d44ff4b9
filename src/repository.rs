//! Collaborator interfaces the engine drives.
//!
//! Any implementation honoring these contracts is interchangeable; the crate
//! ships a SQLite one in [`crate::storage::SqliteStore`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::account::{AccountActivityRecord, AccountId, AccountUpdate};
use crate::predicate::AccountQuery;
use crate::LifecycleResult;

/// Account activity records: filtered reads and batched conditional writes.
pub trait AccountRepository {
    /// Candidates for `query` at `now`. May return a superset; callers
    /// re-check with [`AccountQuery::matches`].
    fn query(&self, query: &AccountQuery, now: DateTime<Utc>) -> LifecycleResult<Vec<AccountActivityRecord>>;

    /// Apply every field set atomically. Returns the number of rows changed.
    fn batch_update(&self, updates: &BTreeMap<AccountId, AccountUpdate>) -> LifecycleResult<usize>;

    fn delete(&self, id: AccountId) -> LifecycleResult<()>;
}

pub trait ContentOwnershipChecker {
    /// Whether the account authored content that must be retained.
    fn owns_content(&self, id: AccountId) -> LifecycleResult<bool>;
}

/// Permanently removes an account and everything hanging off it.
pub trait AccountEraser {
    fn erase(&self, id: AccountId) -> LifecycleResult<()>;
}

/// Persisted last-run instant for the run gate.
pub trait RunStateStore {
    /// `Ok(None)` when no cycle ever ran. Errors mean the state is unknown.
    fn last_run_at(&self) -> LifecycleResult<Option<DateTime<Utc>>>;

    fn record_run(&self, at: DateTime<Utc>) -> LifecycleResult<()>;
}
