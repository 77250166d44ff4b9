//! Shared test utilities: builders, DB setup, fakes, time helpers.
//!
//! Available only under `#[cfg(test)]`.

use std::cell::RefCell;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use crate::account::{AccountActivityRecord, AccountId, AccountStatus};
use crate::notify::Notifier;
use crate::repository::RunStateStore;
use crate::storage::migrations;
use crate::{LifecycleError, LifecycleResult};

// ============================================================================
// AccountBuilder
// ============================================================================

/// Defaults: active, `user{id}` / `user{id}@example.com`, created 500 days
/// before [`fixed_now`], never logged in, no lifecycle flags.
pub struct AccountBuilder {
    record: AccountActivityRecord,
}

impl AccountBuilder {
    pub fn new(id: u64) -> Self {
        let name = format!("user{}", id);
        let mail = format!("{}@example.com", name);
        Self {
            record: AccountActivityRecord::new(
                AccountId(id),
                &name,
                &mail,
                fixed_now() - Duration::days(500),
            ),
        }
    }

    /// Also derives the address from the name.
    pub fn name(mut self, name: &str) -> Self {
        self.record.name = name.to_string();
        self.record.mail = format!("{}@example.com", name);
        self
    }

    pub fn mail(mut self, mail: &str) -> Self {
        self.record.mail = mail.to_string();
        self
    }

    pub fn created_days_ago(mut self, now: DateTime<Utc>, d: i64) -> Self {
        self.record.created_at = days_ago(now, d);
        self
    }

    /// Logged in and last seen `d` days before `now`.
    pub fn logged_in_days_ago(mut self, now: DateTime<Utc>, d: i64) -> Self {
        let at = days_ago(now, d);
        if self.record.created_at > at {
            self.record.created_at = at - Duration::days(1);
        }
        self.record.last_login_at = Some(at);
        self.record.last_access_at = Some(at);
        self
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.record.status = status;
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.record.protected = protected;
        self
    }

    pub fn admin_notified(mut self, at: DateTime<Utc>) -> Self {
        self.record.admin_notified = true;
        self.record.admin_notified_at = Some(at);
        self
    }

    pub fn user_notified(mut self, notified: bool) -> Self {
        self.record.user_notified = notified;
        self
    }

    pub fn admin_block_notified(mut self) -> Self {
        self.record.admin_block_notified = true;
        self
    }

    pub fn block_warned_at(mut self, expires: DateTime<Utc>) -> Self {
        self.record.block_warned_at = Some(expires);
        self
    }

    pub fn delete_warned_at(mut self, expires: DateTime<Utc>) -> Self {
        self.record.delete_warned_at = Some(expires);
        self
    }

    pub fn build(self) -> AccountActivityRecord {
        self.record
    }
}

// ============================================================================
// Time helpers
// ============================================================================

/// Whole-second instant so records survive a SQLite round-trip unchanged.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn days_ago(now: DateTime<Utc>, d: i64) -> DateTime<Utc> {
    now - Duration::days(d)
}

// ============================================================================
// DB setup helpers
// ============================================================================

/// Create an in-memory accounts DB with all migrations applied.
pub fn setup_db() -> Connection {
    let conn = Connection::open(":memory:").unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    migrations::migrate(&conn).unwrap();
    conn
}

// ============================================================================
// Fakes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records every message, in send order.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: RefCell<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.borrow().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|m| m.recipient.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> LifecycleResult<()> {
        self.sent.borrow_mut().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Fails for one address, records the rest in `inner`.
pub struct FailingNotifier {
    pub inner: RecordingNotifier,
    fail_for: String,
}

impl FailingNotifier {
    pub fn for_recipient(recipient: &str) -> Self {
        Self {
            inner: RecordingNotifier::new(),
            fail_for: recipient.to_string(),
        }
    }
}

impl Notifier for FailingNotifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> LifecycleResult<()> {
        if recipient == self.fail_for {
            return Err(LifecycleError::Notification {
                recipient: recipient.to_string(),
                reason: "mailbox unavailable".into(),
            });
        }
        self.inner.send(recipient, subject, body)
    }
}

/// In-memory run state; `broken()` fails every read.
#[derive(Default)]
pub struct MemoryRunState {
    last: RefCell<Option<DateTime<Utc>>>,
    broken: bool,
}

impl MemoryRunState {
    pub fn broken() -> Self {
        Self {
            last: RefCell::new(None),
            broken: true,
        }
    }
}

impl RunStateStore for MemoryRunState {
    fn last_run_at(&self) -> LifecycleResult<Option<DateTime<Utc>>> {
        if self.broken {
            return Err(LifecycleError::RunState("state backend offline".into()));
        }
        Ok(*self.last.borrow())
    }

    fn record_run(&self, at: DateTime<Utc>) -> LifecycleResult<()> {
        *self.last.borrow_mut() = Some(at);
        Ok(())
    }
}
