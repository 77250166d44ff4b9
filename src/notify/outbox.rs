//! Queue messages in the `outbox` table for an external mail transport.

use rusqlite::Connection;

use crate::storage::outbox::OutboxStorage;
use crate::{LifecycleError, LifecycleResult};

use super::Notifier;

pub struct OutboxNotifier<'c> {
    conn: &'c Connection,
}

impl<'c> OutboxNotifier<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl Notifier for OutboxNotifier<'_> {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> LifecycleResult<()> {
        OutboxStorage::enqueue(self.conn, recipient, subject, body).map_err(|e| {
            LifecycleError::Notification {
                recipient: recipient.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}
