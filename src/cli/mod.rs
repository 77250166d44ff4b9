pub mod accounts;
pub mod config;
pub mod init;
pub mod outbox;
pub mod run;
pub mod status;
pub mod watch;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use inactive_user::config::{DeliveryConfig, DeliveryMode};
use inactive_user::notify::{LogNotifier, Notifier, OutboxNotifier, WebhookNotifier};
use inactive_user::storage::database::open_connection;
use inactive_user::storage::{migrations, path_utils};
use rusqlite::Connection;

/// Open `{data_dir}/accounts.db` with migrations applied.
pub fn open_db() -> Result<Connection> {
    let db_path = path_utils::db_path();
    let conn = open_connection(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    migrations::migrate(&conn).context("Failed to migrate accounts database")?;
    Ok(conn)
}

/// Notifier selected by `delivery.mode`.
pub fn notifier_for<'c>(delivery: &DeliveryConfig, conn: &'c Connection) -> Result<Box<dyn Notifier + 'c>> {
    let notifier: Box<dyn Notifier + 'c> = match delivery.mode {
        DeliveryMode::Log => Box::new(LogNotifier),
        DeliveryMode::Outbox => Box::new(OutboxNotifier::new(conn)),
        DeliveryMode::Webhook => {
            let Some(url) = delivery.webhook_url.as_deref() else {
                bail!("delivery.mode is webhook but delivery.webhook_url is not set");
            };
            Box::new(WebhookNotifier::new(url, Duration::from_secs(delivery.timeout_secs)))
        }
    };
    Ok(notifier)
}
