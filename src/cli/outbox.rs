use anyhow::{bail, Context, Result};
use inactive_user::storage::outbox::OutboxStorage;
use inactive_user::time_utils::format_date;

/// `outbox [--limit N] [--ack <id>]`
pub fn run(limit: usize, ack: Option<&str>) -> Result<()> {
    let conn = super::open_db()?;

    if let Some(id) = ack {
        if !OutboxStorage::mark_sent(&conn, id).context("Failed to update outbox")? {
            bail!("No pending message with id {}", id);
        }
        println!("Marked {} as sent", id);
        return Ok(());
    }

    let entries = OutboxStorage::list(&conn, limit).context("Failed to list outbox")?;
    if entries.is_empty() {
        println!("Outbox is empty.");
        return Ok(());
    }

    for e in &entries {
        println!("[{}] {} -> {}", format_date(&e.queued_at), e.id, e.recipient);
        println!("  {}", e.subject);
    }

    let pending = OutboxStorage::count_pending(&conn).unwrap_or(entries.len());
    println!("\n{} shown, {} pending", entries.len(), pending);
    Ok(())
}
