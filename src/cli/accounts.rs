use anyhow::{bail, Context, Result};
use inactive_user::account::{AccountActivityRecord, AccountStatus};
use inactive_user::storage::AccountStorage;
use inactive_user::time_utils::format_date;

pub fn run(status_filter: Option<&str>) -> Result<()> {
    let status = match status_filter {
        Some(s) => match s.parse::<AccountStatus>() {
            Ok(status) => Some(status),
            Err(_) => bail!("Unknown status: {}. Use: active, blocked", s),
        },
        None => None,
    };

    let conn = super::open_db()?;
    let accounts = AccountStorage::list(&conn, status).context("Failed to list accounts")?;

    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!(
        "{:>6}  {:<20}  {:<8}  {:<20}  {}",
        "ID", "NAME", "STATUS", "LAST ACCESS", "FLAGS"
    );
    println!("{}", "-".repeat(72));

    for a in &accounts {
        let name = if a.name.chars().count() > 19 {
            format!("{}...", a.name.chars().take(16).collect::<String>())
        } else {
            a.name.clone()
        };
        let last_access = a
            .last_access_at
            .map(|at| format_date(&at))
            .unwrap_or_else(|| "never".to_string());

        println!(
            "{:>6}  {:<20}  {:<8}  {:<20}  {}",
            a.id,
            name,
            a.status.as_str(),
            last_access,
            flags(a),
        );
    }

    println!("\n{} account(s)", accounts.len());
    Ok(())
}

/// Compact lifecycle flags: A=admin notified, U=user notified,
/// B=block warning, D=delete warning, P=protected.
fn flags(a: &AccountActivityRecord) -> String {
    [
        (a.admin_notified, 'A'),
        (a.user_notified, 'U'),
        (a.block_warned_at.is_some(), 'B'),
        (a.delete_warned_at.is_some(), 'D'),
        (a.protected, 'P'),
    ]
    .iter()
    .map(|&(set, c)| if set { c } else { '-' })
    .collect()
}
