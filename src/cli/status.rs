use anyhow::{Context, Result};
use inactive_user::account::AccountStatus;
use inactive_user::config::LifecycleConfig;
use inactive_user::run_gate::RunGate;
use inactive_user::storage::outbox::OutboxStorage;
use inactive_user::storage::path_utils;
use inactive_user::storage::run_state::RunStateStorage;
use inactive_user::storage::AccountStorage;
use inactive_user::time_utils::{format_date, format_interval};

pub fn run() -> Result<()> {
    let config = LifecycleConfig::load();
    let conn = super::open_db()?;

    let active = AccountStorage::count_by_status(&conn, AccountStatus::Active).unwrap_or(0);
    let blocked = AccountStorage::count_by_status(&conn, AccountStatus::Blocked).unwrap_or(0);
    let protected = AccountStorage::count_protected(&conn).unwrap_or(0);
    let pending = OutboxStorage::count_pending(&conn).unwrap_or(0);
    let last_run = RunStateStorage::get(&conn).context("Failed to read run state")?;

    println!("Inactive User Status");
    println!("====================");
    println!("Data dir: {}", path_utils::data_dir().display());
    println!();
    println!("Accounts:");
    println!("  Active:    {:>5}", active);
    println!("  Blocked:   {:>5}", blocked);
    println!("  Protected: {:>5}", protected);
    println!();

    let t = &config.thresholds;
    println!("Thresholds:");
    for (label, value) in [
        ("Notify admin", t.notify_admin_after()),
        ("Notify user", t.notify_user_after()),
        ("Block", t.block_after()),
        ("Block warn", t.block_warn_lead()),
        ("Delete", t.delete_after()),
        ("Delete warn", t.delete_warn_lead()),
    ] {
        let shown = value.map(format_interval).unwrap_or_else(|| "disabled".to_string());
        println!("  {:<13}{}", format!("{}:", label), shown);
    }
    println!();

    match last_run {
        Some(at) => {
            let gate = RunGate::from_config(&config.scheduler);
            println!("Last run: {}", format_date(&at));
            println!("Next due: {}", format_date(&gate.next_due(at)));
        }
        None => println!("Last run: never"),
    }
    println!("Outbox:   {} pending", pending);

    let pid_file = path_utils::pid_path();
    println!();
    match std::fs::read_to_string(&pid_file) {
        Ok(pid) => println!("Watch: running (PID {})", pid.trim()),
        Err(_) => println!("Watch: not running"),
    }

    Ok(())
}
