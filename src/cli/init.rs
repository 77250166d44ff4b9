use anyhow::{Context, Result};
use inactive_user::config::LifecycleConfig;
use inactive_user::storage::migrations;
use inactive_user::storage::path_utils;

/// inactive-user init: data dir, default config, migrated database.
pub fn run() -> Result<()> {
    let data_dir = path_utils::data_dir();
    println!("Initializing Inactive User in: {}", data_dir.display());

    // 1. Data directory
    std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
    println!("  Created data directory");

    // 2. Default config, never overwriting an existing one
    let config_path = path_utils::config_path();
    if config_path.exists() {
        println!("  Config already present: {}", config_path.display());
    } else {
        LifecycleConfig::default()
            .save_to(&config_path)
            .context("Failed to write default config")?;
        println!("  Wrote default config: {}", config_path.display());
    }

    // 3. Database + migrations
    let conn = super::open_db()?;
    let version = migrations::get_schema_version(&conn).context("Failed to read schema version")?;
    println!("  Database ready (schema v{}): {}", version, path_utils::db_path().display());

    println!();
    println!("Every pipeline is disabled until a threshold is set, e.g.:");
    println!("  inactive-user config set thresholds.admin_recipients '[\"admin@example.com\"]'");
    println!("  inactive-user config set thresholds.notify_user_after_secs 15552000");
    Ok(())
}
