use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use inactive_user::clock::{Clock, FixedClock, SystemClock};
use inactive_user::config::LifecycleConfig;
use inactive_user::engine::{Collaborators, CycleOutcome, LifecycleEngine};
use inactive_user::storage::SqliteStore;
use rusqlite::Connection;

/// `run [--force] [--now <rfc3339>]`: one cycle, report printed as JSON.
pub fn run(force: bool, now: Option<&str>) -> Result<()> {
    let config = LifecycleConfig::load();
    config.validate().context("Invalid configuration")?;

    let clock: Box<dyn Clock> = match now {
        Some(s) => Box::new(FixedClock::new(parse_instant(s)?)),
        None => Box::new(SystemClock),
    };

    let conn = super::open_db()?;
    let outcome = run_once(&config, &conn, clock.now(), force)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Wire the SQLite store and configured notifier, then run one cycle.
pub fn run_once(
    config: &LifecycleConfig,
    conn: &Connection,
    now: DateTime<Utc>,
    force: bool,
) -> Result<CycleOutcome> {
    let notifier = super::notifier_for(&config.delivery, conn)?;
    let store = SqliteStore::new(conn);
    let engine = LifecycleEngine::new(config, Collaborators::sqlite(&store, notifier.as_ref()));
    engine.run_cycle(now, force).context("Lifecycle cycle failed")
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid --now '{}', expected RFC 3339", s))?;
    Ok(parsed.with_timezone(&Utc))
}
