//! Watch loop: one cycle every `watch_interval_secs`, until SIGINT/SIGTERM.
//!
//! The run gate still throttles cycles; the watch interval only sets how
//! often the gate is asked. Config is reloaded before every tick.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use inactive_user::clock::{Clock, SystemClock};
use inactive_user::config::LifecycleConfig;
use inactive_user::engine::CycleOutcome;
use inactive_user::storage::path_utils;
use rusqlite::Connection;

pub fn run() -> Result<()> {
    let conn = super::open_db()?;

    let pid_path = path_utils::pid_path();
    std::fs::write(&pid_path, std::process::id().to_string())
        .with_context(|| format!("Failed to write {}", pid_path.display()))?;

    // Set by the signal handlers
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.clone())
        .context("Failed to register SIGINT handler")?;
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.clone())
        .context("Failed to register SIGTERM handler")?;

    tracing::info!(pid = std::process::id(), "Watch mode started");

    let clock = SystemClock;
    let mut next_tick = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        if Instant::now() >= next_tick {
            let config = LifecycleConfig::load();
            tick(&config, &conn, &clock);
            let interval = Duration::from_secs(config.scheduler.watch_interval_secs.max(1));
            next_tick = Instant::now() + interval;
        }
        std::thread::sleep(Duration::from_secs(1));
    }

    tracing::info!("Shutting down watch mode");
    let _ = std::fs::remove_file(&pid_path);
    Ok(())
}

/// One gated cycle inside catch_unwind so a panic never ends the watch.
/// AssertUnwindSafe because rusqlite::Connection is not RefUnwindSafe.
fn tick(config: &LifecycleConfig, conn: &Connection, clock: &dyn Clock) {
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration, cycle skipped");
        return;
    }

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        super::run::run_once(config, conn, clock.now(), false)
    }));

    match result {
        Ok(Ok(CycleOutcome::Completed(report))) => {
            tracing::info!(
                transitions = report.transitions(),
                messages_sent = report.messages_sent(),
                "Watch cycle complete"
            );
        }
        Ok(Ok(CycleOutcome::Skipped { next_due_at, .. })) => {
            tracing::debug!(next_due_at = %next_due_at, "Cycle not due yet");
        }
        Ok(Err(e)) => {
            tracing::error!(error = %format!("{:#}", e), "Watch cycle failed");
        }
        Err(_) => {
            tracing::error!("Watch cycle panicked. Watch continues.");
        }
    }
}
