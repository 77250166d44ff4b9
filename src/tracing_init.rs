//! Shared tracing initialization.
//!
//! Watch mode appends to `{data_dir}/inactive-user.log`; one-shot commands
//! log to stderr so stdout stays clean for reports.

use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::storage::path_utils;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing to `{data_dir}/inactive-user.log` (append mode).
///
/// Falls back to stderr if the log file cannot be opened.
pub fn init_file_tracing() {
    let log_path = path_utils::log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    // APPEND mode: a cron-triggered `run` may write while `watch` is up.
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open {}: {}. Logging to stderr.", log_path.display(), e);
            init_stderr_tracing();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(log_file))
        .with_target(true)
        .with_ansi(false)
        .init();
}

/// Initialize tracing to stderr.
pub fn init_stderr_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
