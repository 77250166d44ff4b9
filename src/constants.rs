// === Reserved accounts ===
/// Anonymous visitor account. Never part of the lifecycle.
pub const ANONYMOUS_ACCOUNT_ID: u64 = 0;
/// First administrator created at install time. Never part of the lifecycle.
pub const PRIMORDIAL_ADMIN_ID: u64 = 1;

// === Phase 0 ===
/// Activity inside this window re-arms the admin notification.
pub const REACTIVATION_WINDOW_DAYS: i64 = 7;

// === Run gate ===
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 86_400;
/// Cron rarely fires on the exact second; tolerate a small early trigger.
pub const DEFAULT_SKEW_TOLERANCE_SECS: u64 = 300;
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 3_600;

// === SQLite Tuning ===
pub const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;

// === Delivery ===
pub const WEBHOOK_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SITE_NAME: &str = "Site";

// === Schema ===
pub const RUN_STATE_KEY: &str = "inactive_user_timestamp";
