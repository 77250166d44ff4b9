//! Lifecycle configuration: thresholds, mail texts, scheduling, delivery.
//!
//! Stored as JSON in `{data_dir}/config.json`. Durations are whole seconds;
//! `0` disables the corresponding pipeline.

use std::path::Path;
use std::sync::OnceLock;

use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MIN_INTERVAL_SECS, DEFAULT_SITE_NAME, DEFAULT_SKEW_TOLERANCE_SECS,
    DEFAULT_WATCH_INTERVAL_SECS, WEBHOOK_TIMEOUT_SECS,
};
use crate::notify::templates::MailKind;
use crate::{LifecycleError, LifecycleResult};

pub const ONE_DAY_SECS: u64 = 86_400;
pub const ONE_WEEK_SECS: u64 = 7 * ONE_DAY_SECS;

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Immutable per run. Recognized keys are exactly the fields below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub notify_admin_after_secs: u64,
    pub notify_user_after_secs: u64,
    pub block_after_secs: u64,
    pub block_warn_lead_secs: u64,
    pub delete_after_secs: u64,
    pub delete_warn_lead_secs: u64,
    pub notify_on_block: bool,
    pub notify_admin_on_block: bool,
    pub notify_on_delete: bool,
    pub notify_admin_on_delete: bool,
    pub preserve_content_owners: bool,
    pub admin_recipients: Vec<String>,
}

fn enabled(secs: u64) -> Option<Duration> {
    match secs {
        0 => None,
        s => i64::try_from(s).ok().and_then(Duration::try_seconds),
    }
}

impl ThresholdConfig {
    pub fn notify_admin_after(&self) -> Option<Duration> {
        enabled(self.notify_admin_after_secs)
    }

    pub fn notify_user_after(&self) -> Option<Duration> {
        enabled(self.notify_user_after_secs)
    }

    pub fn block_after(&self) -> Option<Duration> {
        enabled(self.block_after_secs)
    }

    pub fn block_warn_lead(&self) -> Option<Duration> {
        enabled(self.block_warn_lead_secs)
    }

    pub fn delete_after(&self) -> Option<Duration> {
        enabled(self.delete_after_secs)
    }

    pub fn delete_warn_lead(&self) -> Option<Duration> {
        enabled(self.delete_warn_lead_secs)
    }

    /// Checks recipients and warn-lead ordering. Action thresholds without a
    /// lead are accepted but logged: such a pipeline never acts.
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.admin_recipients.is_empty() {
            return Err(LifecycleError::Config(
                "admin_recipients must list at least one address".into(),
            ));
        }
        let invalid: Vec<&str> = self
            .admin_recipients
            .iter()
            .map(|s| s.trim())
            .filter(|s| !is_valid_email(s))
            .collect();
        match invalid.len() {
            0 => {}
            1 => {
                return Err(LifecycleError::Config(format!(
                    "{} is not a valid e-mail address",
                    invalid[0]
                )))
            }
            _ => {
                return Err(LifecycleError::Config(format!(
                    "The following e-mail addresses are invalid: {}",
                    invalid.join(", ")
                )))
            }
        }

        check_lead("block", self.block_after_secs, self.block_warn_lead_secs)?;
        check_lead("delete", self.delete_after_secs, self.delete_warn_lead_secs)?;
        Ok(())
    }
}

fn check_lead(axis: &str, after: u64, lead: u64) -> LifecycleResult<()> {
    if after > 0 && lead >= after {
        return Err(LifecycleError::Config(format!(
            "{axis} warn lead ({lead}s) must be shorter than the {axis} threshold ({after}s)"
        )));
    }
    if after > 0 && lead == 0 {
        tracing::warn!(
            axis = axis,
            after_secs = after,
            "Action threshold set without a warn lead; no new warnings are issued"
        );
    }
    Ok(())
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-']+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$")
            .expect("email pattern is valid")
    })
}

pub fn is_valid_email(address: &str) -> bool {
    email_regex().is_match(address)
}

/// Split a comma-separated recipient list, trimming spaces.
pub fn parse_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// MAIL
// ============================================================================

/// Site identity and optional body overrides, keyed by message kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MailConfig {
    pub site_name: String,
    pub site_url: String,
    pub notify_text: Option<String>,
    pub notify_admin_text: Option<String>,
    pub block_warn_text: Option<String>,
    pub block_notify_text: Option<String>,
    pub block_notify_admin_text: Option<String>,
    pub delete_warn_text: Option<String>,
    pub delete_notify_text: Option<String>,
    pub delete_notify_admin_text: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            site_name: DEFAULT_SITE_NAME.to_string(),
            site_url: "http://localhost".to_string(),
            notify_text: None,
            notify_admin_text: None,
            block_warn_text: None,
            block_notify_text: None,
            block_notify_admin_text: None,
            delete_warn_text: None,
            delete_notify_text: None,
            delete_notify_admin_text: None,
        }
    }
}

impl MailConfig {
    /// Configured body override for `kind`, if any non-blank one is set.
    pub fn override_for(&self, kind: MailKind) -> Option<&str> {
        let text = match kind {
            MailKind::Notify => &self.notify_text,
            MailKind::NotifyAdmin => &self.notify_admin_text,
            MailKind::BlockWarn => &self.block_warn_text,
            MailKind::BlockNotify => &self.block_notify_text,
            MailKind::BlockNotifyAdmin => &self.block_notify_admin_text,
            MailKind::DeleteWarn => &self.delete_warn_text,
            MailKind::DeleteNotify => &self.delete_notify_text,
            MailKind::DeleteNotifyAdmin => &self.delete_notify_admin_text,
        };
        text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum spacing between two cycles.
    pub min_interval_secs: u64,
    /// A trigger this early is still accepted.
    pub skew_tolerance_secs: u64,
    /// Watch mode polling period.
    pub watch_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            skew_tolerance_secs: DEFAULT_SKEW_TOLERANCE_SECS,
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
        }
    }
}

// ============================================================================
// DELIVERY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Emit messages to the log only.
    Log,
    /// Queue messages in the SQLite outbox for an external mailer.
    #[default]
    Outbox,
    /// POST each message as JSON.
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeliveryConfig {
    pub mode: DeliveryMode,
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            webhook_url: None,
            timeout_secs: WEBHOOK_TIMEOUT_SECS,
        }
    }
}

// ============================================================================
// ROOT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    pub thresholds: ThresholdConfig,
    pub mail: MailConfig,
    pub scheduler: SchedulerConfig,
    pub delivery: DeliveryConfig,
}

impl LifecycleConfig {
    /// Load from `{data_dir}/config.json`.
    /// Returns defaults if file is missing or invalid.
    pub fn load() -> Self {
        let config_path = crate::storage::path_utils::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Invalid lifecycle config, using defaults"
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Strict load: missing or malformed files are errors.
    pub fn load_from(path: &Path) -> LifecycleResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> LifecycleResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        self.thresholds.validate()?;
        if self.scheduler.skew_tolerance_secs >= self.scheduler.min_interval_secs
            && self.scheduler.min_interval_secs > 0
        {
            return Err(LifecycleError::Config(
                "skew tolerance must be shorter than the minimum run interval".into(),
            ));
        }
        if self.delivery.mode == DeliveryMode::Webhook && self.delivery.webhook_url.is_none() {
            return Err(LifecycleError::Config(
                "webhook delivery requires delivery.webhook_url".into(),
            ));
        }
        Ok(())
    }
}
