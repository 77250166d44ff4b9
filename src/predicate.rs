//! Activity predicates shared by every phase.
//!
//! An account is *inactive since* a duration when its activity reference
//! (last access for accounts that logged in, creation time for accounts that
//! never did) lies strictly before `now - duration`.
//!
//! Two-phase timers store only the warning expiry. Whether an expired
//! warning may be acted on depends on the episode it belongs to: a warning
//! issued before the account's latest activity is stale and never actionable.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::account::{AccountActivityRecord, AccountStatus};

/// `now - duration`, saturating at the earliest representable instant.
pub fn cutoff(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(duration)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// True iff the account logged in and last accessed before the cutoff, or
/// never logged in and was created before it.
///
/// An account with a login but no recorded access has no history to judge
/// and is never inactive.
pub fn inactive_since(record: &AccountActivityRecord, duration: Duration, now: DateTime<Utc>) -> bool {
    let limit = cutoff(now, duration);
    match (record.last_login_at, record.last_access_at) {
        (Some(_), Some(access)) => access < limit,
        (Some(_), None) => false,
        (None, _) => record.created_at < limit,
    }
}

/// Renewed activity strictly inside `window`.
pub fn accessed_within(record: &AccountActivityRecord, window: Duration, now: DateTime<Utc>) -> bool {
    record
        .last_access_at
        .is_some_and(|access| access > cutoff(now, window))
}

/// Where one warn-then-act axis stands for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningState {
    /// No warning recorded.
    Unset,
    /// Warning recorded, expiry not yet reached.
    Outstanding(DateTime<Utc>),
    /// Expired warning issued in the current episode.
    Actionable(DateTime<Utc>),
    /// Expired warning issued before the account's latest activity.
    Stale(DateTime<Utc>),
}

impl WarningState {
    /// Classify `expires` for `record`. `lead` recovers the issue instant;
    /// without it an expired warning cannot be dated and counts as actionable.
    pub fn of(
        expires: Option<DateTime<Utc>>,
        lead: Option<Duration>,
        record: &AccountActivityRecord,
        now: DateTime<Utc>,
    ) -> Self {
        let Some(expires) = expires else {
            return Self::Unset;
        };
        if expires >= now {
            return Self::Outstanding(expires);
        }
        let issued = lead.and_then(|l| expires.checked_sub_signed(l));
        match (issued, record.activity_reference()) {
            (Some(issued), Some(reference)) if reference > issued => Self::Stale(expires),
            _ => Self::Actionable(expires),
        }
    }

    /// A fresh warning may be issued: none recorded, or only a stale one.
    pub fn can_warn(&self) -> bool {
        matches!(self, Self::Unset | Self::Stale(_))
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Actionable(_))
    }
}

/// Which warning states a query accepts on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningFilter {
    #[default]
    Any,
    /// No warning outstanding and none pending action.
    Warnable { lead: Option<Duration> },
    /// Expired warning from the current episode.
    Actionable { lead: Option<Duration> },
}

impl WarningFilter {
    fn accepts(
        &self,
        expires: Option<DateTime<Utc>>,
        record: &AccountActivityRecord,
        now: DateTime<Utc>,
    ) -> bool {
        match *self {
            Self::Any => true,
            Self::Warnable { lead } => WarningState::of(expires, lead, record, now).can_warn(),
            Self::Actionable { lead } => WarningState::of(expires, lead, record, now).is_actionable(),
        }
    }
}

/// Candidate selection for one phase.
///
/// Repositories may translate it to a coarser native filter; [`matches`]
/// is the exact definition and the engine re-applies it to every candidate.
///
/// [`matches`]: AccountQuery::matches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountQuery {
    pub include_reserved: bool,
    pub status: Option<AccountStatus>,
    pub inactive_for: Option<Duration>,
    pub accessed_within: Option<Duration>,
    pub admin_notified: Option<bool>,
    pub user_notified: Option<bool>,
    pub protected: Option<bool>,
    pub block_warning: WarningFilter,
    pub delete_warning: WarningFilter,
}

impl AccountQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn inactive_for(mut self, duration: Duration) -> Self {
        self.inactive_for = Some(duration);
        self
    }

    pub fn accessed_within(mut self, window: Duration) -> Self {
        self.accessed_within = Some(window);
        self
    }

    pub fn admin_notified(mut self, v: bool) -> Self {
        self.admin_notified = Some(v);
        self
    }

    pub fn user_notified(mut self, v: bool) -> Self {
        self.user_notified = Some(v);
        self
    }

    pub fn protected(mut self, v: bool) -> Self {
        self.protected = Some(v);
        self
    }

    pub fn block_warning(mut self, filter: WarningFilter) -> Self {
        self.block_warning = filter;
        self
    }

    pub fn delete_warning(mut self, filter: WarningFilter) -> Self {
        self.delete_warning = filter;
        self
    }

    pub fn matches(&self, record: &AccountActivityRecord, now: DateTime<Utc>) -> bool {
        if !self.include_reserved && record.id.is_reserved() {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self.inactive_for.is_some_and(|d| !inactive_since(record, d, now)) {
            return false;
        }
        if self.accessed_within.is_some_and(|w| !accessed_within(record, w, now)) {
            return false;
        }
        if self.admin_notified.is_some_and(|v| v != record.admin_notified) {
            return false;
        }
        if self.user_notified.is_some_and(|v| v != record.user_notified) {
            return false;
        }
        if self.protected.is_some_and(|v| v != record.protected) {
            return false;
        }
        self.block_warning.accepts(record.block_warned_at, record, now)
            && self.delete_warning.accepts(record.delete_warned_at, record, now)
    }
}
