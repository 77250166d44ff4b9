use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ANONYMOUS_ACCOUNT_ID, PRIMORDIAL_ADMIN_ID};

/// Stable account identifier. Never reused after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl AccountId {
    /// Anonymous and primordial admin accounts sit outside the lifecycle.
    pub fn is_reserved(&self) -> bool {
        self.0 == ANONYMOUS_ACCOUNT_ID || self.0 == PRIMORDIAL_ADMIN_ID
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Blocked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "blocked" => Ok(Self::Blocked),
            _ => Err(format!("Unknown account status: {}", s)),
        }
    }
}

/// Lifecycle view of one account, as stored by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountActivityRecord {
    pub id: AccountId,
    pub name: String,
    pub mail: String,
    pub created_at: DateTime<Utc>,
    /// `None` = never logged in.
    pub last_login_at: Option<DateTime<Utc>>,
    /// `None` = no recorded activity.
    pub last_access_at: Option<DateTime<Utc>>,
    pub status: AccountStatus,
    /// Owns retained content; never deleted.
    pub protected: bool,
    pub admin_notified: bool,
    pub admin_notified_at: Option<DateTime<Utc>>,
    pub user_notified: bool,
    /// Expiry of the outstanding block warning.
    pub block_warned_at: Option<DateTime<Utc>>,
    pub user_block_notified: bool,
    pub admin_block_notified: bool,
    /// Expiry of the outstanding delete warning.
    pub delete_warned_at: Option<DateTime<Utc>>,
}

impl AccountActivityRecord {
    /// Fresh active account with no lifecycle flags set.
    pub fn new(id: AccountId, name: &str, mail: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.to_string(),
            mail: mail.to_string(),
            created_at,
            last_login_at: None,
            last_access_at: None,
            status: AccountStatus::Active,
            protected: false,
            admin_notified: false,
            admin_notified_at: None,
            user_notified: false,
            block_warned_at: None,
            user_block_notified: false,
            admin_block_notified: false,
            delete_warned_at: None,
        }
    }

    pub fn has_logged_in(&self) -> bool {
        self.last_login_at.is_some()
    }

    /// Instant inactivity is measured from: last access for accounts that
    /// have logged in, creation otherwise.
    pub fn activity_reference(&self) -> Option<DateTime<Utc>> {
        if self.has_logged_in() {
            self.last_access_at
        } else {
            Some(self.created_at)
        }
    }

    /// Apply a field set in place. Mirrors what the repository persists.
    pub fn apply(&mut self, update: &AccountUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(protected) = update.protected {
            self.protected = protected;
        }
        if let Some(admin_notified) = update.admin_notified {
            self.admin_notified = admin_notified;
        }
        if let Some(at) = update.admin_notified_at {
            self.admin_notified_at = at;
        }
        if let Some(user_notified) = update.user_notified {
            self.user_notified = user_notified;
        }
        if let Some(at) = update.block_warned_at {
            self.block_warned_at = at;
        }
        if let Some(v) = update.user_block_notified {
            self.user_block_notified = v;
        }
        if let Some(v) = update.admin_block_notified {
            self.admin_block_notified = v;
        }
        if let Some(at) = update.delete_warned_at {
            self.delete_warned_at = at;
        }
    }
}

/// Field set for a batched update. `None` leaves the column untouched;
/// nullable columns use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub status: Option<AccountStatus>,
    pub protected: Option<bool>,
    pub admin_notified: Option<bool>,
    pub admin_notified_at: Option<Option<DateTime<Utc>>>,
    pub user_notified: Option<bool>,
    pub block_warned_at: Option<Option<DateTime<Utc>>>,
    pub user_block_notified: Option<bool>,
    pub admin_block_notified: Option<bool>,
    pub delete_warned_at: Option<Option<DateTime<Utc>>>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold `other` into `self`; fields set in `other` win.
    pub fn merge(&mut self, other: AccountUpdate) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            status,
            protected,
            admin_notified,
            admin_notified_at,
            user_notified,
            block_warned_at,
            user_block_notified,
            admin_block_notified,
            delete_warned_at
        );
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = Some(protected);
        self
    }

    pub fn admin_notified(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.admin_notified = Some(at.is_some());
        self.admin_notified_at = Some(at);
        self
    }

    pub fn user_notified(mut self, notified: bool) -> Self {
        self.user_notified = Some(notified);
        self
    }

    pub fn block_warned_at(mut self, expires: Option<DateTime<Utc>>) -> Self {
        self.block_warned_at = Some(expires);
        self
    }

    pub fn user_block_notified(mut self, notified: bool) -> Self {
        self.user_block_notified = Some(notified);
        self
    }

    pub fn admin_block_notified(mut self, notified: bool) -> Self {
        self.admin_block_notified = Some(notified);
        self
    }

    pub fn delete_warned_at(mut self, expires: Option<DateTime<Utc>>) -> Self {
        self.delete_warned_at = Some(expires);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_reserved_ids() {
        assert!(AccountId(0).is_reserved());
        assert!(AccountId(1).is_reserved());
        assert!(!AccountId(2).is_reserved());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("blocked".parse::<AccountStatus>().unwrap(), AccountStatus::Blocked);
        assert!("deleted".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_activity_reference_never_logged_in_uses_created() {
        let created = Utc::now() - Duration::days(10);
        let mut rec = AccountActivityRecord::new(AccountId(5), "u", "u@example.com", created);
        rec.last_access_at = Some(Utc::now());
        assert_eq!(rec.activity_reference(), Some(created));
    }

    #[test]
    fn test_apply_clears_nullable_field() {
        let now = Utc::now();
        let mut rec = AccountActivityRecord::new(AccountId(5), "u", "u@example.com", now);
        rec.apply(&AccountUpdate::default().admin_notified(Some(now)));
        assert!(rec.admin_notified);
        rec.apply(&AccountUpdate::default().admin_notified(None));
        assert!(!rec.admin_notified);
        assert!(rec.admin_notified_at.is_none());
    }

    #[test]
    fn test_merge_later_fields_win() {
        let mut a = AccountUpdate::default().status(AccountStatus::Blocked).user_block_notified(true);
        a.merge(AccountUpdate::default().admin_block_notified(true).user_block_notified(false));
        assert_eq!(a.status, Some(AccountStatus::Blocked));
        assert_eq!(a.user_block_notified, Some(false));
        assert_eq!(a.admin_block_notified, Some(true));
    }
}
