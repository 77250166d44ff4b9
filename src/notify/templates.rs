//! Default subjects and bodies for every outbound message.

use serde::{Deserialize, Serialize};

/// Every message the lifecycle can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailKind {
    /// Inactivity notice to the account holder.
    Notify,
    /// Aggregate inactivity report to administrators.
    NotifyAdmin,
    BlockWarn,
    BlockNotify,
    BlockNotifyAdmin,
    DeleteWarn,
    DeleteNotify,
    DeleteNotifyAdmin,
}

impl MailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::NotifyAdmin => "notify_admin",
            Self::BlockWarn => "block_warn",
            Self::BlockNotify => "block_notify",
            Self::BlockNotifyAdmin => "block_notify_admin",
            Self::DeleteWarn => "delete_warn",
            Self::DeleteNotify => "delete_notify",
            Self::DeleteNotifyAdmin => "delete_notify_admin",
        }
    }

    /// Aggregate reports carry `%userlist` and go to administrators.
    pub fn is_admin_report(&self) -> bool {
        matches!(
            self,
            Self::NotifyAdmin | Self::BlockNotifyAdmin | Self::DeleteNotifyAdmin
        )
    }

    pub fn default_subject(&self) -> &'static str {
        match self {
            Self::NotifyAdmin => "[%sitename] Inactive users",
            Self::Notify | Self::BlockWarn | Self::DeleteWarn => "[%sitename] Account inactivity",
            Self::BlockNotify => "[%sitename] Account blocked due to inactivity",
            Self::BlockNotifyAdmin => "[%sitename] Blocked users",
            Self::DeleteNotify => "[%sitename] Account removed",
            Self::DeleteNotifyAdmin => "[%sitename] Deleted accounts",
        }
    }

    pub fn default_body(&self) -> &'static str {
        match self {
            Self::Notify => NOTIFY_TEXT,
            Self::NotifyAdmin => NOTIFY_ADMIN_TEXT,
            Self::BlockWarn => BLOCK_WARN_TEXT,
            Self::BlockNotify => BLOCK_NOTIFY_TEXT,
            Self::BlockNotifyAdmin => BLOCK_NOTIFY_ADMIN_TEXT,
            Self::DeleteWarn => DELETE_WARN_TEXT,
            Self::DeleteNotify => DELETE_NOTIFY_TEXT,
            Self::DeleteNotifyAdmin => DELETE_NOTIFY_ADMIN_TEXT,
        }
    }
}

impl std::fmt::Display for MailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const NOTIFY_TEXT: &str = "Hello %username,

  We haven't seen you at %sitename since %lastaccess, and we miss you! Please come back and visit us soon at %siteurl.

Sincerely,
  %sitename team";

const NOTIFY_ADMIN_TEXT: &str = "Hello,

  This automatic notification is to inform you that the following users haven't been seen on %sitename for more than %period:

%userlist";

const BLOCK_WARN_TEXT: &str = "Hello %username,

  We haven't seen you at %sitename since %lastaccess, and we miss you! This automatic message is to warn you that your account will be disabled in %period unless you come back and visit us before that time.

  Please visit us at %siteurl.

Sincerely,
  %sitename team";

const BLOCK_NOTIFY_TEXT: &str = "Hello %username,

  This automatic message is to notify you that your account on %sitename has been automatically disabled due to no activity for more than %period.

  Please visit us at %siteurl to have your account re-enabled.

Sincerely,
  %sitename team";

const BLOCK_NOTIFY_ADMIN_TEXT: &str = "Hello,

  This automatic notification is to inform you that the following users have been automatically blocked due to inactivity on %sitename for more than %period:

%userlist";

const DELETE_WARN_TEXT: &str = "Hello %username,

  We haven't seen you at %sitename since %lastaccess, and we miss you! This automatic message is to warn you that your account will be completely removed in %period unless you come back and visit us before that time.

  Please visit us at %siteurl.

Sincerely,
  %sitename team";

const DELETE_NOTIFY_TEXT: &str = "Hello %username,

  This automatic message is to notify you that your account on %sitename has been automatically removed due to no activity for more than %period.

  Please visit us at %siteurl if you would like to create a new account.

Sincerely,
  %sitename team";

const DELETE_NOTIFY_ADMIN_TEXT: &str = "Hello,

  This automatic notification is to inform you that the following users have been automatically deleted due to inactivity on %sitename for more than %period:

%userlist";

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MailKind; 8] = [
        MailKind::Notify,
        MailKind::NotifyAdmin,
        MailKind::BlockWarn,
        MailKind::BlockNotify,
        MailKind::BlockNotifyAdmin,
        MailKind::DeleteWarn,
        MailKind::DeleteNotify,
        MailKind::DeleteNotifyAdmin,
    ];

    #[test]
    fn test_admin_reports_carry_userlist() {
        for kind in ALL {
            assert_eq!(
                kind.default_body().contains("%userlist"),
                kind.is_admin_report(),
                "{kind}"
            );
        }
    }

    #[test]
    fn test_personal_messages_address_user() {
        for kind in ALL.iter().filter(|k| !k.is_admin_report()) {
            assert!(kind.default_body().starts_with("Hello %username"), "{kind}");
        }
    }
}
