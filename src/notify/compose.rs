//! Message composition: placeholder substitution over configured or
//! default templates.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::Duration;
use regex::{Captures, Regex};

use crate::account::AccountActivityRecord;
use crate::config::MailConfig;
use crate::time_utils::{format_date, format_interval};

use super::templates::MailKind;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"%(username|useremail|lastaccess|period|sitename|siteurl|userlist)")
            .expect("placeholder pattern is valid")
    })
}

/// Replace `%name` placeholders present in `vars`; others stay verbatim.
pub fn substitute(template: &str, vars: &HashMap<&str, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Subject and body ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub kind: MailKind,
    pub subject: String,
    pub body: String,
}

pub struct Composer<'a> {
    mail: &'a MailConfig,
}

impl<'a> Composer<'a> {
    pub fn new(mail: &'a MailConfig) -> Self {
        Self { mail }
    }

    fn template(&self, kind: MailKind) -> &str {
        self.mail
            .override_for(kind)
            .unwrap_or_else(|| kind.default_body())
    }

    fn site_vars(&self, period: Duration) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        vars.insert("sitename", self.mail.site_name.clone());
        vars.insert("siteurl", self.mail.site_url.clone());
        vars.insert("period", format_interval(period));
        vars
    }

    fn finish(&self, kind: MailKind, vars: &HashMap<&str, String>) -> ComposedMessage {
        ComposedMessage {
            kind,
            subject: substitute(kind.default_subject(), vars),
            body: substitute(self.template(kind), vars),
        }
    }

    /// Personal message to one account holder.
    pub fn for_account(
        &self,
        kind: MailKind,
        record: &AccountActivityRecord,
        period: Duration,
    ) -> ComposedMessage {
        let mut vars = self.site_vars(period);
        vars.insert("username", record.name.clone());
        vars.insert("useremail", record.mail.clone());
        vars.insert("lastaccess", last_access_label(record));
        self.finish(kind, &vars)
    }

    /// Aggregate report for administrators.
    pub fn for_admins(&self, kind: MailKind, user_list: &str, period: Duration) -> ComposedMessage {
        let mut vars = self.site_vars(period);
        vars.insert("userlist", user_list.to_string());
        self.finish(kind, &vars)
    }
}

pub fn last_access_label(record: &AccountActivityRecord) -> String {
    record
        .last_access_at
        .map(|at| format_date(&at))
        .unwrap_or_else(|| "never".to_string())
}

/// One line of an aggregate admin report.
pub fn report_line(record: &AccountActivityRecord) -> String {
    format!(
        "{} ({}) last active on {}.",
        record.name,
        record.mail,
        last_access_label(record)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use chrono::Utc;

    fn mail() -> MailConfig {
        MailConfig {
            site_name: "Example".into(),
            site_url: "https://example.com".into(),
            ..Default::default()
        }
    }

    fn record() -> AccountActivityRecord {
        let mut r = AccountActivityRecord::new(AccountId(9), "alice", "alice@example.com", Utc::now());
        r.last_access_at = Some(crate::time_utils::from_sqlite("2025-01-02T03:04:00Z").unwrap());
        r
    }

    #[test]
    fn test_substitute_leaves_unknown_tokens() {
        let mut vars = HashMap::new();
        vars.insert("username", "bob".to_string());
        assert_eq!(
            substitute("Hi %username, see %siteurl and 100%", &vars),
            "Hi bob, see %siteurl and 100%"
        );
    }

    #[test]
    fn test_for_account_fills_personal_fields() {
        let cfg = mail();
        let msg = Composer::new(&cfg).for_account(MailKind::BlockWarn, &record(), Duration::days(7));
        assert_eq!(msg.subject, "[Example] Account inactivity");
        assert!(msg.body.starts_with("Hello alice,"));
        assert!(msg.body.contains("since 2025-01-02 03:04 UTC"));
        assert!(msg.body.contains("disabled in 1 week"));
        assert!(msg.body.contains("https://example.com"));
    }

    #[test]
    fn test_never_accessed_renders_never() {
        let cfg = mail();
        let mut r = record();
        r.last_access_at = None;
        let msg = Composer::new(&cfg).for_account(MailKind::Notify, &r, Duration::days(180));
        assert!(msg.body.contains("since never"));
    }

    #[test]
    fn test_override_template_is_used() {
        let cfg = MailConfig {
            notify_text: Some("%username <%useremail> idle for %period".into()),
            ..mail()
        };
        let msg = Composer::new(&cfg).for_account(MailKind::Notify, &record(), Duration::days(14));
        assert_eq!(msg.body, "alice <alice@example.com> idle for 2 weeks");
    }

    #[test]
    fn test_for_admins_includes_user_list() {
        let cfg = mail();
        let list = format!("{}\n", report_line(&record()));
        let msg = Composer::new(&cfg).for_admins(MailKind::DeleteNotifyAdmin, &list, Duration::days(365));
        assert_eq!(msg.subject, "[Example] Deleted accounts");
        assert!(msg.body.contains("more than 1 year"));
        assert!(msg
            .body
            .contains("alice (alice@example.com) last active on 2025-01-02 03:04 UTC."));
    }
}
