//! The seven lifecycle phases.
//!
//! Every phase follows the same shape: query candidates, re-check them
//! against the exact predicate, decide, write back in one batch, deliver.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;

use crate::account::{AccountActivityRecord, AccountId, AccountStatus, AccountUpdate};
use crate::constants::REACTIVATION_WINDOW_DAYS;
use crate::notify::{deliver, ComposedMessage, MailKind};
use crate::predicate::{AccountQuery, WarningFilter};
use crate::LifecycleResult;

use super::report::{AdminReport, PhaseReport};
use super::{LifecycleEngine, Phase};

/// Decisions of one phase, applied in one batch before any delivery.
struct PhasePlan {
    report: PhaseReport,
    updates: BTreeMap<AccountId, AccountUpdate>,
    personal: Vec<(String, ComposedMessage)>,
    admin: Option<AdminReport>,
}

impl PhasePlan {
    fn new(phase: Phase, candidates: usize) -> Self {
        let mut report = PhaseReport::new(phase);
        report.candidates = candidates;
        Self {
            report,
            updates: BTreeMap::new(),
            personal: Vec::new(),
            admin: None,
        }
    }

    fn update(&mut self, id: AccountId, update: AccountUpdate) {
        self.updates.entry(id).or_default().merge(update);
    }

    fn message(&mut self, record: &AccountActivityRecord, message: ComposedMessage) {
        self.personal.push((record.mail.clone(), message));
    }
}

fn audit(phase: Phase, id: AccountId, action: &'static str) {
    tracing::info!(
        target: "inactive_user::audit",
        account_id = id.0,
        phase = phase.as_str(),
        action = action,
        "Account transition"
    );
}

fn expiry(now: DateTime<Utc>, lead: Duration) -> DateTime<Utc> {
    now.checked_add_signed(lead).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Warn steps fire once the account has been idle for `after - lead`.
fn warn_threshold(after: Duration, lead: Duration) -> Duration {
    (after - lead).max(Duration::zero())
}

impl LifecycleEngine<'_> {
    /// Repository candidates narrowed to exact matches, order preserved.
    fn candidates(
        &self,
        phase: Phase,
        query: &AccountQuery,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Vec<AccountActivityRecord>> {
        let fetched = self.deps.accounts.query(query, now)?;
        let fetched_len = fetched.len();
        let matched: Vec<AccountActivityRecord> = fetched
            .into_par_iter()
            .filter(|record| query.matches(record, now))
            .collect();
        tracing::debug!(
            phase = phase.as_str(),
            fetched = fetched_len,
            matched = matched.len(),
            "Phase candidates"
        );
        Ok(matched)
    }

    /// Write back, then deliver. Delivery failures never undo the write.
    fn apply(&self, mut plan: PhasePlan) -> LifecycleResult<PhaseReport> {
        if !plan.updates.is_empty() {
            let written = self.deps.accounts.batch_update(&plan.updates)?;
            tracing::debug!(
                phase = plan.report.phase.as_str(),
                written = written,
                "Phase write-back applied"
            );
        }

        for (recipient, message) in &plan.personal {
            let tally = deliver(self.deps.notifier, [recipient.as_str()], message);
            plan.report.add_delivery(tally);
        }

        if let Some(message) = plan.admin.as_ref().and_then(|r| r.compose(&self.composer)) {
            let recipients = self.thresholds.admin_recipients.iter().map(String::as_str);
            let tally = deliver(self.deps.notifier, recipients, &message);
            plan.report.add_delivery(tally);
        }

        Ok(plan.report)
    }

    /// `None` = checker failed; the account is left alone this cycle.
    fn owns_content(&self, phase: Phase, id: AccountId) -> Option<bool> {
        match self.deps.ownership.owns_content(id) {
            Ok(owns) => Some(owns),
            Err(e) => {
                tracing::error!(
                    target: "inactive_user::audit",
                    account_id = id.0,
                    phase = phase.as_str(),
                    error = %e,
                    "Ownership check failed, account skipped this cycle"
                );
                None
            }
        }
    }

    // ── Phase 0 ──

    pub(super) fn reset_admin_notifications(&self, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        let phase = Phase::AdminReset;
        let query = AccountQuery::new()
            .admin_notified(true)
            .accessed_within(Duration::days(REACTIVATION_WINDOW_DAYS));
        let accounts = self.candidates(phase, &query, now)?;

        let mut plan = PhasePlan::new(phase, accounts.len());
        for record in &accounts {
            plan.update(record.id, AccountUpdate::default().admin_notified(None));
            plan.report.transitions += 1;
            audit(phase, record.id, "reset");
        }
        self.apply(plan)
    }

    // ── Phase 1 ──

    pub(super) fn notify_admins(&self, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        let phase = Phase::AdminNotify;
        let Some(after) = self.thresholds.notify_admin_after() else {
            return Ok(PhaseReport::disabled(phase));
        };
        let query = AccountQuery::new().inactive_for(after).admin_notified(false);
        let accounts = self.candidates(phase, &query, now)?;

        let mut plan = PhasePlan::new(phase, accounts.len());
        let mut report = AdminReport::new(MailKind::NotifyAdmin, after);
        for record in &accounts {
            plan.update(record.id, AccountUpdate::default().admin_notified(Some(now)));
            report.push(record);
            plan.report.transitions += 1;
            audit(phase, record.id, "notify");
        }
        plan.admin = Some(report);
        self.apply(plan)
    }

    // ── Phase 2 ──

    pub(super) fn notify_users(&self, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        let phase = Phase::UserNotify;
        let Some(after) = self.thresholds.notify_user_after() else {
            return Ok(PhaseReport::disabled(phase));
        };
        let query = AccountQuery::new().inactive_for(after).user_notified(false);
        let accounts = self.candidates(phase, &query, now)?;

        let mut plan = PhasePlan::new(phase, accounts.len());
        for record in &accounts {
            plan.update(record.id, AccountUpdate::default().user_notified(true));
            let message = self.composer.for_account(MailKind::Notify, record, after);
            plan.message(record, message);
            plan.report.transitions += 1;
            audit(phase, record.id, "notify");
        }
        self.apply(plan)
    }

    // ── Phase 3 ──

    pub(super) fn warn_block(&self, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        let phase = Phase::BlockWarn;
        let (Some(after), Some(lead)) = (self.thresholds.block_after(), self.thresholds.block_warn_lead()) else {
            return Ok(PhaseReport::disabled(phase));
        };
        let query = AccountQuery::new()
            .status(AccountStatus::Active)
            .inactive_for(warn_threshold(after, lead))
            .block_warning(WarningFilter::Warnable { lead: Some(lead) });
        let accounts = self.candidates(phase, &query, now)?;

        let expires = expiry(now, lead);
        let mut plan = PhasePlan::new(phase, accounts.len());
        for record in &accounts {
            plan.update(record.id, AccountUpdate::default().block_warned_at(Some(expires)));
            let message = self.composer.for_account(MailKind::BlockWarn, record, lead);
            plan.message(record, message);
            plan.report.transitions += 1;
            audit(phase, record.id, "warn");
        }
        self.apply(plan)
    }

    // ── Phase 4 ──

    pub(super) fn block(&self, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        let phase = Phase::Block;
        let Some(after) = self.thresholds.block_after() else {
            return Ok(PhaseReport::disabled(phase));
        };
        let lead = self.thresholds.block_warn_lead();
        let query = AccountQuery::new()
            .status(AccountStatus::Active)
            .inactive_for(after)
            .block_warning(WarningFilter::Actionable { lead });
        let accounts = self.candidates(phase, &query, now)?;

        let mut plan = PhasePlan::new(phase, accounts.len());
        let mut report = AdminReport::new(MailKind::BlockNotifyAdmin, after);
        for record in &accounts {
            plan.update(
                record.id,
                AccountUpdate::default()
                    .status(AccountStatus::Blocked)
                    .block_warned_at(None),
            );
            if self.thresholds.notify_on_block {
                let message = self.composer.for_account(MailKind::BlockNotify, record, after);
                plan.message(record, message);
                plan.update(record.id, AccountUpdate::default().user_block_notified(true));
            }
            if self.thresholds.notify_admin_on_block && !record.admin_block_notified {
                report.push(record);
                plan.update(record.id, AccountUpdate::default().admin_block_notified(true));
            }
            plan.report.transitions += 1;
            audit(phase, record.id, "block");
        }
        plan.admin = Some(report);
        self.apply(plan)
    }

    // ── Phase 5 ──

    pub(super) fn warn_delete(&self, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        let phase = Phase::DeleteWarn;
        let (Some(after), Some(lead)) = (self.thresholds.delete_after(), self.thresholds.delete_warn_lead()) else {
            return Ok(PhaseReport::disabled(phase));
        };
        let query = AccountQuery::new()
            .inactive_for(warn_threshold(after, lead))
            .protected(false)
            .delete_warning(WarningFilter::Warnable { lead: Some(lead) });
        let accounts = self.candidates(phase, &query, now)?;

        let expires = expiry(now, lead);
        let mut plan = PhasePlan::new(phase, accounts.len());
        for record in &accounts {
            let protect = if self.thresholds.preserve_content_owners {
                match self.owns_content(phase, record.id) {
                    Some(owns) => owns,
                    None => {
                        plan.report.failures += 1;
                        continue;
                    }
                }
            } else {
                false
            };

            // Expiry recorded for protected accounts too
            plan.update(record.id, AccountUpdate::default().delete_warned_at(Some(expires)));
            if protect {
                plan.update(record.id, AccountUpdate::default().protected(true));
                audit(phase, record.id, "protect");
            } else {
                let message = self.composer.for_account(MailKind::DeleteWarn, record, lead);
                plan.message(record, message);
                audit(phase, record.id, "warn");
            }
            plan.report.transitions += 1;
        }
        self.apply(plan)
    }

    // ── Phase 6 ──

    pub(super) fn delete(&self, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        let phase = Phase::Delete;
        let Some(after) = self.thresholds.delete_after() else {
            return Ok(PhaseReport::disabled(phase));
        };
        let lead = self.thresholds.delete_warn_lead();
        let query = AccountQuery::new()
            .inactive_for(after)
            .protected(false)
            .delete_warning(WarningFilter::Actionable { lead });
        let accounts = self.candidates(phase, &query, now)?;

        let mut plan = PhasePlan::new(phase, accounts.len());
        let mut erasable = Vec::new();
        for record in &accounts {
            if self.thresholds.preserve_content_owners {
                match self.owns_content(phase, record.id) {
                    Some(true) => {
                        plan.update(record.id, AccountUpdate::default().protected(true));
                        plan.report.transitions += 1;
                        audit(phase, record.id, "protect");
                        continue;
                    }
                    Some(false) => {}
                    None => {
                        plan.report.failures += 1;
                        continue;
                    }
                }
            }
            erasable.push(record);
        }

        // Protection flags land before anything is erased
        if !plan.updates.is_empty() {
            self.deps.accounts.batch_update(&plan.updates)?;
            plan.updates.clear();
        }

        let mut report = AdminReport::new(MailKind::DeleteNotifyAdmin, after);
        for record in erasable {
            if let Err(e) = self.deps.eraser.erase(record.id) {
                tracing::error!(
                    target: "inactive_user::audit",
                    account_id = record.id.0,
                    phase = phase.as_str(),
                    error = %e,
                    "Account erase failed, retried next cycle"
                );
                plan.report.failures += 1;
                continue;
            }
            plan.report.transitions += 1;
            audit(phase, record.id, "delete");

            if self.thresholds.notify_on_delete {
                let message = self.composer.for_account(MailKind::DeleteNotify, record, after);
                plan.message(record, message);
            }
            if self.thresholds.notify_admin_on_delete {
                report.push(record);
            }
        }
        plan.admin = Some(report);
        self.apply(plan)
    }
}
