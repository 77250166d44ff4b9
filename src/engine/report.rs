//! Phase accumulators and the per-cycle summary.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::account::AccountActivityRecord;
use crate::notify::compose::report_line;
use crate::notify::{ComposedMessage, Composer, DeliveryTally, MailKind};

use super::Phase;

/// Ordered lines for one aggregate admin message, flushed once per phase.
#[derive(Debug, Clone)]
pub struct AdminReport {
    kind: MailKind,
    period: Duration,
    lines: Vec<String>,
}

impl AdminReport {
    pub fn new(kind: MailKind, period: Duration) -> Self {
        Self {
            kind,
            period,
            lines: Vec::new(),
        }
    }

    pub fn push(&mut self, record: &AccountActivityRecord) {
        self.lines.push(report_line(record));
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// `None` when nothing was accumulated.
    pub fn compose(&self, composer: &Composer) -> Option<ComposedMessage> {
        if self.lines.is_empty() {
            return None;
        }
        Some(composer.for_admins(self.kind, &self.lines.join("\n"), self.period))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    /// False when the thresholds leave this phase unconfigured.
    pub enabled: bool,
    pub candidates: usize,
    pub transitions: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
    /// Accounts skipped after an ownership or eraser error.
    pub failures: usize,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            enabled: true,
            candidates: 0,
            transitions: 0,
            messages_sent: 0,
            messages_failed: 0,
            failures: 0,
        }
    }

    pub fn disabled(phase: Phase) -> Self {
        Self {
            enabled: false,
            ..Self::new(phase)
        }
    }

    pub fn add_delivery(&mut self, tally: DeliveryTally) {
        self.messages_sent += tally.sent;
        self.messages_failed += tally.failed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub forced: bool,
    pub phases: Vec<PhaseReport>,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>, forced: bool) -> Self {
        Self {
            started_at,
            forced,
            phases: Vec::with_capacity(Phase::ALL.len()),
        }
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn transitions(&self) -> usize {
        self.phases.iter().map(|p| p.transitions).sum()
    }

    pub fn messages_sent(&self) -> usize {
        self.phases.iter().map(|p| p.messages_sent).sum()
    }

    pub fn messages_failed(&self) -> usize {
        self.phases.iter().map(|p| p.messages_failed).sum()
    }

    pub fn failures(&self) -> usize {
        self.phases.iter().map(|p| p.failures).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Run gate closed; nothing was read or written.
    Skipped {
        last_run_at: DateTime<Utc>,
        next_due_at: DateTime<Utc>,
    },
    Completed(CycleReport),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;
    use crate::test_helpers::*;

    #[test]
    fn test_admin_report_empty_composes_nothing() {
        let mail = MailConfig::default();
        let report = AdminReport::new(MailKind::NotifyAdmin, Duration::days(30));
        assert!(report.compose(&Composer::new(&mail)).is_none());
    }

    #[test]
    fn test_admin_report_lines_in_push_order() {
        let now = fixed_now();
        let mail = MailConfig::default();
        let mut report = AdminReport::new(MailKind::BlockNotifyAdmin, Duration::days(30));
        report.push(&AccountBuilder::new(3).name("carol").build());
        report.push(&AccountBuilder::new(2).name("bob").logged_in_days_ago(now, 40).build());
        assert_eq!(report.len(), 2);

        let msg = report.compose(&Composer::new(&mail)).unwrap();
        let carol = msg.body.find("carol (carol@example.com) last active on never.").unwrap();
        let bob = msg.body.find("bob (bob@example.com)").unwrap();
        assert!(carol < bob);
    }

    #[test]
    fn test_cycle_totals() {
        let mut report = CycleReport::new(fixed_now(), false);
        let mut a = PhaseReport::new(Phase::AdminNotify);
        a.transitions = 2;
        a.add_delivery(DeliveryTally { sent: 1, failed: 1 });
        let mut b = PhaseReport::new(Phase::UserNotify);
        b.transitions = 3;
        b.add_delivery(DeliveryTally { sent: 3, failed: 0 });
        report.phases.push(a);
        report.phases.push(b);
        assert_eq!(report.transitions(), 5);
        assert_eq!(report.messages_sent(), 4);
        assert_eq!(report.messages_failed(), 1);
        assert!(report.phase(Phase::Delete).is_none());
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let now = fixed_now();
        let skipped = CycleOutcome::Skipped {
            last_run_at: now,
            next_due_at: now,
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["outcome"], "skipped");
        let done = CycleOutcome::Completed(CycleReport::new(now, true));
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["forced"], true);
    }
}
