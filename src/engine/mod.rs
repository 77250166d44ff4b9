//! Lifecycle engine: run gate, then the seven phases in fixed order.
//!
//! Each phase queries its own candidates, decides per account, writes every
//! decision in one batch, and only then delivers messages. Later phases read
//! flags earlier phases wrote, so a failed write-back stops the cycle.

pub mod phases;
pub mod report;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{LifecycleConfig, ThresholdConfig};
use crate::notify::{Composer, Notifier};
use crate::repository::{AccountEraser, AccountRepository, ContentOwnershipChecker, RunStateStore};
use crate::run_gate::{GateDecision, RunGate};
use crate::storage::SqliteStore;
use crate::{LifecycleError, LifecycleResult};

pub use report::{AdminReport, CycleOutcome, CycleReport, PhaseReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AdminReset,
    AdminNotify,
    UserNotify,
    BlockWarn,
    Block,
    DeleteWarn,
    Delete,
}

impl Phase {
    /// Execution order. Never reorder.
    pub const ALL: [Phase; 7] = [
        Phase::AdminReset,
        Phase::AdminNotify,
        Phase::UserNotify,
        Phase::BlockWarn,
        Phase::Block,
        Phase::DeleteWarn,
        Phase::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminReset => "admin_reset",
            Self::AdminNotify => "admin_notify",
            Self::UserNotify => "user_notify",
            Self::BlockWarn => "block_warn",
            Self::Block => "block",
            Self::DeleteWarn => "delete_warn",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine reads from or writes to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub accounts: &'a dyn AccountRepository,
    pub ownership: &'a dyn ContentOwnershipChecker,
    pub eraser: &'a dyn AccountEraser,
    pub run_state: &'a dyn RunStateStore,
    pub notifier: &'a dyn Notifier,
}

impl<'a> Collaborators<'a> {
    /// One SQLite store backing every storage role.
    pub fn sqlite(store: &'a SqliteStore<'_>, notifier: &'a dyn Notifier) -> Self {
        Self {
            accounts: store,
            ownership: store,
            eraser: store,
            run_state: store,
            notifier,
        }
    }
}

pub struct LifecycleEngine<'a> {
    thresholds: &'a ThresholdConfig,
    composer: Composer<'a>,
    gate: RunGate,
    deps: Collaborators<'a>,
}

impl<'a> LifecycleEngine<'a> {
    pub fn new(config: &'a LifecycleConfig, deps: Collaborators<'a>) -> Self {
        Self {
            thresholds: &config.thresholds,
            composer: Composer::new(&config.mail),
            gate: RunGate::from_config(&config.scheduler),
            deps,
        }
    }

    pub fn with_gate(mut self, gate: RunGate) -> Self {
        self.gate = gate;
        self
    }

    /// Run one cycle at `now`. Returns `Skipped` when the run gate is closed.
    ///
    /// Errors: invalid thresholds (`Config`, nothing ran, run state untouched),
    /// the run state could not be read or written (nothing ran), or a phase
    /// failed against the repository (`PhaseAborted`; phases before it stay
    /// applied, phases after it did not run).
    pub fn run_cycle(&self, now: DateTime<Utc>, force: bool) -> LifecycleResult<CycleOutcome> {
        self.thresholds.validate().inspect_err(|e| {
            tracing::error!(error = %e, "Invalid thresholds, cycle not started");
        })?;

        let decision = self
            .gate
            .try_acquire(self.deps.run_state, now, force)
            .inspect_err(|e| {
                tracing::error!(error = %e, "Run state unavailable, cycle not started");
            })?;

        if let GateDecision::Skipped {
            last_run_at,
            next_due_at,
        } = decision
        {
            return Ok(CycleOutcome::Skipped {
                last_run_at,
                next_due_at,
            });
        }

        tracing::info!(now = %now, forced = force, "Lifecycle cycle started");
        let mut report = CycleReport::new(now, force);

        for phase in Phase::ALL {
            match self.run_phase(phase, now) {
                Ok(phase_report) => report.phases.push(phase_report),
                Err(e) => {
                    tracing::error!(
                        target: "inactive_user::audit",
                        phase = phase.as_str(),
                        error = %e,
                        "Phase aborted, remaining phases skipped"
                    );
                    return Err(LifecycleError::PhaseAborted {
                        phase,
                        source: Box::new(e),
                    });
                }
            }
        }

        tracing::info!(
            transitions = report.transitions(),
            messages_sent = report.messages_sent(),
            messages_failed = report.messages_failed(),
            failures = report.failures(),
            "Lifecycle cycle complete"
        );
        Ok(CycleOutcome::Completed(report))
    }

    fn run_phase(&self, phase: Phase, now: DateTime<Utc>) -> LifecycleResult<PhaseReport> {
        match phase {
            Phase::AdminReset => self.reset_admin_notifications(now),
            Phase::AdminNotify => self.notify_admins(now),
            Phase::UserNotify => self.notify_users(now),
            Phase::BlockWarn => self.warn_block(now),
            Phase::Block => self.block(now),
            Phase::DeleteWarn => self.warn_delete(now),
            Phase::Delete => self.delete(now),
        }
    }
}
