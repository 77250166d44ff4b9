//! Minimum spacing between lifecycle cycles.
//!
//! The last-run instant is written before any phase runs. A crash mid-cycle
//! therefore skips the rest of that cycle instead of repeating it early.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::SchedulerConfig;
use crate::repository::RunStateStore;
use crate::LifecycleResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Run recorded; the cycle may start.
    Proceed,
    Skipped {
        last_run_at: DateTime<Utc>,
        next_due_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct RunGate {
    min_interval: Duration,
    skew_tolerance: Duration,
}

impl RunGate {
    pub fn new(min_interval: Duration, skew_tolerance: Duration) -> Self {
        Self {
            min_interval,
            skew_tolerance,
        }
    }

    pub fn from_config(cfg: &SchedulerConfig) -> Self {
        let secs = |s: u64| {
            i64::try_from(s)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX)
        };
        Self::new(secs(cfg.min_interval_secs), secs(cfg.skew_tolerance_secs))
    }

    /// Earliest instant a cycle after `last_run_at` is accepted.
    pub fn next_due(&self, last_run_at: DateTime<Utc>) -> DateTime<Utc> {
        let spacing = self.min_interval - self.skew_tolerance;
        if spacing <= Duration::zero() {
            return last_run_at;
        }
        last_run_at.checked_add_signed(spacing).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Decide whether a cycle may run at `now`, and record it if so.
    ///
    /// An unreadable or unwritable run state is an error: the caller must
    /// not start the cycle. `force` bypasses the interval but still records.
    pub fn try_acquire(
        &self,
        store: &dyn RunStateStore,
        now: DateTime<Utc>,
        force: bool,
    ) -> LifecycleResult<GateDecision> {
        let last = store.last_run_at()?;

        if let Some(last_run_at) = last {
            let next_due_at = self.next_due(last_run_at);
            if !force && now < next_due_at {
                tracing::debug!(
                    last_run_at = %last_run_at,
                    next_due_at = %next_due_at,
                    "Run gate closed, skipping cycle"
                );
                return Ok(GateDecision::Skipped {
                    last_run_at,
                    next_due_at,
                });
            }
        }

        store.record_run(now)?;
        if force {
            tracing::info!(now = %now, "Forced cycle, interval check bypassed");
        }
        Ok(GateDecision::Proceed)
    }
}

impl Default for RunGate {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::LifecycleError;

    #[test]
    fn test_first_run_proceeds_and_records() {
        let store = MemoryRunState::default();
        let now = fixed_now();
        let gate = RunGate::default();
        assert_eq!(gate.try_acquire(&store, now, false).unwrap(), GateDecision::Proceed);
        assert_eq!(store.last_run_at().unwrap(), Some(now));
    }

    #[test]
    fn test_second_run_inside_interval_is_skipped() {
        let store = MemoryRunState::default();
        let now = fixed_now();
        let gate = RunGate::default();
        gate.try_acquire(&store, now, false).unwrap();

        let later = now + Duration::hours(2);
        match gate.try_acquire(&store, later, false).unwrap() {
            GateDecision::Skipped { last_run_at, next_due_at } => {
                assert_eq!(last_run_at, now);
                assert_eq!(next_due_at, now + Duration::seconds(86_400 - 300));
            }
            other => panic!("expected skip, got {:?}", other),
        }
        // Skipped cycles leave the state untouched
        assert_eq!(store.last_run_at().unwrap(), Some(now));
    }

    #[test]
    fn test_skew_tolerance_accepts_early_trigger() {
        let store = MemoryRunState::default();
        let now = fixed_now();
        let gate = RunGate::default();
        gate.try_acquire(&store, now, false).unwrap();
        let early = now + Duration::days(1) - Duration::minutes(2);
        assert_eq!(gate.try_acquire(&store, early, false).unwrap(), GateDecision::Proceed);
    }

    #[test]
    fn test_force_bypasses_interval_and_records() {
        let store = MemoryRunState::default();
        let now = fixed_now();
        let gate = RunGate::default();
        gate.try_acquire(&store, now, false).unwrap();
        let later = now + Duration::minutes(5);
        assert_eq!(gate.try_acquire(&store, later, true).unwrap(), GateDecision::Proceed);
        assert_eq!(store.last_run_at().unwrap(), Some(later));
    }

    #[test]
    fn test_unreadable_state_fails_closed() {
        let store = MemoryRunState::broken();
        let err = RunGate::default().try_acquire(&store, fixed_now(), true).unwrap_err();
        assert!(matches!(err, LifecycleError::RunState(_)));
    }

    #[test]
    fn test_from_config() {
        let cfg = SchedulerConfig {
            min_interval_secs: 3_600,
            skew_tolerance_secs: 60,
            ..Default::default()
        };
        let gate = RunGate::from_config(&cfg);
        let now = fixed_now();
        assert_eq!(gate.next_due(now), now + Duration::seconds(3_540));
    }
}
