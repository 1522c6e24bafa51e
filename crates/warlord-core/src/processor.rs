//! Turn processor contract and run budget accounting.
//!
//! A [`TurnProcessor`] advances world state toward a target time. It may
//! stop early when its [`RunBudget`] runs out, in which case it hands back a
//! checkpoint; calling it again with that checkpoint continues exactly
//! where it stopped.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDateTime;
use warlord_types::{Checkpoint, RunBudget, TurnRunResult};

use crate::executor::ExecutorError;
use crate::grid::GridError;

/// Errors that can occur during a turn run.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The tick grid could not be resolved.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// A single turn failed to execute.
    #[error("executor error: {source}")]
    Executor {
        /// The underlying executor error.
        #[from]
        source: ExecutorError,
    },

    /// World state cannot be advanced any further.
    #[error("world state cannot advance: {message}")]
    Exhausted {
        /// Description of the limit that was hit.
        message: String,
    },

    /// Any other processor failure.
    #[error("processor error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

/// Advances world state toward a target time.
///
/// Requirements on implementations:
///
/// - **Resumable**: re-invoking with the checkpoint of a truncated result
///   (and the same target) continues where the last run stopped, never
///   repeating or skipping a unit of work.
/// - **Deterministic**: identical world state, checkpoint, target and budget
///   give identical results.
pub trait TurnProcessor: Send {
    /// Advance toward `target` within `budget`.
    fn run(
        &mut self,
        target: NaiveDateTime,
        budget: &RunBudget,
        checkpoint: Option<&Checkpoint>,
    ) -> impl Future<Output = Result<TurnRunResult, ProcessorError>> + Send;
}

/// Tracks work done against a [`RunBudget`].
///
/// The first unit of a run is always allowed, so a run makes progress even
/// under a degenerate budget.
#[derive(Debug, Clone, Copy)]
pub struct BudgetMeter {
    budget: RunBudget,
    started: tokio::time::Instant,
    units: u32,
}

impl BudgetMeter {
    /// Start metering now.
    pub fn start(budget: RunBudget) -> Self {
        Self {
            budget,
            started: tokio::time::Instant::now(),
            units: 0,
        }
    }

    /// Count one executed unit.
    pub const fn record_unit(&mut self) {
        self.units = self.units.saturating_add(1);
    }

    /// Units recorded so far.
    pub const fn units(&self) -> u32 {
        self.units
    }

    /// Time since metering started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether another unit would exceed the budget.
    pub fn is_exhausted(&self) -> bool {
        if self.units == 0 {
            return false;
        }
        let units_spent = self
            .budget
            .max_units
            .is_some_and(|max| self.units >= max);
        let time_spent = self
            .budget
            .max_duration
            .is_some_and(|max| self.elapsed() >= max);
        units_spent || time_spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_budget_exhausts_at_limit() {
        let mut meter = BudgetMeter::start(RunBudget::units(2));
        assert!(!meter.is_exhausted());
        meter.record_unit();
        assert!(!meter.is_exhausted());
        meter.record_unit();
        assert!(meter.is_exhausted());
        assert_eq!(meter.units(), 2);
    }

    #[test]
    fn first_unit_always_allowed() {
        let meter = BudgetMeter::start(RunBudget::units(0));
        assert!(!meter.is_exhausted());
    }

    #[test]
    fn unbounded_never_exhausts() {
        let mut meter = BudgetMeter::start(RunBudget::unbounded());
        for _ in 0..1000 {
            meter.record_unit();
        }
        assert!(!meter.is_exhausted());
    }

    #[tokio::test(start_paused = true)]
    async fn duration_budget_exhausts_after_elapsed() {
        let budget = RunBudget::unbounded().with_max_duration(Duration::from_millis(500));
        let mut meter = BudgetMeter::start(budget);
        meter.record_unit();
        assert!(!meter.is_exhausted());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(meter.is_exhausted());
    }
}
