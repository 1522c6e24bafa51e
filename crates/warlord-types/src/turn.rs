//! Turn run contract types shared by the daemon and the turn processor.
//!
//! The daemon treats a [`Checkpoint`] as an opaque blob: it stores it and
//! hands it back unchanged. Only the processor that produced it knows what
//! it means.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::GeneralId;

/// Number of months in one game year.
pub const MONTHS_PER_YEAR: u8 = 12;

/// In-game calendar date. A world-turn advances it by one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameDate {
    /// Game year.
    pub year: u32,
    /// Game month, `1..=12`.
    pub month: u8,
}

impl GameDate {
    /// Create a date, rejecting months outside `1..=12`.
    pub const fn new(year: u32, month: u8) -> Option<Self> {
        if month == 0 || month > MONTHS_PER_YEAR {
            return None;
        }
        Some(Self { year, month })
    }

    /// The date one month later, wrapping December into January.
    ///
    /// Returns `None` if the year would overflow.
    pub fn next_month(self) -> Option<Self> {
        if self.month >= MONTHS_PER_YEAR {
            let year = self.year.checked_add(1)?;
            Some(Self { year, month: 1 })
        } else {
            let month = self.month.checked_add(1)?;
            Some(Self {
                year: self.year,
                month,
            })
        }
    }
}

impl core::fmt::Display for GameDate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Caps the work one turn processor invocation may perform.
///
/// A unit is one executed general-turn or world-turn. Either bound may be
/// absent; the run stops at whichever bound is hit first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBudget {
    /// Maximum units per run.
    pub max_units: Option<u32>,
    /// Maximum wall-clock time per run.
    pub max_duration: Option<Duration>,
}

impl RunBudget {
    /// A budget with no bounds at all.
    pub const fn unbounded() -> Self {
        Self {
            max_units: None,
            max_duration: None,
        }
    }

    /// A budget bounded only by a unit count.
    pub const fn units(max_units: u32) -> Self {
        Self {
            max_units: Some(max_units),
            max_duration: None,
        }
    }

    /// Add a wall-clock bound.
    #[must_use]
    pub const fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Whether neither bound is set.
    pub const fn is_unbounded(&self) -> bool {
        self.max_units.is_none() && self.max_duration.is_none()
    }
}

/// Opaque resumption token emitted when a run is truncated by its budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(pub serde_json::Value);

impl Checkpoint {
    /// Wrap an arbitrary JSON payload.
    pub const fn new(payload: serde_json::Value) -> Self {
        Self(payload)
    }

    /// Borrow the payload.
    pub const fn payload(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Something that happened during a turn run, published downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A general took its scheduled turn.
    GeneralTurnExecuted {
        /// The general that acted.
        general_id: GeneralId,
        /// The due time of the executed turn.
        turn_time: NaiveDateTime,
    },
    /// The world advanced by one month.
    WorldTurnAdvanced {
        /// The game date after the advance.
        date: GameDate,
        /// The tick boundary the world turn belongs to.
        turn_time: NaiveDateTime,
    },
    /// The run hit its budget before reaching its target.
    RunTruncated {
        /// The target the run was heading for.
        target: NaiveDateTime,
        /// Units executed before the cut.
        units: u32,
    },
}

/// Outcome of one turn processor invocation.
///
/// A checkpoint is present iff the target was not reached. The constructors
/// are the only way to build a value, which keeps that pairing intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRunResult {
    target: NaiveDateTime,
    reached_target: bool,
    last_turn_time: NaiveDateTime,
    checkpoint: Option<Checkpoint>,
    units_executed: u32,
    events: Vec<TurnEvent>,
}

impl TurnRunResult {
    /// A run that reached `target`. Any previous checkpoint is cleared.
    pub const fn completed(
        target: NaiveDateTime,
        last_turn_time: NaiveDateTime,
        units_executed: u32,
        events: Vec<TurnEvent>,
    ) -> Self {
        Self {
            target,
            reached_target: true,
            last_turn_time,
            checkpoint: None,
            units_executed,
            events,
        }
    }

    /// A run cut short by its budget, resumable from `checkpoint`.
    pub const fn truncated(
        target: NaiveDateTime,
        last_turn_time: NaiveDateTime,
        checkpoint: Checkpoint,
        units_executed: u32,
        events: Vec<TurnEvent>,
    ) -> Self {
        Self {
            target,
            reached_target: false,
            last_turn_time,
            checkpoint: Some(checkpoint),
            units_executed,
            events,
        }
    }

    /// The target time the run was asked to reach.
    pub const fn target(&self) -> NaiveDateTime {
        self.target
    }

    /// Whether the run reached its target.
    pub const fn reached_target(&self) -> bool {
        self.reached_target
    }

    /// Last fully completed tick boundary after the run.
    pub const fn last_turn_time(&self) -> NaiveDateTime {
        self.last_turn_time
    }

    /// Resumption checkpoint, present only for truncated runs.
    pub const fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    /// Units of work executed by this run.
    pub const fn units_executed(&self) -> u32 {
        self.units_executed
    }

    /// Events produced by this run, in execution order.
    pub fn events(&self) -> &[TurnEvent] {
        &self.events
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn game_date_wraps_year() {
        let date = GameDate::new(184, 12).unwrap();
        assert_eq!(date.next_month(), GameDate::new(185, 1));
        assert_eq!(GameDate::new(184, 3).unwrap().next_month(), GameDate::new(184, 4));
    }

    #[test]
    fn game_date_rejects_bad_month() {
        assert!(GameDate::new(184, 0).is_none());
        assert!(GameDate::new(184, 13).is_none());
        assert!(GameDate::new(u32::MAX, 12).unwrap().next_month().is_none());
    }

    #[test]
    fn completed_result_has_no_checkpoint() {
        let result = TurnRunResult::completed(at(2), at(2), 4, Vec::new());
        assert!(result.reached_target());
        assert!(result.checkpoint().is_none());
        assert_eq!(result.units_executed(), 4);
    }

    #[test]
    fn truncated_result_carries_checkpoint() {
        let checkpoint = Checkpoint::new(serde_json::json!({ "done": 3 }));
        let result = TurnRunResult::truncated(at(2), at(1), checkpoint.clone(), 3, Vec::new());
        assert!(!result.reached_target());
        assert_eq!(result.checkpoint(), Some(&checkpoint));
        assert_eq!(result.last_turn_time(), at(1));
    }

    #[test]
    fn budget_builders() {
        assert!(RunBudget::unbounded().is_unbounded());
        let budget = RunBudget::units(10).with_max_duration(Duration::from_secs(2));
        assert_eq!(budget.max_units, Some(10));
        assert_eq!(budget.max_duration, Some(Duration::from_secs(2)));
        assert!(!budget.is_unbounded());
    }
}
