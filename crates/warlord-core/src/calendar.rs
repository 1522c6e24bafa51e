//! In-memory world calendar.
//!
//! The calendar is the slice of world state the turn daemon cares about:
//! the last completed tick boundary, the game date, and when each general is
//! next due to act. It is shared between the store (which persists it) and
//! the scheduled processor (which advances it), so it lives behind a
//! [`tokio::sync::Mutex`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use warlord_types::{Checkpoint, GameDate, GeneralId, MONTHS_PER_YEAR};

/// Calendar shared between the store and the processor.
pub type SharedCalendar = Arc<Mutex<WorldCalendar>>;

/// One general's place in the turn schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralTurn {
    /// The general.
    pub general_id: GeneralId,
    /// Display name, for logs.
    pub name: String,
    /// When the general's next turn is due.
    pub turn_time: NaiveDateTime,
}

/// Turn-relevant world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldCalendar {
    last_turn_time: NaiveDateTime,
    date: GameDate,
    #[serde(default)]
    generals: BTreeMap<GeneralId, GeneralTurn>,
    #[serde(default)]
    checkpoint: Option<Checkpoint>,
}

impl WorldCalendar {
    /// An empty world whose last tick boundary was `last_turn_time`.
    pub const fn new(last_turn_time: NaiveDateTime, date: GameDate) -> Self {
        Self {
            last_turn_time,
            date,
            generals: BTreeMap::new(),
            checkpoint: None,
        }
    }

    /// A world with `count` generals whose first turns are spread evenly
    /// over the term that follows `last_turn_time`.
    pub fn seeded(
        last_turn_time: NaiveDateTime,
        date: GameDate,
        count: u32,
        turn_term_minutes: u32,
    ) -> Self {
        let mut calendar = Self::new(last_turn_time, date);
        let term_seconds = i64::from(turn_term_minutes).saturating_mul(60);
        for index in 0..count {
            let offset = term_seconds
                .saturating_mul(i64::from(index))
                .checked_div(i64::from(count))
                .unwrap_or(0);
            let turn_time = last_turn_time
                .checked_add_signed(TimeDelta::seconds(offset))
                .unwrap_or(last_turn_time);
            calendar.add_general(GeneralTurn {
                general_id: GeneralId::new(),
                name: format!("general-{index}"),
                turn_time,
            });
        }
        calendar
    }

    /// Add or replace a general's schedule entry.
    pub fn add_general(&mut self, general: GeneralTurn) {
        self.generals.insert(general.general_id, general);
    }

    /// Look up one general.
    pub fn general(&self, general_id: GeneralId) -> Option<&GeneralTurn> {
        self.generals.get(&general_id)
    }

    /// All generals, ordered by id.
    pub fn generals(&self) -> impl Iterator<Item = &GeneralTurn> {
        self.generals.values()
    }

    /// Last completed tick boundary.
    pub const fn last_turn_time(&self) -> NaiveDateTime {
        self.last_turn_time
    }

    /// Record a completed tick boundary.
    pub const fn set_last_turn_time(&mut self, last_turn_time: NaiveDateTime) {
        self.last_turn_time = last_turn_time;
    }

    /// Current game date.
    pub const fn date(&self) -> GameDate {
        self.date
    }

    /// In-flight checkpoint of a truncated run.
    pub const fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    /// Replace the in-flight checkpoint.
    pub fn set_checkpoint(&mut self, checkpoint: Option<Checkpoint>) {
        self.checkpoint = checkpoint;
    }

    /// Earliest due time over all generals.
    pub fn next_general_turn_time(&self) -> Option<NaiveDateTime> {
        self.generals.values().map(|g| g.turn_time).min()
    }

    /// The general that should act next among those due at or before
    /// `up_to`, ordered by due time and then by id.
    pub fn first_due(&self, up_to: NaiveDateTime) -> Option<&GeneralTurn> {
        self.generals
            .values()
            .filter(|g| g.turn_time <= up_to)
            .min_by_key(|g| (g.turn_time, g.general_id))
    }

    /// Move a general's next turn. Returns `false` for unknown generals.
    pub fn reschedule(&mut self, general_id: GeneralId, turn_time: NaiveDateTime) -> bool {
        self.generals.get_mut(&general_id).is_some_and(|general| {
            general.turn_time = turn_time;
            true
        })
    }

    /// Close the tick at `boundary`: advance one month and record the
    /// boundary as the last turn time. Returns the new date.
    pub fn advance_world(&mut self, boundary: NaiveDateTime) -> Option<GameDate> {
        let next = self.date.next_month()?;
        self.date = next;
        self.last_turn_time = boundary;
        Some(next)
    }

    /// Check invariants that deserialization alone cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.date.month == 0 || self.date.month > MONTHS_PER_YEAR {
            return Err(format!("game month {} out of range", self.date.month));
        }
        if let Some((key, general)) = self
            .generals
            .iter()
            .find(|(key, general)| **key != general.general_id)
        {
            return Err(format!(
                "general keyed {key} carries id {}",
                general.general_id
            ));
        }
        Ok(())
    }

    /// Wrap into a [`SharedCalendar`].
    pub fn into_shared(self) -> SharedCalendar {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn general(n: u128, turn_time: NaiveDateTime) -> GeneralTurn {
        GeneralTurn {
            general_id: GeneralId::from(Uuid::from_u128(n)),
            name: format!("g{n}"),
            turn_time,
        }
    }

    fn date() -> GameDate {
        GameDate::new(184, 1).unwrap()
    }

    #[test]
    fn first_due_orders_by_time_then_id() {
        let mut calendar = WorldCalendar::new(at(9, 0), date());
        calendar.add_general(general(3, at(9, 20)));
        calendar.add_general(general(2, at(9, 10)));
        calendar.add_general(general(1, at(9, 10)));

        let first = calendar.first_due(at(10, 0)).unwrap();
        assert_eq!(first.general_id, GeneralId::from(Uuid::from_u128(1)));
        assert!(calendar.first_due(at(9, 5)).is_none());
        assert_eq!(calendar.next_general_turn_time(), Some(at(9, 10)));
    }

    #[test]
    fn reschedule_moves_general() {
        let mut calendar = WorldCalendar::new(at(9, 0), date());
        let g = general(1, at(9, 10));
        let id = g.general_id;
        calendar.add_general(g);

        assert!(calendar.reschedule(id, at(10, 10)));
        assert_eq!(calendar.general(id).unwrap().turn_time, at(10, 10));
        assert!(!calendar.reschedule(GeneralId::new(), at(11, 0)));
    }

    #[test]
    fn advance_world_moves_date_and_boundary() {
        let mut calendar = WorldCalendar::new(at(9, 0), GameDate::new(184, 12).unwrap());
        let next = calendar.advance_world(at(10, 0)).unwrap();
        assert_eq!(next, GameDate::new(185, 1).unwrap());
        assert_eq!(calendar.last_turn_time(), at(10, 0));
    }

    #[test]
    fn seeded_generals_spread_over_one_term() {
        let calendar = WorldCalendar::seeded(at(9, 0), date(), 4, 60);
        let mut times: Vec<_> = calendar.generals().map(|g| g.turn_time).collect();
        times.sort();
        assert_eq!(times, vec![at(9, 0), at(9, 15), at(9, 30), at(9, 45)]);
    }

    #[test]
    fn validate_rejects_bad_month() {
        let mut json = serde_json::to_value(WorldCalendar::new(at(9, 0), date())).unwrap();
        json["date"]["month"] = serde_json::json!(13);
        let calendar: WorldCalendar = serde_json::from_value(json).unwrap();
        assert!(calendar.validate().is_err());
    }
}
