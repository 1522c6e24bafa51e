//! Tick grid resolver.
//!
//! World turns fall on a fixed grid. The grid origin (the "cut-turn base")
//! is 01:00 on the calendar day before the last turn, and boundaries repeat
//! every `turn_term_minutes` from there. Anchoring to a fixed time of day
//! keeps the grid stable for any input on the same date.

use chrono::{NaiveDateTime, TimeDelta};

/// Hour of day at which the grid is anchored.
const CUT_TURN_HOUR: u32 = 1;

/// Errors that can occur while resolving the next tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The turn term must be a positive number of minutes.
    #[error("turn term must be positive, got {term_minutes} minutes")]
    InvalidTerm {
        /// The rejected term.
        term_minutes: i64,
    },

    /// The computation left chrono's representable date range.
    #[error("tick time out of range for last turn time {last_turn_time}")]
    OutOfRange {
        /// The input that could not be resolved.
        last_turn_time: NaiveDateTime,
    },
}

/// The grid origin for `last_turn_time`: 01:00 on the previous calendar day.
///
/// # Errors
///
/// Returns [`GridError::OutOfRange`] if the previous day does not exist.
pub fn cut_turn_base(last_turn_time: NaiveDateTime) -> Result<NaiveDateTime, GridError> {
    last_turn_time
        .date()
        .pred_opt()
        .and_then(|day| day.and_hms_opt(CUT_TURN_HOUR, 0, 0))
        .ok_or(GridError::OutOfRange { last_turn_time })
}

/// The next tick boundary strictly after `last_turn_time`.
///
/// Whole minutes elapsed since the cut-turn base are floored to a multiple
/// of the term, then one full term is added. An input that sits exactly on
/// a boundary therefore resolves to the following boundary.
///
/// # Errors
///
/// Returns [`GridError::InvalidTerm`] if `turn_term_minutes <= 0`, or
/// [`GridError::OutOfRange`] if the result is not representable.
pub fn next_tick_time(
    last_turn_time: NaiveDateTime,
    turn_term_minutes: i64,
) -> Result<NaiveDateTime, GridError> {
    if turn_term_minutes <= 0 {
        return Err(GridError::InvalidTerm {
            term_minutes: turn_term_minutes,
        });
    }
    let out_of_range = GridError::OutOfRange { last_turn_time };

    let base = cut_turn_base(last_turn_time)?;
    let elapsed = last_turn_time.signed_duration_since(base).num_minutes();
    let remainder = elapsed
        .checked_rem_euclid(turn_term_minutes)
        .ok_or_else(|| out_of_range.clone())?;
    let offset = elapsed
        .checked_sub(remainder)
        .and_then(|floored| floored.checked_add(turn_term_minutes))
        .ok_or_else(|| out_of_range.clone())?;

    TimeDelta::try_minutes(offset)
        .and_then(|delta| base.checked_add_signed(delta))
        .ok_or(out_of_range)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::*;

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn base_is_previous_day_at_one() {
        assert_eq!(
            cut_turn_base(at(2, 0, 30, 0)).unwrap(),
            at(1, 1, 0, 0)
        );
        // Crosses a month boundary.
        let first = at(1, 12, 0, 0);
        let base = cut_turn_base(first).unwrap();
        assert_eq!(base.date(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(base.hour(), 1);
    }

    #[test]
    fn hourly_grid_rounds_up() {
        assert_eq!(next_tick_time(at(5, 10, 30, 0), 60).unwrap(), at(5, 11, 0, 0));
        assert_eq!(next_tick_time(at(5, 10, 59, 59), 60).unwrap(), at(5, 11, 0, 0));
    }

    #[test]
    fn boundary_input_moves_one_full_term() {
        assert_eq!(next_tick_time(at(5, 10, 0, 0), 60).unwrap(), at(5, 11, 0, 0));
        assert_eq!(next_tick_time(at(5, 10, 0, 0), 10).unwrap(), at(5, 10, 10, 0));
    }

    #[test]
    fn odd_term_is_measured_from_the_anchor() {
        // Anchor 2026-02-28 01:00; midnight on 03-01 is 1380 minutes later,
        // 1380 floors to 1379 (197 * 7), next boundary is 1386.
        let last = at(1, 0, 0, 0);
        assert_eq!(next_tick_time(last, 7).unwrap(), at(1, 0, 6, 0));
    }

    #[test]
    fn rejects_non_positive_term() {
        assert_eq!(
            next_tick_time(at(5, 10, 0, 0), 0),
            Err(GridError::InvalidTerm { term_minutes: 0 })
        );
        assert_eq!(
            next_tick_time(at(5, 10, 0, 0), -60),
            Err(GridError::InvalidTerm { term_minutes: -60 })
        );
    }

    #[test]
    fn out_of_range_is_an_error() {
        let result = next_tick_time(NaiveDateTime::MIN, 60);
        assert!(matches!(result, Err(GridError::OutOfRange { .. })));
    }

    #[test]
    fn grid_properties_hold_across_a_day() {
        let epsilon = TimeDelta::seconds(1);
        for term in [1_i64, 5, 10, 15, 30, 60, 120, 1440] {
            let mut last = at(10, 0, 0, 0);
            let end = at(11, 0, 0, 0);
            while last < end {
                let next = next_tick_time(last, term).unwrap();
                assert!(next > last, "term {term}: {next} <= {last}");

                let base = cut_turn_base(last).unwrap();
                let offset = next.signed_duration_since(base).num_minutes();
                assert_eq!(offset % term, 0, "term {term}: {next} off grid");

                let again = next_tick_time(next.checked_sub_signed(epsilon).unwrap(), term);
                assert_eq!(again.unwrap(), next, "term {term}: not idempotent at {next}");

                last = last.checked_add_signed(TimeDelta::minutes(17)).unwrap();
            }
        }
    }

    #[test]
    fn is_reproducible() {
        let last = at(7, 13, 42, 9);
        assert_eq!(next_tick_time(last, 60), next_tick_time(last, 60));
    }
}
