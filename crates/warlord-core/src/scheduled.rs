//! Scheduled turn processor over the shared [`WorldCalendar`].
//!
//! One run covers one window: from the calendar's last tick boundary up to
//! `min(target, next tick)`. Inside the window every general whose turn is
//! due runs in (due time, id) order, and each execution pushes that
//! general's next turn one term later. If the window closes on the tick
//! boundary, the monthly world turn runs last.
//!
//! Progress lives in the calendar itself (rescheduled generals, advanced
//! date), so a retried or resumed run simply finds less work left. The
//! checkpoint only records which window was cut and how much of it was done.
//!
//! [`WorldCalendar`]: crate::calendar::WorldCalendar

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warlord_types::{Checkpoint, RunBudget, TurnEvent, TurnRunResult};

use crate::calendar::SharedCalendar;
use crate::executor::TurnExecutor;
use crate::grid;
use crate::processor::{BudgetMeter, ProcessorError, TurnProcessor};

/// What a checkpoint from this processor contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct WindowProgress {
    window_end: NaiveDateTime,
    units_done: u32,
}

impl WindowProgress {
    fn into_checkpoint(self) -> Result<Checkpoint, ProcessorError> {
        serde_json::to_value(self)
            .map(Checkpoint::new)
            .map_err(|err| ProcessorError::Internal {
                message: format!("failed to encode checkpoint: {err}"),
            })
    }

    fn from_checkpoint(checkpoint: &Checkpoint) -> Option<Self> {
        serde_json::from_value(checkpoint.payload().clone()).ok()
    }
}

/// Turn processor that walks the calendar's general schedule and tick grid.
#[derive(Debug)]
pub struct ScheduledTurnProcessor<E> {
    calendar: SharedCalendar,
    executor: E,
    turn_term_minutes: u32,
}

impl<E: TurnExecutor + Send> ScheduledTurnProcessor<E> {
    /// Create a processor advancing `calendar` with `executor`.
    pub const fn new(calendar: SharedCalendar, executor: E, turn_term_minutes: u32) -> Self {
        Self {
            calendar,
            executor,
            turn_term_minutes,
        }
    }

    /// Borrow the executor (useful for inspecting test executors).
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    fn term(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.turn_term_minutes))
    }

    async fn run_window(
        &mut self,
        target: NaiveDateTime,
        budget: &RunBudget,
        checkpoint: Option<&Checkpoint>,
    ) -> Result<TurnRunResult, ProcessorError> {
        let term = self.term();
        let mut meter = BudgetMeter::start(*budget);
        let mut events = Vec::new();
        let mut calendar = self.calendar.lock().await;

        let tick = grid::next_tick_time(
            calendar.last_turn_time(),
            i64::from(self.turn_term_minutes),
        )?;
        let window_end = target.min(tick);
        let units_before = resumed_units(checkpoint, window_end);

        let truncate = |meter: &BudgetMeter,
                        last_turn_time: NaiveDateTime,
                        mut events: Vec<TurnEvent>|
         -> Result<TurnRunResult, ProcessorError> {
            let units_done = units_before.saturating_add(meter.units());
            events.push(TurnEvent::RunTruncated {
                target,
                units: meter.units(),
            });
            let checkpoint = WindowProgress {
                window_end,
                units_done,
            }
            .into_checkpoint()?;
            info!(
                turn_target = %target,
                %window_end,
                units = meter.units(),
                units_done,
                "Turn run truncated by budget"
            );
            Ok(TurnRunResult::truncated(
                target,
                last_turn_time,
                checkpoint,
                meter.units(),
                events,
            ))
        };

        while let Some(general) = calendar.first_due(window_end).cloned() {
            if meter.is_exhausted() {
                return truncate(&meter, calendar.last_turn_time(), events);
            }
            self.executor
                .execute_general_turn(&general, calendar.date())?;

            let next_turn = general
                .turn_time
                .checked_add_signed(term)
                .ok_or_else(|| ProcessorError::Exhausted {
                    message: format!("general {} turn time overflow", general.general_id),
                })?;
            calendar.reschedule(general.general_id, next_turn);
            meter.record_unit();
            debug!(
                general_id = %general.general_id,
                turn_time = %general.turn_time,
                %next_turn,
                "General turn done"
            );
            events.push(TurnEvent::GeneralTurnExecuted {
                general_id: general.general_id,
                turn_time: general.turn_time,
            });
        }

        if window_end == tick {
            if meter.is_exhausted() {
                return truncate(&meter, calendar.last_turn_time(), events);
            }
            let next_date =
                calendar
                    .date()
                    .next_month()
                    .ok_or_else(|| ProcessorError::Exhausted {
                        message: format!("game date {} cannot advance", calendar.date()),
                    })?;
            self.executor.execute_world_turn(next_date)?;
            calendar.advance_world(tick);
            meter.record_unit();
            events.push(TurnEvent::WorldTurnAdvanced {
                date: next_date,
                turn_time: tick,
            });
        }

        Ok(TurnRunResult::completed(
            target,
            calendar.last_turn_time(),
            meter.units(),
            events,
        ))
    }
}

/// Units already done in `window_end` according to `checkpoint`.
fn resumed_units(checkpoint: Option<&Checkpoint>, window_end: NaiveDateTime) -> u32 {
    let Some(checkpoint) = checkpoint else {
        return 0;
    };
    match WindowProgress::from_checkpoint(checkpoint) {
        Some(progress) if progress.window_end == window_end => {
            debug!(
                %window_end,
                units_done = progress.units_done,
                "Resuming truncated window"
            );
            progress.units_done
        }
        Some(progress) => {
            warn!(
                checkpoint_window = %progress.window_end,
                %window_end,
                "Checkpoint belongs to another window, ignoring"
            );
            0
        }
        None => {
            warn!("Unrecognized checkpoint payload, ignoring");
            0
        }
    }
}

impl<E: TurnExecutor + Send> TurnProcessor for ScheduledTurnProcessor<E> {
    async fn run(
        &mut self,
        target: NaiveDateTime,
        budget: &RunBudget,
        checkpoint: Option<&Checkpoint>,
    ) -> Result<TurnRunResult, ProcessorError> {
        self.run_window(target, budget, checkpoint).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;
    use warlord_types::{GameDate, GeneralId};

    use super::*;
    use crate::calendar::{GeneralTurn, WorldCalendar};
    use crate::executor::{ExecutorError, LoggingExecutor};

    /// Records every execution so tests can compare runs.
    #[derive(Debug, Default)]
    struct Recorder {
        log: Vec<String>,
        fail_on: Option<GeneralId>,
    }

    impl TurnExecutor for Recorder {
        fn execute_general_turn(
            &mut self,
            general: &GeneralTurn,
            date: GameDate,
        ) -> Result<(), ExecutorError> {
            if self.fail_on == Some(general.general_id) {
                return Err(ExecutorError::GeneralTurn {
                    general_id: general.general_id,
                    message: String::from("scripted failure"),
                });
            }
            self.log
                .push(format!("{} {} {date}", general.name, general.turn_time));
            Ok(())
        }

        fn execute_world_turn(&mut self, date: GameDate) -> Result<(), ExecutorError> {
            self.log.push(format!("world {date}"));
            Ok(())
        }
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn calendar() -> WorldCalendar {
        let mut calendar = WorldCalendar::new(at(10, 0), GameDate::new(190, 5).unwrap());
        for (n, minute) in [(1_u128, 5_u32), (2, 20), (3, 20), (4, 45)] {
            calendar.add_general(GeneralTurn {
                general_id: GeneralId::from(Uuid::from_u128(n)),
                name: format!("g{n}"),
                turn_time: at(10, minute),
            });
        }
        calendar
    }

    #[tokio::test]
    async fn full_window_runs_generals_then_world_turn() {
        let shared = calendar().into_shared();
        let mut processor = ScheduledTurnProcessor::new(shared.clone(), Recorder::default(), 60);

        let result = processor
            .run(at(11, 0), &RunBudget::unbounded(), None)
            .await
            .unwrap();

        assert!(result.reached_target());
        assert!(result.checkpoint().is_none());
        assert_eq!(result.last_turn_time(), at(11, 0));
        assert_eq!(result.units_executed(), 5);
        assert_eq!(
            processor.executor().log,
            vec![
                "g1 2026-06-15 10:05:00 190-05",
                "g2 2026-06-15 10:20:00 190-05",
                "g3 2026-06-15 10:20:00 190-05",
                "g4 2026-06-15 10:45:00 190-05",
                "world 190-06",
            ]
        );

        let calendar = shared.lock().await;
        assert_eq!(calendar.date(), GameDate::new(190, 6).unwrap());
        assert_eq!(calendar.next_general_turn_time(), Some(at(11, 5)));
    }

    #[tokio::test]
    async fn general_target_stops_before_tick() {
        let shared = calendar().into_shared();
        let mut processor = ScheduledTurnProcessor::new(shared.clone(), LoggingExecutor, 60);

        let result = processor
            .run(at(10, 20), &RunBudget::unbounded(), None)
            .await
            .unwrap();

        assert!(result.reached_target());
        assert_eq!(result.units_executed(), 3);
        assert_eq!(result.last_turn_time(), at(10, 0));
        assert_eq!(shared.lock().await.date(), GameDate::new(190, 5).unwrap());
    }

    #[tokio::test]
    async fn truncated_runs_resume_to_the_same_outcome() {
        let uninterrupted = calendar().into_shared();
        let mut reference = ScheduledTurnProcessor::new(uninterrupted.clone(), Recorder::default(), 60);
        reference
            .run(at(11, 0), &RunBudget::unbounded(), None)
            .await
            .unwrap();

        let chunked = calendar().into_shared();
        let mut processor = ScheduledTurnProcessor::new(chunked.clone(), Recorder::default(), 60);
        let budget = RunBudget::units(2);
        let mut checkpoint = None;
        let mut runs: u32 = 0;
        loop {
            runs = runs.saturating_add(1);
            let result = processor
                .run(at(11, 0), &budget, checkpoint.as_ref())
                .await
                .unwrap();
            if result.reached_target() {
                assert!(result.checkpoint().is_none());
                break;
            }
            checkpoint = result.checkpoint().cloned();
            assert!(runs < 10, "never completed");
        }

        assert_eq!(runs, 3);
        assert_eq!(processor.executor().log, reference.executor().log);
        assert_eq!(*chunked.lock().await, *uninterrupted.lock().await);
    }

    #[tokio::test]
    async fn checkpoint_records_window_progress() {
        let shared = calendar().into_shared();
        let mut processor = ScheduledTurnProcessor::new(shared, LoggingExecutor, 60);

        let first = processor
            .run(at(11, 0), &RunBudget::units(3), None)
            .await
            .unwrap();
        let progress = WindowProgress::from_checkpoint(first.checkpoint().unwrap()).unwrap();
        assert_eq!(progress, WindowProgress { window_end: at(11, 0), units_done: 3 });
        assert!(matches!(
            first.events().last(),
            Some(TurnEvent::RunTruncated { units: 3, .. })
        ));

        let second = processor
            .run(at(11, 0), &RunBudget::units(1), first.checkpoint())
            .await
            .unwrap();
        let progress = WindowProgress::from_checkpoint(second.checkpoint().unwrap()).unwrap();
        assert_eq!(progress.units_done, 4);
    }

    #[tokio::test]
    async fn executor_failure_keeps_earlier_progress() {
        let shared = calendar().into_shared();
        let recorder = Recorder {
            fail_on: Some(GeneralId::from(Uuid::from_u128(3))),
            ..Recorder::default()
        };
        let mut processor = ScheduledTurnProcessor::new(shared.clone(), recorder, 60);

        let result = processor.run(at(11, 0), &RunBudget::unbounded(), None).await;
        assert!(matches!(result, Err(ProcessorError::Executor { .. })));

        let calendar = shared.lock().await;
        assert_eq!(calendar.last_turn_time(), at(10, 0));
        assert_eq!(calendar.first_due(at(11, 0)).map(|g| g.name.clone()), Some(String::from("g3")));
    }

    #[tokio::test]
    async fn repeated_run_for_same_target_does_not_advance_twice() {
        let shared = calendar().into_shared();
        let mut processor = ScheduledTurnProcessor::new(shared.clone(), LoggingExecutor, 60);

        let first = processor
            .run(at(11, 0), &RunBudget::unbounded(), None)
            .await
            .unwrap();
        assert_eq!(first.last_turn_time(), at(11, 0));

        let second = processor
            .run(at(11, 0), &RunBudget::unbounded(), None)
            .await
            .unwrap();
        assert_eq!(second.last_turn_time(), at(11, 0));
        assert_eq!(second.units_executed(), 0);
        assert_eq!(shared.lock().await.date(), GameDate::new(190, 6).unwrap());
    }
}
