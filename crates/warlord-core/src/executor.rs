//! Rule resolution seam.
//!
//! The scheduled processor decides *which* turn runs next. What a general
//! actually does on their turn, and what a monthly world turn changes, is
//! delegated to a [`TurnExecutor`]. Game rules plug in here.

use tracing::{debug, info};
use warlord_types::{GameDate, GeneralId};

use crate::calendar::GeneralTurn;

/// Errors that can occur while executing a single turn.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// A general's turn could not be resolved.
    #[error("general {general_id} turn failed: {message}")]
    GeneralTurn {
        /// The general whose turn failed.
        general_id: GeneralId,
        /// Description of the failure.
        message: String,
    },

    /// The monthly world turn could not be resolved.
    #[error("world turn for {date} failed: {message}")]
    WorldTurn {
        /// The date the world was advancing to.
        date: GameDate,
        /// Description of the failure.
        message: String,
    },
}

/// Resolves individual turns against world state.
///
/// Implementations must be deterministic given the same world state, so a
/// run retried after a failure produces the same outcome.
pub trait TurnExecutor {
    /// Resolve one general's turn on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::GeneralTurn`] if the turn cannot be resolved.
    fn execute_general_turn(
        &mut self,
        general: &GeneralTurn,
        date: GameDate,
    ) -> Result<(), ExecutorError>;

    /// Resolve the monthly world turn that moves the world to `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::WorldTurn`] if the turn cannot be resolved.
    fn execute_world_turn(&mut self, date: GameDate) -> Result<(), ExecutorError>;
}

/// Executor that only records turns in the log.
///
/// Used when the daemon runs without a rules engine attached, and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExecutor;

impl TurnExecutor for LoggingExecutor {
    fn execute_general_turn(
        &mut self,
        general: &GeneralTurn,
        date: GameDate,
    ) -> Result<(), ExecutorError> {
        debug!(
            general_id = %general.general_id,
            name = general.name,
            turn_time = %general.turn_time,
            %date,
            "General turn executed"
        );
        Ok(())
    }

    fn execute_world_turn(&mut self, date: GameDate) -> Result<(), ExecutorError> {
        info!(%date, "World turn executed");
        Ok(())
    }
}
