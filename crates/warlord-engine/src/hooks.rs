//! Daemon hooks that report everything through `tracing`.
//!
//! The engine has no downstream consumers of its own, so flushed results,
//! published events, status replies and rejected commands all end up in
//! the log.

use tracing::{debug, info, warn};
use warlord_core::daemon::DaemonError;
use warlord_core::hooks::{DaemonHooks, HookError};
use warlord_core::transition::TransitionError;
use warlord_types::{CommandEnvelope, RequestId, Status, TurnEvent, TurnRunResult};

/// Hooks that log every callback.
#[derive(Debug, Default)]
pub struct TracingHooks {
    cycles: u64,
}

impl TracingHooks {
    /// Create hooks with a zero cycle count.
    pub const fn new() -> Self {
        Self { cycles: 0 }
    }

    /// Number of results flushed so far.
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl DaemonHooks for TracingHooks {
    fn flush_changes(&mut self, result: &TurnRunResult) -> Result<(), HookError> {
        self.cycles = self.cycles.saturating_add(1);
        debug!(
            cycle = self.cycles,
            turn_target = %result.target(),
            checkpoint = result.checkpoint().is_some(),
            "Turn progress flushed"
        );
        Ok(())
    }

    fn publish_events(&mut self, result: &TurnRunResult) -> Result<(), HookError> {
        for event in result.events() {
            match event {
                TurnEvent::GeneralTurnExecuted {
                    general_id,
                    turn_time,
                } => debug!(%general_id, %turn_time, "General turn published"),
                TurnEvent::WorldTurnAdvanced { date, turn_time } => {
                    info!(%date, %turn_time, "World turn advanced");
                }
                TurnEvent::RunTruncated { target, units } => {
                    info!(turn_target = %target, units, "Turn run truncated, resuming next cycle");
                }
            }
        }
        Ok(())
    }

    fn on_run_error(&mut self, error: &DaemonError) {
        warn!(error = %error, "Turn cycle error reported");
    }

    fn on_status(&mut self, request_id: RequestId, status: &Status) {
        info!(
            %request_id,
            state = %status.state,
            running = status.running,
            paused = status.paused,
            queue_depth = status.queue_depth,
            "Daemon status"
        );
    }

    fn on_command_rejected(&mut self, envelope: &CommandEnvelope, error: &TransitionError) {
        warn!(command_id = %envelope.id, error = %error, "Command rejected");
    }
}
