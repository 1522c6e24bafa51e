//! Callbacks the daemon invokes around each turn cycle.
//!
//! Hooks are how results leave the daemon: flushing changed state to
//! downstream stores, publishing events to clients, answering status
//! requests, and reporting errors. Hook failures never stop the daemon and
//! never undo progress that has already been persisted.

use warlord_types::{CommandEnvelope, RequestId, Status, TurnRunResult};

use crate::daemon::DaemonError;
use crate::transition::TransitionError;

/// Errors returned by hook implementations.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Flushing changed state downstream failed.
    #[error("flush failed: {message}")]
    Flush {
        /// Description of the failure.
        message: String,
    },

    /// Publishing events failed.
    #[error("publish failed: {message}")]
    Publish {
        /// Description of the failure.
        message: String,
    },
}

/// Daemon lifecycle callbacks. Every method defaults to a no-op.
pub trait DaemonHooks: Send {
    /// Called after a cycle's progress has been persisted.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] on failure; the daemon reports it and moves on.
    fn flush_changes(&mut self, _result: &TurnRunResult) -> Result<(), HookError> {
        Ok(())
    }

    /// Called after [`flush_changes`](Self::flush_changes), even if it failed.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] on failure; the daemon reports it and moves on.
    fn publish_events(&mut self, _result: &TurnRunResult) -> Result<(), HookError> {
        Ok(())
    }

    /// Called for every recoverable failure inside the run loop.
    fn on_run_error(&mut self, _error: &DaemonError) {}

    /// Called with the reply to a status request.
    fn on_status(&mut self, _request_id: RequestId, _status: &Status) {}

    /// Called when a command is not valid in the current state.
    fn on_command_rejected(&mut self, _envelope: &CommandEnvelope, _error: &TransitionError) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHooks;

impl DaemonHooks for NoOpHooks {}
