//! The daemon's state transition table.
//!
//! Kept as a pure function of (state, command) so the table can be checked
//! exhaustively without a clock, a store, or a running loop.
//!
//! | From            | Command   | To      | Effect        |
//! |-----------------|-----------|---------|---------------|
//! | Idle            | Start     | Running | reload        |
//! | Running         | Pause     | Paused  | none          |
//! | Paused          | Resume    | Running | reload        |
//! | Running, Paused | Stop      | Idle    | none          |
//! | any             | GetStatus | same    | report status |
//! | any             | Shutdown  | Idle    | shut down     |
//!
//! Every other pairing is an [`TransitionError::Illegal`] no-op.

use warlord_types::{Command, DaemonState, RequestId};

/// Side effect the daemon must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing beyond the state change.
    None,
    /// Reload last turn time and checkpoint from the store.
    Reload,
    /// Report a status snapshot for this request.
    ReportStatus {
        /// Correlation id of the request.
        request_id: RequestId,
    },
    /// Leave the run loop.
    Shutdown,
}

/// A legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the command.
    pub from: DaemonState,
    /// State after the command.
    pub to: DaemonState,
    /// Side effect to perform.
    pub effect: Effect,
}

/// A command that is not valid in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The command has no transition out of `state`. State is unchanged.
    #[error("illegal transition: {command} while {state}")]
    Illegal {
        /// State the daemon was in.
        state: DaemonState,
        /// The rejected command.
        command: Command,
    },
}

/// Look up the transition for `command` in `state`.
///
/// # Errors
///
/// Returns [`TransitionError::Illegal`] when the table has no entry.
pub const fn transition(
    state: DaemonState,
    command: Command,
) -> Result<Transition, TransitionError> {
    let (to, effect) = match (state, command) {
        (DaemonState::Idle, Command::Start) => (DaemonState::Running, Effect::Reload),
        (DaemonState::Running, Command::Pause) => (DaemonState::Paused, Effect::None),
        (DaemonState::Paused, Command::Resume) => (DaemonState::Running, Effect::Reload),
        (DaemonState::Running | DaemonState::Paused, Command::Stop) => {
            (DaemonState::Idle, Effect::None)
        }
        (_, Command::GetStatus { request_id }) => (state, Effect::ReportStatus { request_id }),
        (_, Command::Shutdown) => (DaemonState::Idle, Effect::Shutdown),
        _ => return Err(TransitionError::Illegal { state, command }),
    };
    Ok(Transition {
        from: state,
        to,
        effect,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL_STATES: [DaemonState; 3] =
        [DaemonState::Idle, DaemonState::Running, DaemonState::Paused];

    #[test]
    fn start_from_idle_reloads() {
        let t = transition(DaemonState::Idle, Command::Start).unwrap();
        assert_eq!(t.to, DaemonState::Running);
        assert_eq!(t.effect, Effect::Reload);
    }

    #[test]
    fn pause_and_resume() {
        let paused = transition(DaemonState::Running, Command::Pause).unwrap();
        assert_eq!(paused.to, DaemonState::Paused);
        let resumed = transition(DaemonState::Paused, Command::Resume).unwrap();
        assert_eq!(resumed.to, DaemonState::Running);
        assert_eq!(resumed.effect, Effect::Reload);
    }

    #[test]
    fn stop_returns_to_idle_from_active_states() {
        for state in [DaemonState::Running, DaemonState::Paused] {
            let t = transition(state, Command::Stop).unwrap();
            assert_eq!(t.to, DaemonState::Idle);
        }
    }

    #[test]
    fn status_never_changes_state() {
        let request_id = RequestId::new();
        for state in ALL_STATES {
            let t = transition(state, Command::GetStatus { request_id }).unwrap();
            assert_eq!(t.to, state);
            assert_eq!(t.effect, Effect::ReportStatus { request_id });
        }
    }

    #[test]
    fn shutdown_is_always_legal() {
        for state in ALL_STATES {
            let t = transition(state, Command::Shutdown).unwrap();
            assert_eq!(t.effect, Effect::Shutdown);
        }
    }

    #[test]
    fn illegal_pairs_are_rejected() {
        let illegal = [
            (DaemonState::Idle, Command::Pause),
            (DaemonState::Idle, Command::Resume),
            (DaemonState::Idle, Command::Stop),
            (DaemonState::Running, Command::Start),
            (DaemonState::Running, Command::Resume),
            (DaemonState::Paused, Command::Start),
            (DaemonState::Paused, Command::Pause),
        ];
        for (state, command) in illegal {
            assert_eq!(
                transition(state, command),
                Err(TransitionError::Illegal { state, command }),
                "{command} while {state} should be illegal"
            );
        }
    }
}
