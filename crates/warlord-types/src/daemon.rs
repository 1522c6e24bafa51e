//! Daemon state and the status snapshot reported to operators.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of the turn daemon.
///
/// Exactly one value holds at any instant. The daemon moves between states
/// only through the transition table in `warlord-core`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    /// Not advancing game time, still listening for commands.
    #[default]
    Idle,
    /// Actively advancing game time on the tick grid.
    Running,
    /// Time advancement suspended; the control queue is still serviced.
    Paused,
}

impl DaemonState {
    /// Stable numeric encoding used for lock-free status publication.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Paused => 2,
        }
    }

    /// Decode a value produced by [`DaemonState::as_u8`].
    ///
    /// Unknown values decode to [`DaemonState::Idle`].
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Paused,
            _ => Self::Idle,
        }
    }
}

impl core::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the daemon, recomputed on every request.
///
/// Never stored. Built only from the in-memory daemon state and the
/// control queue depth, so it is always answerable even while a turn
/// run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Status {
    /// Current lifecycle state.
    pub state: DaemonState,
    /// `true` iff `state` is [`DaemonState::Running`].
    pub running: bool,
    /// `true` iff `state` is [`DaemonState::Paused`].
    pub paused: bool,
    /// Commands waiting in the control queue at snapshot time.
    #[ts(type = "number")]
    pub queue_depth: usize,
}

impl Status {
    /// Derive a status snapshot from a state and a queue depth.
    pub const fn snapshot(state: DaemonState, queue_depth: usize) -> Self {
        Self {
            state,
            running: matches!(state, DaemonState::Running),
            paused: matches!(state, DaemonState::Paused),
            queue_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flags_follow_state() {
        let running = Status::snapshot(DaemonState::Running, 3);
        assert!(running.running);
        assert!(!running.paused);
        assert_eq!(running.queue_depth, 3);

        let paused = Status::snapshot(DaemonState::Paused, 0);
        assert!(!paused.running);
        assert!(paused.paused);

        let idle = Status::snapshot(DaemonState::Idle, 0);
        assert!(!idle.running);
        assert!(!idle.paused);
    }

    #[test]
    fn state_u8_encoding_round_trips() {
        for state in [DaemonState::Idle, DaemonState::Running, DaemonState::Paused] {
            assert_eq!(DaemonState::from_u8(state.as_u8()), state);
        }
        assert_eq!(DaemonState::from_u8(200), DaemonState::Idle);
    }

    #[test]
    fn status_serializes_snake_case_state() {
        let json = serde_json::to_value(Status::snapshot(DaemonState::Paused, 1)).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "state": "paused",
                "running": false,
                "paused": true,
                "queue_depth": 1
            }))
        );
    }
}
