//! Operator commands and the envelope the transport wraps them in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{CommandId, RequestId};

/// A control command addressed to the turn daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Begin advancing game time.
    Start,
    /// Abandon scheduling and return to idle.
    Stop,
    /// Suspend time advancement between cycles.
    Pause,
    /// Continue time advancement after a pause.
    Resume,
    /// Ask for a [`Status`](crate::Status) snapshot.
    GetStatus {
        /// Correlation id echoed with the reply.
        request_id: RequestId,
    },
    /// End the run loop so the hosting process can exit.
    Shutdown,
}

impl Command {
    /// Short lowercase name used in log fields.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::GetStatus { .. } => "get_status",
            Self::Shutdown => "shutdown",
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A command as delivered by the transport, with correlation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CommandEnvelope {
    /// Transport-assigned identifier.
    pub id: CommandId,
    /// When the command entered the control queue.
    pub received_at: DateTime<Utc>,
    /// The semantic payload.
    pub command: Command,
}

impl CommandEnvelope {
    /// Wrap a command with a fresh id and the current UTC time.
    pub fn new(command: Command) -> Self {
        Self {
            id: CommandId::new(),
            received_at: Utc::now(),
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_tagged_representation() {
        let json = serde_json::to_value(Command::Pause).ok();
        assert_eq!(json, Some(serde_json::json!({ "type": "pause" })));

        let request_id = RequestId::new();
        let json = serde_json::to_value(Command::GetStatus { request_id }).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "type": "get_status",
                "request_id": request_id.to_string()
            }))
        );
    }

    #[test]
    fn envelope_keeps_payload() {
        let envelope = CommandEnvelope::new(Command::Stop);
        assert_eq!(envelope.command, Command::Stop);
        assert_eq!(envelope.command.name(), "stop");
    }
}
