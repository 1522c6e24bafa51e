//! Shared type definitions for the Warlord turn daemon.
//!
//! Types defined here cross crate boundaries: the daemon core, the engine
//! binary, and downstream consumers of status and turn events (which get
//! `TypeScript` bindings through `ts-rs`).
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for commands, requests and generals
//! - [`daemon`] -- [`DaemonState`] and the [`Status`] snapshot
//! - [`command`] -- Operator [`Command`]s and their transport envelope
//! - [`turn`] -- Budget, checkpoint and run result contract types

pub mod command;
pub mod daemon;
pub mod ids;
pub mod turn;

pub use command::{Command, CommandEnvelope};
pub use daemon::{DaemonState, Status};
pub use ids::{CommandId, GeneralId, RequestId};
pub use turn::{Checkpoint, GameDate, MONTHS_PER_YEAR, RunBudget, TurnEvent, TurnRunResult};

#[cfg(test)]
mod tests {
    //! Binding generation for dashboard consumers.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::ids::CommandId::export_all();
        let _ = crate::ids::RequestId::export_all();
        let _ = crate::ids::GeneralId::export_all();
        let _ = crate::daemon::DaemonState::export_all();
        let _ = crate::daemon::Status::export_all();
        let _ = crate::command::Command::export_all();
        let _ = crate::command::CommandEnvelope::export_all();
        let _ = crate::turn::GameDate::export_all();
        let _ = crate::turn::TurnEvent::export_all();
    }
}
