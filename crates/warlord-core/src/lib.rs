//! Turn scheduling engine for a persistent warlord world.
//!
//! This crate decides when game time advances and how much work each
//! advance may do. It owns the tick grid, the control queue, the daemon
//! state machine and run loop, and the contracts for persistence and turn
//! processing.
//!
//! # Modules
//!
//! - [`calendar`] -- In-memory world calendar: last turn time, game date,
//!   and the per-general turn schedule.
//! - [`calendar_store`] -- [`TurnStateStore`] over the calendar with an
//!   optional JSON snapshot file.
//! - [`clock`] -- [`Clock`] trait with system and simulated clocks.
//! - [`config`] -- Configuration loading from `warlord-config.yaml` into
//!   strongly-typed structs.
//! - [`daemon`] -- [`TurnDaemon`] run loop and [`DaemonHandle`].
//! - [`executor`] -- [`TurnExecutor`] seam where game rules plug in.
//! - [`grid`] -- Tick grid resolver.
//! - [`hooks`] -- [`DaemonHooks`] callbacks around each cycle.
//! - [`processor`] -- [`TurnProcessor`] trait and budget accounting.
//! - [`queue`] -- FIFO control queue with permit-based wake-ups.
//! - [`scheduled`] -- [`ScheduledTurnProcessor`], the calendar-driven
//!   processor.
//! - [`store`] -- [`TurnStateStore`] trait and store errors.
//! - [`transition`] -- The daemon state transition table.
//!
//! [`TurnStateStore`]: store::TurnStateStore
//! [`Clock`]: clock::Clock
//! [`TurnDaemon`]: daemon::TurnDaemon
//! [`DaemonHandle`]: daemon::DaemonHandle
//! [`TurnExecutor`]: executor::TurnExecutor
//! [`DaemonHooks`]: hooks::DaemonHooks
//! [`TurnProcessor`]: processor::TurnProcessor
//! [`ScheduledTurnProcessor`]: scheduled::ScheduledTurnProcessor

pub mod calendar;
pub mod calendar_store;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod executor;
pub mod grid;
pub mod hooks;
pub mod processor;
pub mod queue;
pub mod scheduled;
pub mod store;
pub mod transition;
