//! Turn daemon binary for a Warlord world.
//!
//! This is the main entry point that wires together configuration,
//! logging, the calendar snapshot store, the scheduled turn processor and
//! the operator console, then runs the turn daemon until it is shut down.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `warlord-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the calendar store, seeding a fresh world if none exists
//! 4. Build the scheduled turn processor and the daemon
//! 5. Attach the stdin console and the Ctrl-C handler
//! 6. Run the daemon until `Shutdown`

mod console;
mod error;
mod hooks;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;
use warlord_core::calendar::WorldCalendar;
use warlord_core::calendar_store::CalendarStore;
use warlord_core::clock::{Clock as _, SystemClock};
use warlord_core::config::{LogFormat, LoggingConfig, WarlordConfig};
use warlord_core::daemon::TurnDaemon;
use warlord_core::executor::LoggingExecutor;
use warlord_core::scheduled::ScheduledTurnProcessor;
use warlord_types::Command;

use crate::error::EngineError;
use crate::hooks::TracingHooks;

const CONFIG_PATH: &str = "warlord-config.yaml";

/// Application entry point for the turn daemon.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the daemon fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("warlord-engine starting");
    if !from_file {
        info!("Config file not found, using defaults");
    }
    info!(
        world_name = config.world.name,
        turn_term_minutes = config.world.turn_term_minutes,
        generals = config.world.generals,
        autostart = config.daemon.autostart,
        "Configuration loaded"
    );

    // 3. Open the calendar store.
    let clock = SystemClock;
    let fresh = fresh_calendar(&config, clock.now())?;
    let store = match &config.storage.snapshot_path {
        Some(path) => CalendarStore::open(path.clone(), fresh).await?,
        None => {
            info!("No snapshot path configured, state is in memory only");
            CalendarStore::in_memory(fresh.into_shared())
        }
    };
    {
        let calendar = store.calendar();
        let calendar = calendar.lock().await;
        info!(
            last_turn_time = %calendar.last_turn_time(),
            date = %calendar.date(),
            generals = calendar.generals().count(),
            "World calendar ready"
        );
    }

    // 4. Build the processor and the daemon.
    let processor = ScheduledTurnProcessor::new(
        store.calendar(),
        LoggingExecutor,
        config.world.turn_term_minutes,
    );
    let mut daemon = TurnDaemon::new(
        clock,
        store,
        processor,
        TracingHooks::new(),
        config.daemon_config(),
    );

    // 5. Attach command sources.
    let handle = daemon.handle();
    let _console = console::spawn_console(handle.clone());
    let _ctrl_c = console::spawn_ctrl_c(handle.clone());
    if config.daemon.autostart {
        handle.send(Command::Start);
    }

    // 6. Run until shutdown.
    let exit = daemon.run().await.map_err(EngineError::from)?;

    info!(
        exit = ?exit,
        cycles = daemon.hooks().cycles(),
        "warlord-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `warlord-config.yaml` in the working directory.
///
/// Returns the configuration and whether it came from the file.
fn load_config() -> Result<(WarlordConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((WarlordConfig::from_file(config_path)?, true))
    } else {
        let mut config = WarlordConfig::default();
        config.storage.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `logging.level`.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// The calendar a brand-new world starts from.
fn fresh_calendar(
    config: &WarlordConfig,
    now: chrono::NaiveDateTime,
) -> Result<WorldCalendar, EngineError> {
    let date = config.start_date().ok_or(EngineError::StartDate {
        year: config.world.start_year,
        month: config.world.start_month,
    })?;
    let last_turn_time = config.world.start_time.unwrap_or(now);
    Ok(WorldCalendar::seeded(
        last_turn_time,
        date,
        config.world.generals,
        config.world.turn_term_minutes,
    ))
}
