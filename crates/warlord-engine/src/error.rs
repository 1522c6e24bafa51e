//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the daemon run.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: warlord_core::config::ConfigError,
    },

    /// Opening the turn state store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: warlord_core::store::StoreError,
    },

    /// The daemon stopped on an unrecoverable error.
    #[error("daemon error: {source}")]
    Daemon {
        /// The underlying daemon error.
        #[from]
        source: warlord_core::daemon::DaemonError,
    },

    /// The configured start year and month do not form a game date.
    #[error("invalid start date: year {year}, month {month}")]
    StartDate {
        /// Configured start year.
        year: u32,
        /// Configured start month.
        month: u8,
    },
}
