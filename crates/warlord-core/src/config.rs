//! Configuration loading and typed config structures for the turn daemon.
//!
//! The canonical configuration lives in `warlord-config.yaml` next to the
//! binary's working directory. Every field has a default, so a missing file
//! or an empty document yields a runnable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;
use warlord_types::{GameDate, RunBudget};

use crate::daemon::DaemonConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level daemon configuration, mirroring `warlord-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WarlordConfig {
    /// World identity and turn grid.
    #[serde(default)]
    pub world: WorldConfig,

    /// Run loop behaviour.
    #[serde(default)]
    pub daemon: DaemonSettings,

    /// Per-cycle work budget.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Where turn progress is persisted.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WarlordConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `WARLORD_SNAPSHOT_PATH` overrides `storage.snapshot_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.storage.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.turn_term_minutes == 0 {
            return Err(ConfigError::Invalid {
                reason: "world.turn_term_minutes must be at least 1".to_owned(),
            });
        }
        if GameDate::new(self.world.start_year, self.world.start_month).is_none() {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "world.start_month must be 1..=12, got {}",
                    self.world.start_month
                ),
            });
        }
        if self.daemon.failure_backoff_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "daemon.failure_backoff_ms must be at least 1".to_owned(),
            });
        }
        if self.budget.max_units == Some(0) || self.budget.max_duration_ms == Some(0) {
            return Err(ConfigError::Invalid {
                reason: "budget limits must be positive when set".to_owned(),
            });
        }
        Ok(())
    }

    /// The game date a fresh world starts on.
    pub fn start_date(&self) -> Option<GameDate> {
        GameDate::new(self.world.start_year, self.world.start_month)
    }

    /// Runtime settings for [`TurnDaemon`](crate::daemon::TurnDaemon).
    pub const fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            turn_term_minutes: self.world.turn_term_minutes,
            budget: self.budget.run_budget(),
            failure_backoff: Duration::from_millis(self.daemon.failure_backoff_ms),
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Minutes between world-turn boundaries.
    #[serde(default = "default_turn_term_minutes")]
    pub turn_term_minutes: u32,

    /// Last turn time of a fresh world. Defaults to the time of first boot.
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,

    /// Game year of a fresh world.
    #[serde(default = "default_start_year")]
    pub start_year: u32,

    /// Game month of a fresh world.
    #[serde(default = "default_start_month")]
    pub start_month: u8,

    /// Number of generals seeded into a fresh world.
    #[serde(default)]
    pub generals: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            turn_term_minutes: default_turn_term_minutes(),
            start_time: None,
            start_year: default_start_year(),
            start_month: default_start_month(),
            generals: 0,
        }
    }
}

/// Run loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DaemonSettings {
    /// Enqueue `Start` as soon as the daemon is up.
    #[serde(default)]
    pub autostart: bool,

    /// Delay before retrying a failed cycle, in milliseconds.
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            autostart: false,
            failure_backoff_ms: default_failure_backoff_ms(),
        }
    }
}

/// Per-cycle work budget. Absent fields are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BudgetConfig {
    /// Maximum general-turns plus world-turns per cycle.
    #[serde(default = "default_max_units")]
    pub max_units: Option<u32>,

    /// Maximum wall-clock milliseconds per cycle.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: Option<u64>,
}

impl BudgetConfig {
    /// Convert to the runtime [`RunBudget`].
    pub const fn run_budget(&self) -> RunBudget {
        RunBudget {
            max_units: self.max_units,
            max_duration: match self.max_duration_ms {
                Some(ms) => Some(Duration::from_millis(ms)),
                None => None,
            },
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_units: default_max_units(),
            max_duration_ms: default_max_duration_ms(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot file. `null` keeps state in memory only.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WARLORD_SNAPSHOT_PATH") {
            self.snapshot_path = Some(PathBuf::from(val));
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_world_name() -> String {
    "warlord".to_owned()
}

const fn default_turn_term_minutes() -> u32 {
    60
}

const fn default_start_year() -> u32 {
    184
}

const fn default_start_month() -> u8 {
    1
}

const fn default_failure_backoff_ms() -> u64 {
    5_000
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_units() -> Option<u32> {
    Some(500)
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_duration_ms() -> Option<u64> {
    Some(20_000)
}

fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from("warlord-state.json"))
}

fn default_log_level() -> String {
    "info".to_owned()
}
