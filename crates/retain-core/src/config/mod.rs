//! Configuration
//!
//! TOML file with every field optional:
//!
//! ```toml
//! data_dir = "/home/me/.retain"
//! event_capacity = 64
//! default_deck = "spanish"
//!
//! [scheduler]
//! steps_minutes = [1.0, 10.0]
//! graduating_interval_days = 1.0
//! easy_interval_days = 4.0
//! ```
//!
//! Lookup order: explicit path, then `RETAIN_CONFIG`, then `config.toml` in
//! the platform config directory. `RETAIN_DATA_DIR` overrides `data_dir`.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scheduler::{LearningLadder, Scheduler, SchedulerError};
use crate::session::DEFAULT_EVENT_CAPACITY;
use crate::storage::DATABASE_FILE;

/// Config file name inside the platform config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "RETAIN_CONFIG";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "RETAIN_DATA_DIR";

/// Config error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid scheduler settings: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("Failed to render config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config error: {0}")]
    Init(String),
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetainConfig {
    /// Where the database lives; platform data directory when unset
    pub data_dir: Option<PathBuf>,
    /// Deck used when a command is not given one
    pub default_deck: Option<String>,
    /// Capacity of the session event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Learning ladder
    pub scheduler: LearningLadder,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for RetainConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_deck: None,
            event_capacity: default_event_capacity(),
            scheduler: LearningLadder::default(),
        }
    }
}

impl RetainConfig {
    /// Load using the process environment
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Load with a custom environment lookup
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));

        let mut config = match named {
            // A file the user pointed at must exist
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        if let Some(dir) = env(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    /// Read and validate a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        if self.event_capacity == 0 {
            return Err(ConfigError::Init(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective settings as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Database file path, `None` to let the store pick its platform default
    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DATABASE_FILE))
    }

    /// Scheduler for the configured ladder
    pub fn build_scheduler(&self) -> Result<Scheduler, ConfigError> {
        Ok(Scheduler::new(self.scheduler.clone())?)
    }
}

/// `config.toml` in the platform config directory
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "retain", "retain").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
