use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    alarm::DEFAULT_LABEL,
    error::ConfigError,
    notify::SoundCue,
    scheduler::{DEFAULT_POLL_INTERVAL, MAX_POLL_INTERVAL},
};

/// Settings read from `config.toml`. Alarms themselves are not stored, they only live for a session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// chrono format string for the clock display
    pub time_format: String,
    pub poll_interval_secs: u64,
    pub default_label: String,
    pub sound: SoundCue,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%Y-%m-%d %H:%M:%S".to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            default_label: DEFAULT_LABEL.to_string(),
            sound: SoundCue::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// if the file can't be read or isn't valid toml
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&config)?)
    }

    /// Like [`Config::load`] but a missing file just means default settings.
    ///
    /// # Errors
    /// if the file exists but can't be read or parsed
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// # Errors
    /// if the config can't be serialized or written
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config)?;
        Ok(())
    }

    /// # Errors
    /// `ConfigError::NoConfigDir` if the user has no home directory
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = directories::ProjectDirs::from("", "", "roosty_alarm")
            .ok_or(ConfigError::NoConfigDir)?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().is_ok_and(|path| path.exists())
    }

    /// # Errors
    /// `ConfigError::PollInterval` unless the interval is between 1 and 60 seconds
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        let interval = Duration::from_secs(self.poll_interval_secs);
        if interval.is_zero() || interval > MAX_POLL_INTERVAL {
            return Err(ConfigError::PollInterval(interval));
        }
        Ok(interval)
    }
}
