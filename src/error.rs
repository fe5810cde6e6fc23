use std::{fmt, io, time::Duration};

use thiserror::Error;

use crate::alarm::AlarmId;

/// which part of the time of day was out of range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Hour,
    Minute,
}

impl TimeField {
    #[must_use]
    pub const fn max(self) -> u8 {
        match self {
            Self::Hour => 23,
            Self::Minute => 59,
        }
    }

    /// Narrows a parsed value to the field's range.
    ///
    /// # Errors
    /// `AlarmError::InvalidTime` naming this field if `value` is past its maximum
    pub fn check(self, value: u16) -> Result<u8, AlarmError> {
        u8::try_from(value)
            .ok()
            .filter(|value| *value <= self.max())
            .ok_or(AlarmError::InvalidTime {
                field: self,
                value,
                max: self.max(),
            })
    }
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hour => "hour",
            Self::Minute => "minute",
        })
    }
}

/// Errors returned to whoever asked for an alarm to be created.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlarmError {
    #[error("invalid time: {field} must be between 0 and {max}, got {value}")]
    InvalidTime { field: TimeField, value: u16, max: u8 },

    #[error("couldn't start watcher for alarm {id}: {reason}")]
    Spawn { id: AlarmId, reason: String },
}

/// Errors from the notification side, i.e. the audio thread.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("sound thread is not running")]
    Disconnected,

    #[error("audio output unavailable: {0}")]
    Audio(String),
}

/// Something went wrong during a single watcher tick.
/// These are logged by the watcher and never stop it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TickError {
    #[error("notification failed: {0}")]
    Sink(#[from] SinkError),

    #[error("event queue closed")]
    QueueClosed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't find a config directory for this user")]
    NoConfigDir,

    #[error("couldn't access config file: {0}")]
    Io(#[from] io::Error),

    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("poll interval must be more than zero and at most 60 seconds, got {0:?}")]
    PollInterval(Duration),
}

/// Text from the shell or the command line that isn't a valid command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}` (try `help`)")]
    UnknownCommand(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("`{0}` is not a time, expected HH:MM")]
    Time(String),

    #[error("`{0}` is not an alarm id")]
    Id(String),

    #[error("`{0}` is not a recurrence, expected once, daily or hourly")]
    Recurrence(String),
}
