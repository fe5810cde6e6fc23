use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::error::ParseCommandError;

/// label used when an alarm is created without one
pub const DEFAULT_LABEL: &str = "Alarm";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier of an alarm, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmId(u64);

impl AlarmId {
    /// hands out the next id, shared by every registry in the process
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AlarmId {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('#')
            .parse()
            .map(Self)
            .map_err(|_| ParseCommandError::Id(s.to_string()))
    }
}

/// How often an alarm re-arms after it rang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Recurrence {
    Once,
    #[default]
    Daily,
    /// at the alarm's minute of every hour, the hour is ignored
    Hourly,
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Hourly => "hourly",
        })
    }
}

impl FromStr for Recurrence {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "once" => Ok(Self::Once),
            "daily" => Ok(Self::Daily),
            "hourly" | "every-hour" => Ok(Self::Hourly),
            _ => Err(ParseCommandError::Recurrence(s.to_string())),
        }
    }
}

/// represents an alarm
/// contains the time of day it should go off at, how often, and a label.
/// records are never removed, deleting an alarm only clears `active`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub id: AlarmId,
    pub hour: u8,
    pub minute: u8,
    pub recurrence: Recurrence,
    pub label: String,
    pub active: bool,
    /// only used by daily alarms
    pub triggered_today: bool,
}

impl Alarm {
    pub(crate) fn new(hour: u8, minute: u8, recurrence: Recurrence, label: String) -> Self {
        Self {
            id: AlarmId::next(),
            hour,
            minute,
            recurrence,
            label,
            active: true,
            triggered_today: false,
        }
    }

    /// zero padded `HH:MM`
    #[must_use]
    pub fn time_string(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<4} {}  {:<7} {}",
            self.id,
            self.time_string(),
            self.recurrence,
            self.label
        )
    }
}

/// What the shell asks for when it wants a new alarm: `HH:MM [recurrence] [label...]`.
/// Only the syntax is checked here, ranges are checked when the alarm is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSpec {
    pub hour: u16,
    pub minute: u16,
    pub recurrence: Recurrence,
    pub label: String,
}

impl AlarmSpec {
    pub(crate) fn from_words<'a>(
        mut words: impl Iterator<Item = &'a str>,
    ) -> Result<Self, ParseCommandError> {
        let time = words.next().ok_or(ParseCommandError::Missing("time"))?;
        let (hour, minute) = time
            .split_once(':')
            .and_then(|(h, m)| Some((h.parse().ok()?, m.parse().ok()?)))
            .ok_or_else(|| ParseCommandError::Time(time.to_string()))?;
        let mut words = words.peekable();
        // the recurrence is optional, if the next word isn't one it's part of the label
        let recurrence = match words.peek().map(|word| word.parse::<Recurrence>()) {
            Some(Ok(recurrence)) => {
                words.next();
                recurrence
            }
            _ => Recurrence::default(),
        };
        let label = words.collect::<Vec<_>>().join(" ");
        Ok(Self {
            hour,
            minute,
            recurrence,
            label,
        })
    }
}

impl FromStr for AlarmSpec {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_words(s.split_whitespace())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let first = AlarmId::next();
        let second = AlarmId::next();
        assert!(second > first);
    }

    #[test_case("once", Recurrence::Once)]
    #[test_case("Daily", Recurrence::Daily)]
    #[test_case("hourly", Recurrence::Hourly)]
    #[test_case("every-hour", Recurrence::Hourly)]
    fn parses_recurrence(text: &str, expected: Recurrence) {
        assert_eq!(text.parse::<Recurrence>(), Ok(expected));
    }

    #[test]
    fn spec_with_everything() {
        let spec: AlarmSpec = "07:30 once Take out the bins".parse().unwrap();
        assert_eq!(
            spec,
            AlarmSpec {
                hour: 7,
                minute: 30,
                recurrence: Recurrence::Once,
                label: "Take out the bins".to_string(),
            }
        );
    }

    #[test]
    fn spec_defaults_to_daily_without_label() {
        let spec: AlarmSpec = "6:05".parse().unwrap();
        assert_eq!(spec.recurrence, Recurrence::Daily);
        assert_eq!(spec.label, "");
    }

    #[test]
    fn spec_label_that_isnt_a_recurrence() {
        let spec: AlarmSpec = "12:00 lunch".parse().unwrap();
        assert_eq!(spec.recurrence, Recurrence::Daily);
        assert_eq!(spec.label, "lunch");
    }

    #[test_case("" ; "empty")]
    #[test_case("730" ; "no colon")]
    #[test_case("ab:cd daily" ; "not numbers")]
    #[test_case("70000:00" ; "too big for the parser")]
    fn rejects_bad_specs(text: &str) {
        assert!(text.parse::<AlarmSpec>().is_err());
    }

    #[test]
    fn out_of_range_times_still_parse() {
        // range checks belong to the registry so the user sees which field was wrong
        let spec: AlarmSpec = "24:60".parse().unwrap();
        assert_eq!((spec.hour, spec.minute), (24, 60));
        let spec: AlarmSpec = "300:00".parse().unwrap();
        assert_eq!(spec.hour, 300);
    }

    #[test]
    fn renders_as_list_row() {
        let alarm = Alarm {
            id: AlarmId(3),
            hour: 7,
            minute: 5,
            recurrence: Recurrence::Hourly,
            label: "Stretch".to_string(),
            active: true,
            triggered_today: false,
        };
        assert_eq!(alarm.time_string(), "07:05");
        assert_eq!(alarm.to_string(), "#3    07:05  hourly  Stretch");
    }
}
