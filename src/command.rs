use std::str::FromStr;

use crate::{
    alarm::{AlarmId, AlarmSpec},
    error::ParseCommandError,
};

pub const HELP: &str = "\
commands:
  add HH:MM [once|daily|hourly] [label]   set a new alarm (daily if not given)
  delete ID                               delete an alarm
  stop                                    deactivate every alarm and silence them
  list                                    show the active alarms
  time                                    show the current date and time
  test-sound                              play the alarm sound
  help                                    show this message
  quit                                    exit";

/// A line typed into the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(AlarmSpec),
    Delete(AlarmId),
    StopAll,
    List,
    Time,
    TestSound,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let name = words.next().ok_or(ParseCommandError::Empty)?;
        let command = match name.to_ascii_lowercase().as_str() {
            "add" | "new" => Self::Add(AlarmSpec::from_words(words)?),
            "delete" | "del" | "rm" => Self::Delete(
                words
                    .next()
                    .ok_or(ParseCommandError::Missing("alarm id"))?
                    .parse()?,
            ),
            "stop" | "stop-all" => Self::StopAll,
            "list" | "ls" => Self::List,
            "time" | "now" => Self::Time,
            "test-sound" | "test" => Self::TestSound,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return Err(ParseCommandError::UnknownCommand(name.to_string())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::alarm::Recurrence;

    #[test]
    fn add_with_label() {
        assert_eq!(
            "add 07:30 daily Wake up".parse(),
            Ok(Command::Add(AlarmSpec {
                hour: 7,
                minute: 30,
                recurrence: Recurrence::Daily,
                label: "Wake up".to_string(),
            }))
        );
    }

    #[test]
    fn delete_by_id() {
        let command: Command = "delete #12".parse().unwrap();
        let Command::Delete(id) = command else {
            panic!("expected delete, got {command:?}");
        };
        assert_eq!(id.get(), 12);
    }

    #[test_case("stop", Command::StopAll)]
    #[test_case("  LIST ", Command::List)]
    #[test_case("time", Command::Time)]
    #[test_case("test-sound", Command::TestSound)]
    #[test_case("help", Command::Help)]
    #[test_case("quit", Command::Quit)]
    fn simple_commands(text: &str, expected: Command) {
        assert_eq!(text.parse(), Ok(expected));
    }

    #[test_case("", ParseCommandError::Empty ; "empty")]
    #[test_case("snooze", ParseCommandError::UnknownCommand("snooze".to_string()) ; "unknown")]
    #[test_case("delete", ParseCommandError::Missing("alarm id") ; "delete without id")]
    #[test_case("delete seven", ParseCommandError::Id("seven".to_string()) ; "delete with bad id")]
    #[test_case("add", ParseCommandError::Missing("time") ; "add without time")]
    #[test_case("add 7.30", ParseCommandError::Time("7.30".to_string()) ; "add with bad time")]
    fn rejects(text: &str, expected: ParseCommandError) {
        assert_eq!(text.parse::<Command>(), Err(expected));
    }
}
