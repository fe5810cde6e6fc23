use std::{
    io::{self, BufRead, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use chrono::format::{Item, StrftimeItems};
use log::{debug, warn};

use crate::{
    alarm::Alarm,
    clock::ClockSource,
    command::{Command, HELP},
    communication::{Event, TriggerEvent},
    error::ParseCommandError,
    AlarmClock,
};

/// how often the shell looks at the event queue while nobody types
const REFRESH: Duration = Duration::from_millis(100);

/// Reads commands line by line, forwards them to the engine and prints whatever the engine reports.
pub struct Shell<'a, W> {
    alarms: &'a AlarmClock,
    clock: &'a dyn ClockSource,
    time_format: &'a str,
    out: W,
}

impl<'a, W: Write> Shell<'a, W> {
    pub fn new(
        alarms: &'a AlarmClock,
        clock: &'a dyn ClockSource,
        time_format: &'a str,
        out: W,
    ) -> Self {
        Self {
            alarms,
            clock,
            time_format,
            out,
        }
    }

    /// Runs until `quit` or the end of `input`.
    /// Input is read on its own thread so triggers are shown while waiting for the user.
    ///
    /// # Errors
    /// if writing to the output fails
    pub fn run<R>(&mut self, input: R, events: &Receiver<Event>) -> io::Result<()>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, lines) = mpsc::channel();
        thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                for line in input.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!("couldn't read input: {e}");
                            break;
                        }
                    };
                    if sender.send(line).is_err() {
                        break;
                    }
                }
            })?;
        writeln!(self.out, "roosty alarm, type `help` for commands")?;
        loop {
            self.drain(events)?;
            match lines.recv_timeout(REFRESH) {
                Ok(line) => match line.parse() {
                    Ok(command) => {
                        if !self.execute(command)? {
                            break;
                        }
                    }
                    Err(ParseCommandError::Empty) => {}
                    Err(e) => writeln!(self.out, "{e}")?,
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("input closed");
                    break;
                }
            }
        }
        self.drain(events)?;
        self.out.flush()
    }

    fn drain(&mut self, events: &Receiver<Event>) -> io::Result<()> {
        for event in events.try_iter() {
            self.render(&event)?;
        }
        self.out.flush()
    }

    /// Carries out one command, returns false when the shell should exit.
    ///
    /// # Errors
    /// if writing to the output fails
    pub fn execute(&mut self, command: Command) -> io::Result<bool> {
        match command {
            Command::Add(spec) => match self.alarms.add(&spec) {
                Ok(_) => writeln!(
                    self.out,
                    "Alarm set for {:02}:{:02} ({})",
                    spec.hour, spec.minute, spec.recurrence
                )?,
                Err(e) => writeln!(self.out, "{e}")?,
            },
            Command::Delete(id) => {
                if self.alarms.delete_alarm(id) {
                    writeln!(self.out, "Alarm deleted")?;
                } else {
                    writeln!(self.out, "No active alarm #{id}")?;
                }
            }
            Command::StopAll => {
                self.alarms.stop_all();
                writeln!(self.out, "All alarms have been deactivated")?;
            }
            Command::List => {
                let alarms = self.alarms.snapshot();
                self.render_list(&alarms)?;
            }
            Command::Time => self.render_time()?,
            Command::TestSound => match self.alarms.test_sound() {
                Ok(()) => writeln!(self.out, "Playing alarm sound...")?,
                Err(e) => writeln!(self.out, "Could not play sound: {e}")?,
            },
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// # Errors
    /// if writing to the output fails
    pub fn render(&mut self, event: &Event) -> io::Result<()> {
        match event {
            Event::Triggered(trigger) => self.render_trigger(trigger),
            Event::ListChanged(alarms) => self.render_list(alarms),
        }
    }

    fn render_trigger(&mut self, event: &TriggerEvent) -> io::Result<()> {
        writeln!(
            self.out,
            "ALARM! {}\nTime: {}\nType: {}",
            event.label,
            event.time_string(),
            event.recurrence
        )
    }

    fn render_list(&mut self, alarms: &[Alarm]) -> io::Result<()> {
        writeln!(self.out, "Active Alarms")?;
        if alarms.is_empty() {
            return writeln!(self.out, "  (none)");
        }
        writeln!(self.out, "{:<5} {:<6} {:<7} Label", "ID", "Time", "Type")?;
        for alarm in alarms {
            writeln!(self.out, "{alarm}")?;
        }
        Ok(())
    }

    fn render_time(&mut self) -> io::Result<()> {
        // chrono only reports a bad format string when it is displayed
        if StrftimeItems::new(self.time_format).any(|item| matches!(item, Item::Error)) {
            return writeln!(self.out, "invalid time_format `{}`", self.time_format);
        }
        let now = self.clock.now();
        writeln!(self.out, "{}", now.format(self.time_format))
    }
}
