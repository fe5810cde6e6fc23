#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc,
};

use log::{info, warn};

pub mod alarm;
pub mod clock;
pub mod command;
pub mod communication;
pub mod config;
pub mod error;
/// the decision of whether an alarm rings on a tick
pub mod evaluator;
pub mod notify;
pub mod registry;
pub mod scheduler;
/// line driven terminal front end
pub mod shell;

pub use alarm::{Alarm, AlarmId, AlarmSpec, Recurrence};
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use communication::{Event, TriggerEvent};
pub use config::Config;
pub use error::{AlarmError, ConfigError, SinkError, TickError, TimeField};
pub use registry::Registry;
pub use scheduler::{Scheduler, Tick, Watcher};

/// The engine the shell talks to.
/// Owns the registry and the watcher threads and keeps the two in step.
pub struct AlarmClock {
    registry: Registry,
    scheduler: Scheduler,
    events: Sender<Event>,
    sink: Arc<dyn notify::NotificationSink>,
    cue: notify::SoundCue,
}

impl AlarmClock {
    /// Builds the engine and the queue the shell should drain for triggers and list changes.
    ///
    /// # Errors
    /// `ConfigError::PollInterval` if the configured interval is out of range
    pub fn new(
        config: &Config,
        clock: Arc<dyn ClockSource>,
        sink: Arc<dyn notify::NotificationSink>,
    ) -> Result<(Self, Receiver<Event>), ConfigError> {
        let poll_interval = config.poll_interval()?;
        Self::with_poll_interval(config, poll_interval, clock, sink)
    }

    /// Like [`AlarmClock::new`] but with an explicit interval, sub-second ones included.
    ///
    /// # Errors
    /// `ConfigError::PollInterval` if the interval is zero or over a minute
    pub fn with_poll_interval(
        config: &Config,
        poll_interval: std::time::Duration,
        clock: Arc<dyn ClockSource>,
        sink: Arc<dyn notify::NotificationSink>,
    ) -> Result<(Self, Receiver<Event>), ConfigError> {
        let (events, receiver) = mpsc::channel();
        let registry = Registry::new(&config.default_label);
        let publisher =
            communication::Publisher::new(events.clone(), Arc::clone(&sink), config.sound.clone());
        let scheduler = Scheduler::new(poll_interval, registry.clone(), clock, publisher)?;
        Ok((
            Self {
                registry,
                scheduler,
                events,
                sink,
                cue: config.sound.clone(),
            },
            receiver,
        ))
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn list_changed(&self) {
        // nobody listening is fine, e.g. a headless test
        let _ = self.events.send(Event::ListChanged(self.registry.snapshot()));
    }

    /// Adds an alarm and starts watching it.
    ///
    /// # Errors
    /// `AlarmError::InvalidTime` for an out of range time (nothing is added),
    /// `AlarmError::Spawn` if no watcher thread could be started (the alarm is deactivated again)
    pub fn add_alarm(
        &self,
        hour: u8,
        minute: u8,
        recurrence: Recurrence,
        label: &str,
    ) -> Result<AlarmId, AlarmError> {
        let alarm = self.registry.add(hour, minute, recurrence, label)?;
        if let Err(e) = self.scheduler.spawn(alarm.id) {
            self.registry.deactivate(alarm.id);
            return Err(e);
        }
        self.list_changed();
        Ok(alarm.id)
    }

    /// # Errors
    /// see [`AlarmClock::add_alarm`]
    pub fn add(&self, spec: &AlarmSpec) -> Result<AlarmId, AlarmError> {
        let hour = TimeField::Hour.check(spec.hour)?;
        let minute = TimeField::Minute.check(spec.minute)?;
        self.add_alarm(hour, minute, spec.recurrence, &spec.label)
    }

    /// Deletes (deactivates) an alarm and stops its watcher and sound.
    /// Unknown or already deleted ids are ignored, returns whether anything changed.
    pub fn delete_alarm(&self, id: AlarmId) -> bool {
        let changed = self.registry.deactivate(id);
        self.scheduler.cancel(id);
        if let Err(e) = self.sink.stop(id) {
            warn!("couldn't stop the sound of alarm {id}: {e}");
        }
        if changed {
            self.list_changed();
        }
        changed
    }

    /// Deactivates every alarm, stops all watchers and silences anything still ringing.
    pub fn stop_all(&self) {
        let stopped = self.registry.deactivate_all();
        self.scheduler.cancel_all();
        if let Err(e) = self.sink.silence() {
            warn!("couldn't silence alarms: {e}");
        }
        info!("stopped {} alarms", stopped.len());
        self.list_changed();
    }

    /// The active alarms, in the order they were added.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Alarm> {
        self.registry.snapshot()
    }

    /// Plays the alarm sound without an alarm.
    ///
    /// # Errors
    /// if the sink can't play it
    pub fn test_sound(&self) -> Result<(), SinkError> {
        self.sink.play(None, &self.cue)
    }
}
