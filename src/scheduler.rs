//! One watcher thread per alarm, polling the clock and firing triggers.

use std::{
    cell::Cell,
    collections::HashMap,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{NaiveDateTime, Timelike};
use log::{debug, error, info, trace, warn};

use crate::{
    alarm::{Alarm, AlarmId},
    clock::ClockSource,
    communication::{Publisher, TriggerEvent},
    error::{AlarmError, ConfigError, TickError},
    evaluator::evaluate,
    registry::Registry,
};

/// recommended time between ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// longest interval that still sees every minute at least once
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// What happened on a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Fired(TriggerEvent),
    /// the alarm is inactive or gone, the watcher has nothing left to do
    Retired,
}

/// Evaluates a single alarm against the clock.
/// A watcher fires at most once per clock minute, however many ticks land in it.
#[derive(Clone)]
pub struct Watcher {
    id: AlarmId,
    registry: Registry,
    clock: Arc<dyn ClockSource>,
    publisher: Publisher,
    last_fired: Cell<Option<NaiveDateTime>>,
}

impl Watcher {
    #[must_use]
    pub fn new(
        id: AlarmId,
        registry: Registry,
        clock: Arc<dyn ClockSource>,
        publisher: Publisher,
    ) -> Self {
        Self {
            id,
            registry,
            clock,
            publisher,
            last_fired: Cell::new(None),
        }
    }

    /// One evaluation cycle.
    /// The record is read, evaluated and written back under the registry lock,
    /// publishing happens after the lock is released.
    ///
    /// # Errors
    /// if the trigger couldn't be published everywhere, the alarm state is updated regardless
    pub fn tick(&self) -> Result<Tick, TickError> {
        let now = self.clock.now();
        let repeat = self
            .last_fired
            .get()
            .is_some_and(|last| same_minute(last, now));
        // outer None: no such alarm, inner None: alarm is inactive
        let fired = match self
            .registry
            .update(self.id, |alarm| Self::apply(alarm, now, repeat))
        {
            Some(Some(fired)) => fired,
            _ => return Ok(Tick::Retired),
        };
        let Some(event) = fired else {
            return Ok(Tick::Idle);
        };
        self.last_fired.set(Some(now));
        self.publisher
            .trigger(event.clone(), self.registry.snapshot())?;
        Ok(Tick::Fired(event))
    }

    fn apply(alarm: &mut Alarm, now: NaiveDateTime, repeat: bool) -> Option<Option<TriggerEvent>> {
        if !alarm.active {
            return None;
        }
        let result = evaluate(
            alarm.recurrence,
            alarm.hour,
            alarm.minute,
            alarm.triggered_today,
            &now,
        );
        alarm.triggered_today = result.triggered_today;
        alarm.active = result.active;
        if result.fire && repeat {
            debug!("alarm {} already fired at {now}, skipping", alarm.id);
            return Some(None);
        }
        Some(result.fire.then(|| TriggerEvent::new(alarm, now)))
    }

    /// Ticks until told to stop or the alarm retires.
    /// The wait between ticks is a wait on the stop channel so stopping is immediate.
    fn run(self, stop: &Receiver<()>, poll_interval: Duration) {
        info!("watcher for alarm {} started", self.id);
        loop {
            match self.tick() {
                Ok(Tick::Idle) => trace!("alarm {} idle", self.id),
                Ok(Tick::Fired(event)) => info!("alarm {} fired at {}", self.id, event.fired_at),
                Ok(Tick::Retired) => break,
                Err(e) => warn!("alarm {}: tick failed: {e}", self.id),
            }
            match stop.recv_timeout(poll_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("watcher for alarm {} stopped", self.id);
    }
}

fn same_minute(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date() && a.hour() == b.hour() && a.minute() == b.minute()
}

struct WatcherHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl WatcherHandle {
    fn signal(&self) {
        // the watcher may already have retired and dropped its receiver
        let _ = self.stop.send(());
    }

    fn join(self) {
        if self.thread.thread().id() == thread::current().id() {
            return;
        }
        if self.thread.join().is_err() {
            error!("a watcher thread panicked");
        }
    }
}

/// Starts and stops watchers, addressed by alarm id.
pub struct Scheduler {
    poll_interval: Duration,
    registry: Registry,
    clock: Arc<dyn ClockSource>,
    publisher: Publisher,
    watchers: Mutex<HashMap<AlarmId, WatcherHandle>>,
}

impl Scheduler {
    /// # Errors
    /// `ConfigError::PollInterval` if the interval is zero or longer than a minute
    pub fn new(
        poll_interval: Duration,
        registry: Registry,
        clock: Arc<dyn ClockSource>,
        publisher: Publisher,
    ) -> Result<Self, ConfigError> {
        if poll_interval.is_zero() || poll_interval > MAX_POLL_INTERVAL {
            return Err(ConfigError::PollInterval(poll_interval));
        }
        Ok(Self {
            poll_interval,
            registry,
            clock,
            publisher,
            watchers: Mutex::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AlarmId, WatcherHandle>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A watcher for `id` that isn't running on its own thread, ticks are up to the caller.
    #[must_use]
    pub fn watcher(&self, id: AlarmId) -> Watcher {
        Watcher::new(
            id,
            self.registry.clone(),
            Arc::clone(&self.clock),
            self.publisher.clone(),
        )
    }

    /// Starts a watcher thread for `id`. It ticks once right away.
    ///
    /// # Errors
    /// `AlarmError::Spawn` if the OS refuses to give us a thread
    pub fn spawn(&self, id: AlarmId) -> Result<(), AlarmError> {
        let (stop, stopped) = mpsc::channel();
        let watcher = self.watcher(id);
        let poll_interval = self.poll_interval;
        let thread = thread::Builder::new()
            .name(format!("alarm-{id}"))
            .spawn(move || watcher.run(&stopped, poll_interval))
            .map_err(|e| AlarmError::Spawn {
                id,
                reason: e.to_string(),
            })?;
        let replaced = {
            let mut watchers = self.lock();
            watchers.retain(|_, handle| !handle.thread.is_finished());
            watchers.insert(id, WatcherHandle { stop, thread })
        };
        if let Some(old) = replaced {
            warn!("alarm {id} already had a watcher, stopping the old one");
            old.signal();
            old.join();
        }
        Ok(())
    }

    /// Stops the watcher for `id` and waits for it to exit.
    /// Returns false if there was no watcher.
    pub fn cancel(&self, id: AlarmId) -> bool {
        let Some(handle) = self.lock().remove(&id) else {
            debug!("no watcher running for alarm {id}");
            return false;
        };
        handle.signal();
        handle.join();
        true
    }

    /// Stops every watcher.
    pub fn cancel_all(&self) {
        let handles: Vec<_> = self.lock().drain().map(|(_, handle)| handle).collect();
        if handles.is_empty() {
            return;
        }
        info!("stopping {} watchers", handles.len());
        // signal everyone first so they wind down together
        handles.iter().for_each(WatcherHandle::signal);
        handles.into_iter().for_each(WatcherHandle::join);
    }

    /// Alarms whose watcher thread is still running.
    #[must_use]
    pub fn running(&self) -> Vec<AlarmId> {
        let mut watchers = self.lock();
        watchers.retain(|_, handle| !handle.thread.is_finished());
        let mut ids: Vec<_> = watchers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
