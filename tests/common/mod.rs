#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc::{self, Receiver},
    Arc, Mutex,
};

use chrono::{NaiveDate, NaiveDateTime};
use roosty_alarm::{
    communication::Publisher,
    notify::{NotificationSink, SoundCue},
    AlarmId, Event, ManualClock, Registry, SinkError, TriggerEvent, Watcher,
};

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// remembers every alert it was asked to show
#[derive(Default)]
pub struct RecordingSink {
    pub alerts: Mutex<Vec<TriggerEvent>>,
    pub plays: AtomicUsize,
    pub silenced: AtomicUsize,
}

impl NotificationSink for RecordingSink {
    fn play(&self, _alarm: Option<AlarmId>, _cue: &SoundCue) -> Result<(), SinkError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn show_alert(&self, event: &TriggerEvent) -> Result<(), SinkError> {
        self.alerts.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn silence(&self) -> Result<(), SinkError> {
        self.silenced.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// a sink whose audio device is permanently gone
pub struct BrokenSink;

impl NotificationSink for BrokenSink {
    fn play(&self, _alarm: Option<AlarmId>, _cue: &SoundCue) -> Result<(), SinkError> {
        Err(SinkError::Disconnected)
    }

    fn show_alert(&self, _event: &TriggerEvent) -> Result<(), SinkError> {
        Err(SinkError::Audio("no display".to_string()))
    }
}

/// registry, clock and event queue wired together without any threads
pub struct Bench {
    pub registry: Registry,
    pub clock: ManualClock,
    pub publisher: Publisher,
    pub events: Receiver<Event>,
}

impl Bench {
    pub fn new(now: NaiveDateTime, sink: Arc<dyn NotificationSink>) -> Self {
        let (sender, events) = mpsc::channel();
        Self {
            registry: Registry::default(),
            clock: ManualClock::new(now),
            publisher: Publisher::new(sender, sink, SoundCue::default()),
            events,
        }
    }

    pub fn watcher(&self, id: AlarmId) -> Watcher {
        Watcher::new(
            id,
            self.registry.clone(),
            Arc::new(self.clock.clone()),
            self.publisher.clone(),
        )
    }

    pub fn triggers(&self) -> Vec<TriggerEvent> {
        self.events
            .try_iter()
            .filter_map(|event| match event {
                Event::Triggered(trigger) => Some(trigger),
                Event::ListChanged(_) => None,
            })
            .collect()
    }
}
