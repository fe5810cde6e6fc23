use std::sync::{mpsc::Sender, Arc};

use chrono::NaiveDateTime;
use log::info;

use crate::{
    alarm::{Alarm, AlarmId, Recurrence},
    error::TickError,
    notify::{NotificationSink, SoundCue},
};

/// Immutable record of an alarm going off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub alarm_id: AlarmId,
    pub label: String,
    pub hour: u8,
    pub minute: u8,
    pub recurrence: Recurrence,
    pub fired_at: NaiveDateTime,
}

impl TriggerEvent {
    #[must_use]
    pub fn new(alarm: &Alarm, fired_at: NaiveDateTime) -> Self {
        Self {
            alarm_id: alarm.id,
            label: alarm.label.clone(),
            hour: alarm.hour,
            minute: alarm.minute,
            recurrence: alarm.recurrence,
            fired_at,
        }
    }

    #[must_use]
    pub fn time_string(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// What the core tells the shell, drained by the shell whenever it likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Triggered(TriggerEvent),
    /// the active alarms after something changed
    ListChanged(Vec<Alarm>),
}

/// messages for the thread that owns the audio output
#[derive(Debug)]
pub struct Message {
    pub kind: MessageType,
    /// `None` for sounds not tied to an alarm (testing the sound)
    pub alarm_id: Option<AlarmId>,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: Option<AlarmId>) -> Self {
        Self { kind, alarm_id }
    }
}

#[derive(Debug, Clone)]
pub enum MessageType {
    Play(SoundCue),
    // the alarm was deleted or the user stopped it
    Stop,
    StopAll,
}

/// Fans a trigger out to the shell's event queue and the notification sink.
/// Never waits on either of them.
#[derive(Clone)]
pub struct Publisher {
    events: Sender<Event>,
    sink: Arc<dyn NotificationSink>,
    cue: SoundCue,
}

impl Publisher {
    #[must_use]
    pub fn new(events: Sender<Event>, sink: Arc<dyn NotificationSink>, cue: SoundCue) -> Self {
        Self { events, sink, cue }
    }

    /// Tells the shell the list changed.
    ///
    /// # Errors
    /// `TickError::QueueClosed` if the shell dropped its receiver.
    pub fn list_changed(&self, alarms: Vec<Alarm>) -> Result<(), TickError> {
        self.events
            .send(Event::ListChanged(alarms))
            .map_err(|_| TickError::QueueClosed)
    }

    /// Publishes a trigger.
    /// The queue is written before the sink is called so a broken sink doesn't lose events.
    ///
    /// # Errors
    /// The first thing that failed, every step is still attempted.
    pub fn trigger(&self, event: TriggerEvent, alarms: Vec<Alarm>) -> Result<(), TickError> {
        info!(
            "ALARM TRIGGERED: {} at {}",
            event.label,
            event.time_string()
        );
        let queued = self
            .events
            .send(Event::Triggered(event.clone()))
            .map_err(|_| TickError::QueueClosed)
            .and(self.list_changed(alarms));
        let shown = self.sink.show_alert(&event);
        let played = self.sink.play(Some(event.alarm_id), &self.cue);
        queued.and(shown.map_err(TickError::from)).and(played.map_err(TickError::from))
    }
}
