//! The notification side: playing the alarm sound and showing alerts.

use std::{
    collections::HashMap,
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::{
    alarm::AlarmId,
    communication::{Message, MessageType, TriggerEvent},
    error::SinkError,
};

/// Receives triggers from watchers.
/// May be called from several watchers at once and must not block them.
pub trait NotificationSink: Send + Sync {
    /// # Errors
    /// if the sound can't be handed to whatever plays it
    fn play(&self, alarm: Option<AlarmId>, cue: &SoundCue) -> Result<(), SinkError>;

    /// # Errors
    /// if the alert can't be shown
    fn show_alert(&self, event: &TriggerEvent) -> Result<(), SinkError>;

    /// Stops the sound of one alarm, used when it gets deleted while ringing.
    ///
    /// # Errors
    /// if the player can't be reached
    fn stop(&self, _alarm: AlarmId) -> Result<(), SinkError> {
        Ok(())
    }

    /// Stops every sound that is still playing.
    ///
    /// # Errors
    /// if the player can't be reached
    fn silence(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// The tone played when an alarm goes off.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SoundCue {
    pub frequency_hz: f32,
    /// length of one beep
    pub tone_ms: u64,
    pub repeats: u32,
    /// percent, 0 to 100
    pub volume: f32,
}

impl Default for SoundCue {
    fn default() -> Self {
        Self {
            frequency_hz: 800.0,
            tone_ms: 1000,
            repeats: 3,
            volume: 100.0,
        }
    }
}

impl SoundCue {
    #[must_use]
    pub const fn tone(&self) -> Duration {
        Duration::from_millis(self.tone_ms)
    }

    /// how long the whole cue takes to play
    #[must_use]
    pub fn length(&self) -> Duration {
        self.tone() * self.repeats
    }
}

/// Handle to the thread that owns the audio output.
/// Overlapping alarms each get their own voice, so they mix instead of queueing.
#[derive(Debug, Clone)]
pub struct SoundPlayer {
    sender: Sender<Message>,
}

impl SoundPlayer {
    /// Starts the audio thread.
    ///
    /// # Errors
    /// if the thread can't be spawned
    pub fn spawn() -> Result<Self, SinkError> {
        let (sender, receiver) = mpsc::channel::<Message>();
        thread::Builder::new()
            .name("sound".to_string())
            .spawn(move || {
                let mut output = match backend::Output::open() {
                    Ok(output) => output,
                    Err(e) => {
                        error!("{e}, alarms will be silent");
                        return;
                    }
                };
                loop {
                    match receiver.recv_timeout(output.wake_interval()) {
                        Ok(Message {
                            kind: MessageType::Play(cue),
                            alarm_id,
                        }) => {
                            debug!("playing cue for {alarm_id:?}");
                            output.play(alarm_id, &cue);
                        }
                        Ok(Message {
                            kind: MessageType::Stop,
                            alarm_id,
                        }) => output.stop(alarm_id),
                        Ok(Message {
                            kind: MessageType::StopAll,
                            ..
                        }) => output.stop_all(),
                        Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    output.idle();
                }
                debug!("sound thread finished");
            })
            .map_err(|e| SinkError::Audio(e.to_string()))?;
        Ok(Self { sender })
    }

    fn send(&self, kind: MessageType, alarm_id: Option<AlarmId>) -> Result<(), SinkError> {
        self.sender
            .send(Message::new(kind, alarm_id))
            .map_err(|_| SinkError::Disconnected)
    }

    /// # Errors
    /// `SinkError::Disconnected` if the audio thread has stopped
    pub fn play(&self, alarm_id: Option<AlarmId>, cue: &SoundCue) -> Result<(), SinkError> {
        self.send(MessageType::Play(cue.clone()), alarm_id)
    }

    /// # Errors
    /// `SinkError::Disconnected` if the audio thread has stopped
    pub fn stop(&self, alarm_id: AlarmId) -> Result<(), SinkError> {
        self.send(MessageType::Stop, Some(alarm_id))
    }

    /// # Errors
    /// `SinkError::Disconnected` if the audio thread has stopped
    pub fn stop_all(&self) -> Result<(), SinkError> {
        self.send(MessageType::StopAll, None)
    }
}

/// Plays the cue on the audio thread and logs the alert, the shell draws the alert itself.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    player: SoundPlayer,
}

impl DesktopNotifier {
    #[must_use]
    pub const fn new(player: SoundPlayer) -> Self {
        Self { player }
    }
}

impl NotificationSink for DesktopNotifier {
    fn play(&self, alarm: Option<AlarmId>, cue: &SoundCue) -> Result<(), SinkError> {
        self.player.play(alarm, cue)
    }

    fn show_alert(&self, event: &TriggerEvent) -> Result<(), SinkError> {
        info!(
            "alert for alarm {}: {} ({} at {})",
            event.alarm_id,
            event.label,
            event.recurrence,
            event.time_string()
        );
        Ok(())
    }

    fn stop(&self, alarm: AlarmId) -> Result<(), SinkError> {
        self.player.stop(alarm)
    }

    fn silence(&self) -> Result<(), SinkError> {
        self.player.stop_all()
    }
}

#[cfg(feature = "sound")]
mod backend {
    use rodio::{source::SineWave, OutputStream, OutputStreamBuilder, Sink, Source};

    use super::{AlarmId, Duration, HashMap, SinkError, SoundCue};

    /// one sink per alarm, the output stream mixes them
    pub(super) struct Output {
        stream: OutputStream,
        sinks: HashMap<Option<AlarmId>, Sink>,
    }

    impl Output {
        pub(super) fn open() -> Result<Self, SinkError> {
            let stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| SinkError::Audio(e.to_string()))?;
            Ok(Self {
                stream,
                sinks: HashMap::new(),
            })
        }

        pub(super) const fn wake_interval(&self) -> Duration {
            Duration::from_millis(100)
        }

        pub(super) fn play(&mut self, alarm_id: Option<AlarmId>, cue: &SoundCue) {
            let sink = Sink::connect_new(self.stream.mixer());
            sink.set_volume(cue.volume / 100.0);
            for _ in 0..cue.repeats {
                sink.append(SineWave::new(cue.frequency_hz).take_duration(cue.tone()));
            }
            sink.play();
            // replacing a sink drops it which stops whatever it was still playing
            self.sinks.insert(alarm_id, sink);
        }

        pub(super) fn stop(&mut self, alarm_id: Option<AlarmId>) {
            if let Some(sink) = self.sinks.remove(&alarm_id) {
                sink.stop();
            }
        }

        pub(super) fn stop_all(&mut self) {
            for (_, sink) in self.sinks.drain() {
                sink.stop();
            }
        }

        pub(super) fn idle(&mut self) {
            self.sinks.retain(|_, sink| !sink.empty());
        }
    }
}

#[cfg(not(feature = "sound"))]
mod backend {
    use std::{io::Write, time::Instant};

    use log::warn;

    use super::{AlarmId, Duration, HashMap, SinkError, SoundCue};

    /// Without an audio device we ring the terminal bell, once per repeat of the cue.
    /// All ringing alarms share one bell, it rings at most once per tone length.
    pub(super) struct Output {
        pending: HashMap<Option<AlarmId>, u32>,
        interval: Duration,
        last_ring: Option<Instant>,
    }

    impl Output {
        #[allow(clippy::unnecessary_wraps)]
        pub(super) fn open() -> Result<Self, SinkError> {
            Ok(Self {
                pending: HashMap::new(),
                interval: SoundCue::default().tone(),
                last_ring: None,
            })
        }

        pub(super) fn wake_interval(&self) -> Duration {
            match self.last_ring {
                Some(last) if !self.pending.is_empty() => self
                    .interval
                    .saturating_sub(last.elapsed())
                    .max(Duration::from_millis(10)),
                _ => self.interval,
            }
        }

        pub(super) fn play(&mut self, alarm_id: Option<AlarmId>, cue: &SoundCue) {
            if cue.repeats == 0 {
                return;
            }
            self.interval = cue.tone().max(Duration::from_millis(100));
            self.pending.insert(alarm_id, cue.repeats);
        }

        pub(super) fn stop(&mut self, alarm_id: Option<AlarmId>) {
            self.pending.remove(&alarm_id);
        }

        pub(super) fn stop_all(&mut self) {
            self.pending.clear();
        }

        pub(super) fn idle(&mut self) {
            if self.pending.is_empty() {
                return;
            }
            if self
                .last_ring
                .is_some_and(|last| last.elapsed() < self.interval)
            {
                return;
            }
            let mut stderr = std::io::stderr();
            if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
                warn!("couldn't ring the bell: {e}");
            }
            self.last_ring = Some(Instant::now());
            self.pending.retain(|_, left| {
                *left = left.saturating_sub(1);
                *left > 0
            });
        }

        #[cfg(test)]
        pub(super) fn repeats_left(&self, alarm_id: Option<AlarmId>) -> Option<u32> {
            self.pending.get(&alarm_id).copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cue_is_three_one_second_beeps() {
        let cue = SoundCue::default();
        assert!((cue.frequency_hz - 800.0).abs() < f32::EPSILON);
        assert_eq!(cue.length(), Duration::from_secs(3));
    }

    // with real audio the thread exits when there is no output device
    #[cfg(not(feature = "sound"))]
    #[test]
    fn player_accepts_messages() {
        let player = SoundPlayer::spawn().unwrap();
        let cue = SoundCue {
            repeats: 0,
            ..SoundCue::default()
        };
        assert_eq!(player.play(None, &cue), Ok(()));
        assert_eq!(player.stop_all(), Ok(()));
    }

    #[cfg(not(feature = "sound"))]
    #[test]
    fn bell_keeps_its_pace_when_alarms_fire_together() {
        let mut output = backend::Output::open().unwrap();
        let cue = SoundCue {
            tone_ms: 60_000,
            ..SoundCue::default()
        };
        let (first, second) = (Some(AlarmId::next()), Some(AlarmId::next()));
        output.play(first, &cue);
        output.idle();
        output.play(second, &cue);
        output.idle();
        output.idle();
        // only the first idle rang, the rest came within the same tone
        assert_eq!(output.repeats_left(first), Some(2));
        assert_eq!(output.repeats_left(second), Some(3));
    }
}
