//! The authoritative set of alarms for this session.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, info};

use crate::{
    alarm::{Alarm, AlarmId, Recurrence, DEFAULT_LABEL},
    error::{AlarmError, TimeField},
};

/// Lock guarded collection of alarms, keyed by id.
/// Cloning gives another handle to the same collection.
///
/// Ids grow monotonically so iterating the map is insertion order.
#[derive(Debug, Clone)]
pub struct Registry {
    alarms: Arc<Mutex<BTreeMap<AlarmId, Alarm>>>,
    default_label: Arc<str>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL)
    }
}

impl Registry {
    #[must_use]
    pub fn new(default_label: &str) -> Self {
        Self {
            alarms: Arc::default(),
            default_label: Arc::from(default_label),
        }
    }

    // a panicking watcher can't leave a record half written, the fields are plain values
    fn lock(&self) -> MutexGuard<'_, BTreeMap<AlarmId, Alarm>> {
        self.alarms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates the time and stores a new active alarm.
    ///
    /// # Errors
    /// `AlarmError::InvalidTime` if hour isn't in 0..=23 or minute isn't in 0..=59,
    /// nothing is stored in that case.
    pub fn add(
        &self,
        hour: u8,
        minute: u8,
        recurrence: Recurrence,
        label: &str,
    ) -> Result<Alarm, AlarmError> {
        let hour = TimeField::Hour.check(hour.into())?;
        let minute = TimeField::Minute.check(minute.into())?;
        let label = match label.trim() {
            "" => self.default_label.to_string(),
            label => label.to_string(),
        };
        let alarm = Alarm::new(hour, minute, recurrence, label);
        info!(
            "added alarm {} at {} ({})",
            alarm.id,
            alarm.time_string(),
            alarm.recurrence
        );
        self.lock().insert(alarm.id, alarm.clone());
        Ok(alarm)
    }

    /// Turns an alarm off. Returns false if it was unknown or already off.
    pub fn deactivate(&self, id: AlarmId) -> bool {
        match self.lock().get_mut(&id) {
            Some(alarm) if alarm.active => {
                alarm.active = false;
                info!("deactivated alarm {id}");
                true
            }
            Some(_) => {
                debug!("alarm {id} is already inactive");
                false
            }
            None => {
                debug!("no alarm with id {id}, nothing to deactivate");
                false
            }
        }
    }

    /// Turns every alarm off, returning the ids that were still active.
    pub fn deactivate_all(&self) -> Vec<AlarmId> {
        let stopped: Vec<_> = self
            .lock()
            .values_mut()
            .filter(|alarm| alarm.active)
            .map(|alarm| {
                alarm.active = false;
                alarm.id
            })
            .collect();
        info!("deactivated {} alarms", stopped.len());
        stopped
    }

    /// The active alarms in the order they were added.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Alarm> {
        self.lock()
            .values()
            .filter(|alarm| alarm.active)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: AlarmId) -> Option<Alarm> {
        self.lock().get(&id).cloned()
    }

    /// number of records, deactivated ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Runs `f` on the record while holding the lock,
    /// so a read-evaluate-write can't interleave with a deactivation.
    pub(crate) fn update<R>(&self, id: AlarmId, f: impl FnOnce(&mut Alarm) -> R) -> Option<R> {
        self.lock().get_mut(&id).map(f)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test]
    fn add_shows_up_in_snapshot() {
        let registry = Registry::default();
        let alarm = registry.add(7, 30, Recurrence::Daily, "Wake").unwrap();
        assert!(alarm.active);
        assert!(!alarm.triggered_today);
        assert_eq!(registry.snapshot(), vec![alarm]);
    }

    #[test_case(24, 0, TimeField::Hour, 24 ; "hour 24")]
    #[test_case(0, 60, TimeField::Minute, 60 ; "minute 60")]
    #[test_case(255, 255, TimeField::Hour, 255 ; "hour checked first")]
    fn rejects_out_of_range(hour: u8, minute: u8, field: TimeField, value: u16) {
        let registry = Registry::default();
        let err = registry.add(hour, minute, Recurrence::Once, "").unwrap_err();
        assert!(matches!(err, AlarmError::InvalidTime { field: f, value: v, .. } if f == field && v == value));
        assert!(registry.is_empty());
    }

    #[test]
    fn blank_label_gets_default() {
        let registry = Registry::new("Ring ring");
        let alarm = registry.add(1, 2, Recurrence::Hourly, "   ").unwrap();
        assert_eq!(alarm.label, "Ring ring");
        let alarm = registry.add(1, 2, Recurrence::Hourly, "  tea ").unwrap();
        assert_eq!(alarm.label, "tea");
    }

    #[test]
    fn snapshot_keeps_insertion_order_and_skips_inactive() {
        let registry = Registry::default();
        let first = registry.add(5, 0, Recurrence::Daily, "first").unwrap();
        let second = registry.add(4, 0, Recurrence::Daily, "second").unwrap();
        let third = registry.add(3, 0, Recurrence::Daily, "third").unwrap();
        assert!(registry.deactivate(second.id));
        let labels: Vec<_> = registry.snapshot().into_iter().map(|a| a.label).collect();
        assert_eq!(labels, vec!["first", "third"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get(first.id).unwrap().active);
        assert!(!registry.get(second.id).unwrap().active);
        assert!(registry.get(third.id).unwrap().active);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let registry = Registry::default();
        let alarm = registry.add(5, 0, Recurrence::Once, "x").unwrap();
        assert!(registry.deactivate(alarm.id));
        let after_first = registry.get(alarm.id);
        assert!(!registry.deactivate(alarm.id));
        assert_eq!(registry.get(alarm.id), after_first);
        assert!(!registry.deactivate(AlarmId::next()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deactivate_all_reports_what_changed() {
        let registry = Registry::default();
        let a = registry.add(5, 0, Recurrence::Once, "a").unwrap();
        let b = registry.add(6, 0, Recurrence::Once, "b").unwrap();
        registry.deactivate(a.id);
        assert_eq!(registry.deactivate_all(), vec![b.id]);
        assert!(registry.snapshot().is_empty());
        assert!(registry.deactivate_all().is_empty());
    }
}
