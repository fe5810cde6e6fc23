//! The decision of whether an alarm rings on a given tick.

use chrono::Timelike;

use crate::alarm::Recurrence;

/// Result of evaluating one alarm at one instant.
/// `triggered_today` and `active` are the values the alarm should have after the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub fire: bool,
    pub triggered_today: bool,
    pub active: bool,
}

/// Decides if an alarm rings at `now`, only hour and minute of `now` are looked at.
///
/// - hourly alarms ring whenever the minute matches, whatever the hour
/// - daily alarms ring at their time unless they already rang today,
///   and forget that they rang once midnight (00:00) is seen
/// - once alarms ring at their time and turn themselves off
///
/// There is no catching up: a tick that misses the minute means the alarm waits for the next
/// matching occurrence.
#[must_use]
pub fn evaluate(
    recurrence: Recurrence,
    hour: u8,
    minute: u8,
    triggered_today: bool,
    now: &impl Timelike,
) -> Evaluation {
    let minute_matches = now.minute() == u32::from(minute);
    let time_matches = minute_matches && now.hour() == u32::from(hour);
    match recurrence {
        Recurrence::Hourly => Evaluation {
            fire: minute_matches,
            triggered_today,
            active: true,
        },
        Recurrence::Daily => {
            let fire = time_matches && !triggered_today;
            let mut triggered_today = triggered_today || fire;
            // the midnight reset is checked on every tick, after the fire check
            if now.hour() == 0 && now.minute() == 0 {
                triggered_today = false;
            }
            Evaluation {
                fire,
                triggered_today,
                active: true,
            }
        }
        Recurrence::Once => Evaluation {
            fire: time_matches,
            triggered_today,
            active: !time_matches,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 15).unwrap()
    }

    #[test_case(9, 15, true ; "matching minute")]
    #[test_case(23, 15, true ; "matching minute other hour")]
    #[test_case(0, 15, true ; "matching minute at midnight hour")]
    #[test_case(9, 16, false ; "other minute")]
    fn hourly(hour: u32, minute: u32, fire: bool) {
        let result = evaluate(Recurrence::Hourly, 9, 15, false, &at(hour, minute));
        assert_eq!(
            result,
            Evaluation {
                fire,
                triggered_today: false,
                active: true,
            }
        );
    }

    #[test]
    fn hourly_ignores_triggered_today() {
        let result = evaluate(Recurrence::Hourly, 9, 15, true, &at(10, 15));
        assert!(result.fire);
        assert!(result.triggered_today);
    }

    #[test]
    fn daily_fires_and_marks_the_day() {
        let result = evaluate(Recurrence::Daily, 7, 30, false, &at(7, 30));
        assert_eq!(
            result,
            Evaluation {
                fire: true,
                triggered_today: true,
                active: true,
            }
        );
    }

    #[test]
    fn daily_does_not_fire_twice_on_the_same_day() {
        let result = evaluate(Recurrence::Daily, 7, 30, true, &at(7, 30));
        assert!(!result.fire);
        assert!(result.triggered_today);
    }

    #[test]
    fn daily_does_not_fire_at_other_times() {
        let result = evaluate(Recurrence::Daily, 7, 30, false, &at(8, 30));
        assert!(!result.fire);
        assert!(!result.triggered_today);
    }

    #[test]
    fn daily_resets_at_midnight() {
        let result = evaluate(Recurrence::Daily, 7, 30, true, &at(0, 0));
        assert_eq!(
            result,
            Evaluation {
                fire: false,
                triggered_today: false,
                active: true,
            }
        );
    }

    #[test]
    fn daily_at_midnight_fires_and_is_reset_on_the_same_tick() {
        let result = evaluate(Recurrence::Daily, 0, 0, false, &at(0, 0));
        assert!(result.fire);
        assert!(!result.triggered_today);
    }

    #[test]
    fn once_fires_and_deactivates() {
        let result = evaluate(Recurrence::Once, 6, 45, false, &at(6, 45));
        assert_eq!(
            result,
            Evaluation {
                fire: true,
                triggered_today: false,
                active: false,
            }
        );
    }

    #[test]
    fn once_waits_for_its_time() {
        let result = evaluate(Recurrence::Once, 6, 45, false, &at(6, 44));
        assert!(!result.fire);
        assert!(result.active);
    }
}
