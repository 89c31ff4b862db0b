use chrono::{Datelike, NaiveDateTime};

use crate::reminder::{DayOfWeek, Frequency, Reminder, ReminderTime};

/// Returns the reminders due at `now`, in list order.
///
/// Matching is minute-exact: a reminder is due iff `now`'s time of day,
/// truncated to the minute, equals one of its configured times and the
/// recurrence pattern covers `now`'s weekday. The evaluator keeps no state;
/// firing a given minute at most once is the clock's job.
pub fn due_reminders(now: NaiveDateTime, reminders: &[Reminder]) -> Vec<&Reminder> {
    let time = ReminderTime::new(now.time());
    let day = DayOfWeek::from(now.weekday());

    reminders
        .iter()
        .filter(|reminder| is_due(reminder, time, day))
        .collect()
}

fn is_due(reminder: &Reminder, time: ReminderTime, day: DayOfWeek) -> bool {
    if !reminder.enabled {
        return false;
    }

    match reminder.frequency {
        // Never matched automatically; the user triggers these by hand.
        Frequency::AsNeeded => false,
        Frequency::Daily => reminder.times.contains(&time),
        Frequency::Weekly => reminder.times.contains(&time) && reminder.days.contains(&day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use proptest::prelude::*;
    use proptest_arbitrary_interop::arb;

    use crate::reminder::ReminderId;

    fn reminder(times: &[&str], frequency: Frequency, days: &[DayOfWeek]) -> Reminder {
        Reminder {
            id: ReminderId::generate(),
            medication_name: "Lisinopril".to_string(),
            dosage: "10mg".to_string(),
            times: times.iter().map(|t| t.parse().unwrap()).collect(),
            frequency,
            days: days.to_vec(),
            notes: String::new(),
            sound_enabled: true,
            vibration_enabled: true,
            last_taken: None,
            enabled: true,
        }
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, minute, 0).unwrap()
    }

    // 2025-06-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn daily_reminder_matches_its_minute_exactly() {
        let reminders = vec![reminder(&["08:00"], Frequency::Daily, &[])];

        assert_eq!(due_reminders(at(monday(), 8, 0), &reminders).len(), 1);
        assert!(due_reminders(at(monday(), 7, 59), &reminders).is_empty());
        assert!(due_reminders(at(monday(), 8, 1), &reminders).is_empty());
    }

    #[test]
    fn seconds_within_the_matching_minute_still_match() {
        let reminders = vec![reminder(&["08:00"], Frequency::Daily, &[])];
        let now = monday().and_hms_opt(8, 0, 42).unwrap();

        assert_eq!(due_reminders(now, &reminders).len(), 1);
    }

    #[test]
    fn weekly_reminder_matches_only_its_weekdays() {
        let reminders = vec![reminder(
            &["08:00"],
            Frequency::Weekly,
            &[DayOfWeek::Monday, DayOfWeek::Thursday],
        )];

        // 2025-06-05 is the Thursday of the same week.
        let thursday = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        assert_eq!(due_reminders(at(monday(), 8, 0), &reminders).len(), 1);
        assert_eq!(due_reminders(at(thursday, 8, 0), &reminders).len(), 1);

        let tuesday = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        assert!(due_reminders(at(tuesday, 8, 0), &reminders).is_empty());
        assert!(due_reminders(at(sunday(), 8, 0), &reminders).is_empty());
    }

    #[test]
    fn week_boundary_sunday_does_not_leak_into_monday() {
        let reminders = vec![reminder(&["08:00"], Frequency::Weekly, &[DayOfWeek::Monday])];

        assert!(due_reminders(at(sunday(), 8, 0), &reminders).is_empty());
        assert_eq!(due_reminders(at(monday(), 8, 0), &reminders).len(), 1);
    }

    #[test]
    fn as_needed_reminders_never_auto_fire() {
        let reminders = vec![reminder(&["08:00"], Frequency::AsNeeded, &[])];

        assert!(due_reminders(at(monday(), 8, 0), &reminders).is_empty());
    }

    #[test]
    fn disabled_reminders_are_skipped() {
        let mut r = reminder(&["08:00"], Frequency::Daily, &[]);
        r.enabled = false;

        assert!(due_reminders(at(monday(), 8, 0), &[r]).is_empty());
    }

    #[test]
    fn reminders_sharing_a_time_fire_independently() {
        let reminders = vec![
            reminder(&["08:00"], Frequency::Daily, &[]),
            reminder(&["08:00"], Frequency::Daily, &[]),
        ];

        assert_eq!(due_reminders(at(monday(), 8, 0), &reminders).len(), 2);
    }

    #[test]
    fn multiple_time_slots_are_due_once_each() {
        let reminders = vec![reminder(&["09:00", "21:00"], Frequency::Daily, &[])];

        assert_eq!(due_reminders(at(monday(), 9, 0), &reminders).len(), 1);
        assert_eq!(due_reminders(at(monday(), 21, 0), &reminders).len(), 1);
        assert!(due_reminders(at(monday(), 9, 1), &reminders).is_empty());
        assert!(due_reminders(at(monday(), 12, 0), &reminders).is_empty());
        assert!(due_reminders(at(monday(), 20, 59), &reminders).is_empty());
    }

    proptest! {
        #[test]
        fn due_set_respects_enablement_and_frequency(now in arb::<NaiveDateTime>()) {
            let slot = ReminderTime::new(now.time()).to_string();

            let mut disabled = reminder(&[slot.as_str()], Frequency::Daily, &[]);
            disabled.enabled = false;
            let as_needed = reminder(&[slot.as_str()], Frequency::AsNeeded, &[]);
            let daily = reminder(&[slot.as_str()], Frequency::Daily, &[]);
            let weekly_today = reminder(
                &[slot.as_str()],
                Frequency::Weekly,
                &[DayOfWeek::from(now.weekday())],
            );

            let reminders = vec![disabled, as_needed, daily.clone(), weekly_today.clone()];
            let due = due_reminders(now, &reminders);

            prop_assert_eq!(due.len(), 2);
            prop_assert!(due.iter().any(|r| r.id == daily.id));
            prop_assert!(due.iter().any(|r| r.id == weekly_today.id));
        }

        #[test]
        fn a_single_slot_is_never_due_one_minute_later(now in arb::<NaiveDateTime>()) {
            let slot = ReminderTime::new(now.time()).to_string();
            let reminders = vec![reminder(&[slot.as_str()], Frequency::Daily, &[])];

            if let Some(later) = now.checked_add_signed(chrono::TimeDelta::minutes(1)) {
                prop_assert!(due_reminders(later, &reminders).is_empty());
            }
        }
    }
}
