use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque reminder identifier, generated once on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(String);

impl ReminderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReminderId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Wall-clock time of day at minute resolution. Seconds and finer are
/// zeroed on construction so equality means "same minute".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime(NaiveTime);

impl ReminderTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized = inner
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .expect("zeroing sub-minute precision never fails");
        Self(normalized)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl From<NaiveTime> for ReminderTime {
    fn from(inner: NaiveTime) -> Self {
        Self::new(inner)
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for ReminderTime {
    type Err = chrono::ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(raw, "%H:%M").map(Self::new)
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = chrono::ParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<ReminderTime> for String {
    fn from(time: ReminderTime) -> Self {
        time.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Daily,
    Weekly,
    /// Never matched by the periodic evaluation; the user triggers these
    /// by hand.
    AsNeeded,
}

/// Weekday labels as the reminder list persists them, Monday-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("medication name must not be empty")]
    EmptyMedicationName,

    #[error("dosage must not be empty")]
    EmptyDosage,

    #[error("at least one reminder time is required")]
    NoTimes,

    #[error("weekly reminders need at least one weekday")]
    NoWeekdays,
}

/// A medication reminder as the user configured it. The serde layout is
/// the persisted record format: camelCase keys, `"HH:MM"` times, full
/// weekday names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: ReminderId,
    pub medication_name: String,
    pub dosage: String,
    pub times: Vec<ReminderTime>,
    pub frequency: Frequency,
    /// Consulted only when `frequency` is weekly.
    #[serde(default)]
    pub days: Vec<DayOfWeek>,
    #[serde(default)]
    pub notes: String,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    /// Last user acknowledgment. Advisory only; has no effect on firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_taken: Option<DateTime<Utc>>,
    pub enabled: bool,
}

impl Reminder {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.medication_name.trim().is_empty() {
            return Err(ValidationError::EmptyMedicationName);
        }
        if self.dosage.trim().is_empty() {
            return Err(ValidationError::EmptyDosage);
        }
        if self.times.is_empty() {
            return Err(ValidationError::NoTimes);
        }
        if self.frequency == Frequency::Weekly && self.days.is_empty() {
            return Err(ValidationError::NoWeekdays);
        }
        Ok(())
    }

    /// Drops duplicate times and weekdays, keeping first-occurrence order.
    pub fn normalize(&mut self) {
        let mut seen_times = HashSet::new();
        self.times.retain(|t| seen_times.insert(*t));

        let mut seen_days = HashSet::new();
        self.days.retain(|d| seen_days.insert(*d));
    }
}
