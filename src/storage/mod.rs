mod json_file;

pub use json_file::JsonFileReminderStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::reminder::{
    DayOfWeek, Frequency, Reminder, ReminderId, ReminderTime, ValidationError,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("no reminder with id {0}")]
    NotFound(ReminderId),

    #[error("could not write the reminder list: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode the reminder list: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fields for a reminder the user is about to create. Defaults mirror the
/// blank entry form: a single 09:00 slot, daily, both cue channels on.
pub struct NewReminder {
    pub medication_name: String,
    pub dosage: String,
    pub times: Vec<ReminderTime>,
    pub frequency: Frequency,
    pub days: Vec<DayOfWeek>,
    pub notes: String,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
}

impl Default for NewReminder {
    fn default() -> Self {
        Self {
            medication_name: String::new(),
            dosage: String::new(),
            times: vec!["09:00".parse().expect("09:00 is a valid time")],
            frequency: Frequency::Daily,
            days: Vec::new(),
            notes: String::new(),
            sound_enabled: true,
            vibration_enabled: true,
        }
    }
}

impl NewReminder {
    pub(crate) fn into_reminder(self) -> Reminder {
        Reminder {
            id: ReminderId::generate(),
            medication_name: self.medication_name,
            dosage: self.dosage,
            times: self.times,
            frequency: self.frequency,
            days: self.days,
            notes: self.notes,
            sound_enabled: self.sound_enabled,
            vibration_enabled: self.vibration_enabled,
            last_taken: None,
            enabled: true,
        }
    }
}

/// Field-level update. `None` keeps the current value.
#[derive(Debug, Default, Clone)]
pub struct ReminderPatch {
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
    pub times: Option<Vec<ReminderTime>>,
    pub frequency: Option<Frequency>,
    pub days: Option<Vec<DayOfWeek>>,
    pub notes: Option<String>,
    pub sound_enabled: Option<bool>,
    pub vibration_enabled: Option<bool>,
    pub enabled: Option<bool>,
    pub last_taken: Option<DateTime<Utc>>,
}

impl ReminderPatch {
    pub(crate) fn apply(&self, reminder: &mut Reminder) {
        if let Some(medication_name) = &self.medication_name {
            reminder.medication_name = medication_name.clone();
        }
        if let Some(dosage) = &self.dosage {
            reminder.dosage = dosage.clone();
        }
        if let Some(times) = &self.times {
            reminder.times = times.clone();
        }
        if let Some(frequency) = self.frequency {
            reminder.frequency = frequency;
        }
        if let Some(days) = &self.days {
            reminder.days = days.clone();
        }
        if let Some(notes) = &self.notes {
            reminder.notes = notes.clone();
        }
        if let Some(sound_enabled) = self.sound_enabled {
            reminder.sound_enabled = sound_enabled;
        }
        if let Some(vibration_enabled) = self.vibration_enabled {
            reminder.vibration_enabled = vibration_enabled;
        }
        if let Some(enabled) = self.enabled {
            reminder.enabled = enabled;
        }
        if let Some(last_taken) = self.last_taken {
            reminder.last_taken = Some(last_taken);
        }
    }
}

/// Durable home of the reminder list. The whole list is read and written
/// as one unit; mutators are read-modify-write over that unit.
///
/// `load` never fails the caller: a missing or unreadable payload degrades
/// to an empty list so the rest of the application keeps rendering.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn load(&self) -> Vec<Reminder>;

    async fn save(&self, reminders: &[Reminder]) -> Result<(), StoreError>;

    async fn create(&self, new: NewReminder) -> Result<Reminder, StoreError>;

    async fn update(&self, id: &ReminderId, patch: ReminderPatch) -> Result<Reminder, StoreError>;

    async fn delete(&self, id: &ReminderId) -> Result<(), StoreError>;

    /// The acknowledgment path: records when the user marked the dose as
    /// taken and touches nothing else.
    async fn mark_taken(
        &self,
        id: &ReminderId,
        taken_at: DateTime<Utc>,
    ) -> Result<Reminder, StoreError> {
        self.update(
            id,
            ReminderPatch {
                last_taken: Some(taken_at),
                ..ReminderPatch::default()
            },
        )
        .await
    }
}
