use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::reminder::{Reminder, ReminderId};

use super::{NewReminder, ReminderPatch, ReminderStore, StoreError};

/// Reminder list persisted as one JSON array in a single file.
///
/// Mutations serialize through an internal lock so concurrent callers see
/// whole-list read-modify-write semantics, last writer wins.
pub struct JsonFileReminderStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileReminderStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_list(&self) -> Vec<Reminder> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                log::warn!(
                    "could not read reminder list at {}, starting empty: {err}",
                    self.path.display()
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(reminders) => reminders,
            Err(err) => {
                log::warn!(
                    "reminder list at {} is unparseable, starting empty: {err}",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    async fn write_list(&self, reminders: &[Reminder]) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(reminders)?;
        tokio::fs::write(&self.path, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for JsonFileReminderStore {
    async fn load(&self) -> Vec<Reminder> {
        self.read_list().await
    }

    async fn save(&self, reminders: &[Reminder]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_list(reminders).await
    }

    async fn create(&self, new: NewReminder) -> Result<Reminder, StoreError> {
        let mut reminder = new.into_reminder();
        reminder.normalize();
        reminder.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut list = self.read_list().await;
        list.push(reminder.clone());
        self.write_list(&list).await?;

        log::info!(
            "created reminder {} ({})",
            reminder.id,
            reminder.medication_name
        );
        Ok(reminder)
    }

    async fn update(&self, id: &ReminderId, patch: ReminderPatch) -> Result<Reminder, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut list = self.read_list().await;
        let slot = list
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut updated = slot.clone();
        patch.apply(&mut updated);
        updated.normalize();
        updated.validate()?;

        *slot = updated.clone();
        self.write_list(&list).await?;

        Ok(updated)
    }

    async fn delete(&self, id: &ReminderId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut list = self.read_list().await;
        let before = list.len();
        list.retain(|r| &r.id != id);
        if list.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }

        self.write_list(&list).await?;
        log::info!("deleted reminder {id}");
        Ok(())
    }
}
