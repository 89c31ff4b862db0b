//! Fake store and channel implementations shared by the scheduling and
//! dispatch tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::{
    Acknowledger, AudioCue, BannerChannel, HapticCapability, NotificationCapability,
    NotificationDispatcher, PermissionState, PlatformNotification,
};
use crate::reminder::{Frequency, Reminder, ReminderId};
use crate::storage::{NewReminder, ReminderPatch, ReminderStore, StoreError};

fn daily_reminder(name: &str, time: &str) -> Reminder {
    Reminder {
        id: ReminderId::generate(),
        medication_name: name.to_string(),
        dosage: "10mg".to_string(),
        times: vec![time.parse().unwrap()],
        frequency: Frequency::Daily,
        days: vec![],
        notes: String::new(),
        sound_enabled: true,
        vibration_enabled: true,
        last_taken: None,
        enabled: true,
    }
}

#[derive(Default)]
pub(crate) struct InMemoryReminderStore {
    list: Mutex<Vec<Reminder>>,
}

impl InMemoryReminderStore {
    pub fn with_daily(name: &str, time: &str) -> Self {
        let store = Self::default();
        store.push_daily(name, time);
        store
    }

    pub fn push_daily(&self, name: &str, time: &str) {
        self.list.lock().unwrap().push(daily_reminder(name, time));
    }

    pub fn set_toggles(&self, name: &str, sound: bool, vibration: bool) {
        let mut list = self.list.lock().unwrap();
        let reminder = list
            .iter_mut()
            .find(|r| r.medication_name == name)
            .expect("reminder exists");
        reminder.sound_enabled = sound;
        reminder.vibration_enabled = vibration;
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn load(&self) -> Vec<Reminder> {
        self.list.lock().unwrap().clone()
    }

    async fn save(&self, reminders: &[Reminder]) -> Result<(), StoreError> {
        *self.list.lock().unwrap() = reminders.to_vec();
        Ok(())
    }

    async fn create(&self, new: NewReminder) -> Result<Reminder, StoreError> {
        let mut reminder = new.into_reminder();
        reminder.normalize();
        reminder.validate()?;
        self.list.lock().unwrap().push(reminder.clone());
        Ok(reminder)
    }

    async fn update(&self, id: &ReminderId, patch: ReminderPatch) -> Result<Reminder, StoreError> {
        let mut list = self.list.lock().unwrap();
        let slot = list
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut updated = slot.clone();
        patch.apply(&mut updated);
        updated.normalize();
        updated.validate()?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &ReminderId) -> Result<(), StoreError> {
        let mut list = self.list.lock().unwrap();
        let before = list.len();
        list.retain(|r| &r.id != id);
        if list.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingBanner {
    presented: AtomicUsize,
    fail: Mutex<Option<String>>,
    acknowledge: AtomicBool,
}

impl RecordingBanner {
    pub fn presented(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, reason: &str) {
        *self.fail.lock().unwrap() = Some(reason.to_string());
    }

    pub fn acknowledge_on_present(&self) {
        self.acknowledge.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BannerChannel for RecordingBanner {
    async fn present(&self, reminder: &Reminder, ack: Acknowledger) -> anyhow::Result<()> {
        self.presented.fetch_add(1, Ordering::SeqCst);

        let fail = self.fail.lock().unwrap().clone();
        if let Some(reason) = fail {
            anyhow::bail!(reason);
        }

        if self.acknowledge.load(Ordering::SeqCst) {
            ack.mark_taken(&reminder.id).await?;
        }
        Ok(())
    }
}

pub(crate) struct RecordingNotifier {
    permission: Mutex<PermissionState>,
    on_request: Mutex<PermissionState>,
    requests: AtomicUsize,
    notified: Mutex<Vec<PlatformNotification>>,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self {
            permission: Mutex::new(PermissionState::Granted),
            on_request: Mutex::new(PermissionState::Granted),
            requests: AtomicUsize::new(0),
            notified: Mutex::new(Vec::new()),
        }
    }

    pub fn set_permission(&self, state: PermissionState) {
        *self.permission.lock().unwrap() = state;
    }

    pub fn grant_on_request(&self) {
        *self.on_request.lock().unwrap() = PermissionState::Granted;
    }

    pub fn deny_on_request(&self) {
        *self.on_request.lock().unwrap() = PermissionState::Denied;
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn notified(&self) -> Vec<PlatformNotification> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationCapability for RecordingNotifier {
    async fn permission(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> PermissionState {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let resolved = *self.on_request.lock().unwrap();
        *self.permission.lock().unwrap() = resolved;
        resolved
    }

    async fn notify(&self, notification: PlatformNotification) -> anyhow::Result<()> {
        self.notified.lock().unwrap().push(notification);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingAudio {
    plays: AtomicUsize,
    fail: Mutex<Option<String>>,
}

impl RecordingAudio {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, reason: &str) {
        *self.fail.lock().unwrap() = Some(reason.to_string());
    }
}

#[async_trait]
impl AudioCue for RecordingAudio {
    async fn play(&self) -> anyhow::Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.fail.lock().unwrap().clone() {
            anyhow::bail!(reason);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingHaptics {
    patterns: Mutex<Vec<Vec<u64>>>,
}

impl RecordingHaptics {
    pub fn patterns(&self) -> Vec<Vec<u64>> {
        self.patterns.lock().unwrap().clone()
    }
}

#[async_trait]
impl HapticCapability for RecordingHaptics {
    async fn vibrate(&self, pattern: &[u64]) -> anyhow::Result<()> {
        self.patterns.lock().unwrap().push(pattern.to_vec());
        Ok(())
    }
}

pub(crate) struct RecordingChannels {
    banner: Arc<RecordingBanner>,
}

impl RecordingChannels {
    pub fn banner_presented(&self) -> usize {
        self.banner.presented()
    }
}

pub(crate) fn recording_dispatcher(
    store: Arc<dyn ReminderStore>,
) -> (Arc<NotificationDispatcher>, RecordingChannels) {
    let banner = Arc::new(RecordingBanner::default());

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store,
        Arc::clone(&banner) as Arc<dyn BannerChannel>,
        Arc::new(RecordingNotifier::granted()) as Arc<dyn NotificationCapability>,
        Arc::new(RecordingAudio::default()) as Arc<dyn AudioCue>,
        Some(Arc::new(RecordingHaptics::default()) as Arc<dyn HapticCapability>),
    ));

    (dispatcher, RecordingChannels { banner })
}
