mod capabilities;
pub mod platform;

pub use capabilities::{
    AudioCue, BannerChannel, HapticCapability, NotificationCapability, PermissionState,
    PlatformNotification,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use crate::reminder::{Reminder, ReminderId};
use crate::storage::{ReminderStore, StoreError};

/// Vibration pattern attached to the platform notification.
pub const NOTIFICATION_VIBRATION: [u64; 3] = [200, 100, 200];

/// Pattern for the direct haptic cue.
pub const HAPTIC_PATTERN: [u64; 5] = [200, 100, 200, 100, 200];

/// The only write path from a firing back into the store: records the
/// user's "mark as taken" on the reminder.
#[derive(Clone)]
pub struct Acknowledger {
    store: Arc<dyn ReminderStore>,
}

impl Acknowledger {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    pub async fn mark_taken(&self, id: &ReminderId) -> Result<Reminder, StoreError> {
        self.store.mark_taken(id, Utc::now()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Banner,
    PlatformNotification,
    Audio,
    Haptic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The reminder's own toggle for this channel is off.
    DisabledOnReminder,
    PermissionDenied,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered,
    Skipped(SkipReason),
    Failed(String),
}

/// Per-channel outcomes of one firing. There is deliberately no aggregate
/// pass/fail; each channel stands on its own.
#[derive(Debug, Default)]
pub struct DispatchReport {
    outcomes: Vec<(ChannelKind, ChannelOutcome)>,
}

impl DispatchReport {
    fn record(&mut self, channel: ChannelKind, outcome: ChannelOutcome) {
        self.outcomes.push((channel, outcome));
    }

    pub fn outcomes(&self) -> &[(ChannelKind, ChannelOutcome)] {
        &self.outcomes
    }

    pub fn outcome(&self, channel: ChannelKind) -> Option<&ChannelOutcome> {
        self.outcomes
            .iter()
            .find(|(kind, _)| *kind == channel)
            .map(|(_, outcome)| outcome)
    }
}

/// Fans one due reminder out to the delivery channels. Channels are
/// attempted independently; a failure in one never short-circuits the
/// others, and the in-app banner with its acknowledgment action is always
/// attempted first.
pub struct NotificationDispatcher {
    banner: Arc<dyn BannerChannel>,
    notifications: Arc<dyn NotificationCapability>,
    audio: Arc<dyn AudioCue>,
    haptics: Option<Arc<dyn HapticCapability>>,
    acknowledger: Acknowledger,
    permission_requested: AtomicBool,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        banner: Arc<dyn BannerChannel>,
        notifications: Arc<dyn NotificationCapability>,
        audio: Arc<dyn AudioCue>,
        haptics: Option<Arc<dyn HapticCapability>>,
    ) -> Self {
        Self {
            banner,
            notifications,
            audio,
            haptics,
            acknowledger: Acknowledger::new(store),
            permission_requested: AtomicBool::new(false),
        }
    }

    pub async fn fire(&self, reminder: &Reminder) -> DispatchReport {
        let mut report = DispatchReport::default();

        report.record(ChannelKind::Banner, self.fire_banner(reminder).await);
        report.record(
            ChannelKind::PlatformNotification,
            self.fire_platform(reminder).await,
        );
        report.record(ChannelKind::Audio, self.fire_audio(reminder).await);
        report.record(ChannelKind::Haptic, self.fire_haptic(reminder).await);

        report
    }

    async fn fire_banner(&self, reminder: &Reminder) -> ChannelOutcome {
        match self
            .banner
            .present(reminder, self.acknowledger.clone())
            .await
        {
            Ok(()) => ChannelOutcome::Delivered,
            Err(err) => {
                log::warn!("banner failed for reminder {}: {err:#}", reminder.id);
                ChannelOutcome::Failed(format!("{err:#}"))
            }
        }
    }

    async fn fire_platform(&self, reminder: &Reminder) -> ChannelOutcome {
        match self.permission_state().await {
            PermissionState::Granted => {}
            PermissionState::Denied => {
                return ChannelOutcome::Skipped(SkipReason::PermissionDenied);
            }
            PermissionState::NotDetermined => {
                // Still undetermined after the one allowed request.
                return ChannelOutcome::Skipped(SkipReason::PermissionDenied);
            }
        }

        let notification = PlatformNotification {
            title: "Medication Reminder".to_string(),
            body: format!(
                "Time to take {} - {}",
                reminder.medication_name, reminder.dosage
            ),
            vibration: reminder
                .vibration_enabled
                .then(|| NOTIFICATION_VIBRATION.to_vec()),
        };

        match self.notifications.notify(notification).await {
            Ok(()) => ChannelOutcome::Delivered,
            Err(err) => {
                log::warn!(
                    "platform notification failed for reminder {}: {err:#}",
                    reminder.id
                );
                ChannelOutcome::Failed(format!("{err:#}"))
            }
        }
    }

    /// Resolves the notification permission, asking the platform at most
    /// once per process lifetime while the state is undetermined.
    async fn permission_state(&self) -> PermissionState {
        let state = self.notifications.permission().await;
        if state != PermissionState::NotDetermined {
            return state;
        }

        if self.permission_requested.swap(true, Ordering::SeqCst) {
            return state;
        }

        let granted = self.notifications.request_permission().await;
        log::info!("notification permission resolved to {granted:?}");
        granted
    }

    async fn fire_audio(&self, reminder: &Reminder) -> ChannelOutcome {
        if !reminder.sound_enabled {
            return ChannelOutcome::Skipped(SkipReason::DisabledOnReminder);
        }

        match self.audio.play().await {
            Ok(()) => ChannelOutcome::Delivered,
            Err(err) => {
                log::warn!("could not play sound for reminder {}: {err:#}", reminder.id);
                ChannelOutcome::Failed(format!("{err:#}"))
            }
        }
    }

    async fn fire_haptic(&self, reminder: &Reminder) -> ChannelOutcome {
        if !reminder.vibration_enabled {
            return ChannelOutcome::Skipped(SkipReason::DisabledOnReminder);
        }

        let Some(haptics) = &self.haptics else {
            return ChannelOutcome::Skipped(SkipReason::Unavailable);
        };

        match haptics.vibrate(&HAPTIC_PATTERN).await {
            Ok(()) => ChannelOutcome::Delivered,
            Err(err) => {
                log::warn!("haptic cue failed for reminder {}: {err:#}", reminder.id);
                ChannelOutcome::Failed(format!("{err:#}"))
            }
        }
    }
}
