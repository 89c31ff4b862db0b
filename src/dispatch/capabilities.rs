use async_trait::async_trait;

use crate::reminder::Reminder;

use super::Acknowledger;

/// Platform notification permission, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    NotDetermined,
    Granted,
    Denied,
}

/// Payload handed to the platform notification facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformNotification {
    pub title: String,
    pub body: String,
    /// Vibration pattern attached to the notification, when the reminder
    /// asks for it.
    pub vibration: Option<Vec<u64>>,
}

/// The in-app surface. Always attempted; besides showing the reminder it
/// must offer the "mark as taken" action, which is why it receives the
/// acknowledger.
#[async_trait]
pub trait BannerChannel: Send + Sync {
    async fn present(&self, reminder: &Reminder, ack: Acknowledger) -> anyhow::Result<()>;
}

/// Platform notification facility. All three permission states must be
/// tolerated; `request_permission` is only ever called while the state is
/// still undetermined.
#[async_trait]
pub trait NotificationCapability: Send + Sync {
    async fn permission(&self) -> PermissionState;

    async fn request_permission(&self) -> PermissionState;

    async fn notify(&self, notification: PlatformNotification) -> anyhow::Result<()>;
}

/// One-shot audio cue. Played once per firing; the resource is released
/// after playback.
#[async_trait]
pub trait AudioCue: Send + Sync {
    async fn play(&self) -> anyhow::Result<()>;
}

/// Fire-and-forget vibration. Hosts without the capability simply wire no
/// implementation in.
#[async_trait]
pub trait HapticCapability: Send + Sync {
    async fn vibrate(&self, pattern: &[u64]) -> anyhow::Result<()>;
}
