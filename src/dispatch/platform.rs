//! Default capability implementations for running the daemon on a plain
//! desktop: the visual surfaces log, the audio cue really plays.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};

use crate::reminder::Reminder;

use super::{
    Acknowledger, AudioCue, BannerChannel, NotificationCapability, PermissionState,
    PlatformNotification,
};

/// In-app surface that writes the banner to the log. A host with a real UI
/// swaps this for its own implementation and wires the acknowledger into
/// the "mark as taken" control.
pub struct LogBanner;

#[async_trait]
impl BannerChannel for LogBanner {
    async fn present(&self, reminder: &Reminder, _ack: Acknowledger) -> anyhow::Result<()> {
        log::info!(
            "Time to take your medication! {} - {}",
            reminder.medication_name,
            reminder.dosage
        );
        Ok(())
    }
}

/// Log-backed notification facility. Starts undetermined and grants on the
/// first request, mirroring a platform prompt the user accepts.
pub struct LogNotifier {
    permission: Mutex<PermissionState>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            permission: Mutex::new(PermissionState::NotDetermined),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationCapability for LogNotifier {
    async fn permission(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> PermissionState {
        let mut permission = self.permission.lock().unwrap();
        *permission = PermissionState::Granted;
        log::info!("notification permission granted");
        *permission
    }

    async fn notify(&self, notification: PlatformNotification) -> anyhow::Result<()> {
        log::info!("[notification] {}: {}", notification.title, notification.body);
        Ok(())
    }
}

/// Plays the configured cue file once per firing through the default audio
/// device. The output stream lives only for the playback.
pub struct RodioAudioCue {
    path: PathBuf,
    volume: f32,
}

impl RodioAudioCue {
    pub fn new(path: impl AsRef<Path>, volume: f32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            volume,
        }
    }
}

#[async_trait]
impl AudioCue for RodioAudioCue {
    async fn play(&self) -> anyhow::Result<()> {
        let path = self.path.clone();
        let volume = self.volume;

        // rodio's output stream is not Send, so playback runs on a
        // blocking thread for its whole duration.
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let (_stream, handle) = OutputStream::try_default()?;
            let file = std::fs::File::open(&path)?;
            let source = Decoder::new(std::io::BufReader::new(file))?;

            let sink = Sink::try_new(&handle)?;
            sink.set_volume(volume);
            sink.append(source);
            sink.sleep_until_end();
            Ok(())
        })
        .await??;

        Ok(())
    }
}
