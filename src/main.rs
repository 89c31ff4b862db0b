use std::sync::Arc;

use pilltick::appsettings;
use pilltick::dispatch::NotificationDispatcher;
use pilltick::dispatch::platform::{LogBanner, LogNotifier, RodioAudioCue};
use pilltick::scheduling::ReminderClock;
use pilltick::storage::{JsonFileReminderStore, ReminderStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::get();
    let store: Arc<dyn ReminderStore> =
        Arc::new(JsonFileReminderStore::new(&settings.storage.path));

    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&store),
        Arc::new(LogBanner),
        Arc::new(LogNotifier::new()),
        Arc::new(RodioAudioCue::new(
            &settings.audio.cue_path,
            settings.audio.volume,
        )),
        // No haptic facility on a plain desktop.
        None,
    ));

    let mut clock = ReminderClock::new(store, dispatcher);
    clock.start()?;
    log::info!("watching for due medication reminders, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    clock.stop().await?;

    Ok(())
}
