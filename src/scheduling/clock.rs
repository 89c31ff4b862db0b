use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{ChannelOutcome, NotificationDispatcher};
use crate::storage::ReminderStore;

use super::evaluator::due_reminders;

/// The tick period matches the evaluator's minute resolution, so each due
/// minute is naturally visited once.
const TICK_PERIOD: Duration = Duration::from_secs(60);

/// Remembers the last evaluated minute so timer drift cannot fire the same
/// occurrence twice.
#[derive(Debug, Default)]
struct MinuteGate {
    last: Option<NaiveDateTime>,
}

impl MinuteGate {
    fn admit(&mut self, now: NaiveDateTime) -> bool {
        let minute = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .expect("zeroing sub-minute precision never fails");

        if self.last == Some(minute) {
            return false;
        }
        self.last = Some(minute);
        true
    }
}

/// One evaluation pass: gate the minute, snapshot the store, fan out every
/// due reminder. Split out of the timer loop so tests can drive ticks with
/// explicit timestamps.
pub struct TickRunner {
    store: Arc<dyn ReminderStore>,
    dispatcher: Arc<NotificationDispatcher>,
    gate: MinuteGate,
}

impl TickRunner {
    pub fn new(store: Arc<dyn ReminderStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            gate: MinuteGate::default(),
        }
    }

    pub async fn run_tick(&mut self, now: NaiveDateTime) {
        if !self.gate.admit(now) {
            log::debug!("minute {} already evaluated, skipping tick", now.format("%H:%M"));
            return;
        }

        let reminders = self.store.load().await;
        for reminder in due_reminders(now, &reminders) {
            log::info!(
                "reminder {} ({}) is due at {}",
                reminder.id,
                reminder.medication_name,
                now.format("%H:%M")
            );

            let report = self.dispatcher.fire(reminder).await;
            for (channel, outcome) in report.outcomes() {
                if let ChannelOutcome::Failed(reason) = outcome {
                    log::warn!(
                        "{channel:?} channel failed for reminder {}: {reason}",
                        reminder.id
                    );
                }
            }
        }
    }
}

struct ClockHandle {
    task: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

enum ClockState {
    Idle,
    Running(ClockHandle),
    Stopped,
}

/// Periodic driver of the reminder pipeline. Owns a single recurring timer
/// task; `start` registers it and `stop` cancels it for the rest of the
/// session.
///
/// Minutes that pass while no clock is running are dropped, not delivered
/// retroactively on the next start.
pub struct ReminderClock {
    store: Arc<dyn ReminderStore>,
    dispatcher: Arc<NotificationDispatcher>,
    tick_period: Duration,
    state: ClockState,
}

impl ReminderClock {
    pub fn new(store: Arc<dyn ReminderStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self::with_period(store, dispatcher, TICK_PERIOD)
    }

    pub fn with_period(
        store: Arc<dyn ReminderStore>,
        dispatcher: Arc<NotificationDispatcher>,
        tick_period: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            tick_period,
            state: ClockState::Idle,
        }
    }

    /// Registers the recurring timer. The first tick fires immediately, so
    /// reminders due in the current minute are evaluated on startup.
    pub fn start(&mut self) -> anyhow::Result<()> {
        match self.state {
            ClockState::Idle => {}
            ClockState::Running(_) => anyhow::bail!("clock is already running"),
            ClockState::Stopped => anyhow::bail!("clock was stopped for this session"),
        }

        let cancellation_token = CancellationToken::new();
        let runner = TickRunner::new(Arc::clone(&self.store), Arc::clone(&self.dispatcher));
        let task = tokio::spawn(run_loop(
            runner,
            self.tick_period,
            cancellation_token.child_token(),
        ));

        self.state = ClockState::Running(ClockHandle {
            task,
            cancellation_token,
        });
        log::info!("reminder clock started, ticking every {:?}", self.tick_period);
        Ok(())
    }

    /// Cancels the pending timer; no further ticks fire. Channel dispatches
    /// already in flight for the current tick run to completion.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        match std::mem::replace(&mut self.state, ClockState::Stopped) {
            ClockState::Running(handle) => {
                handle.cancellation_token.cancel();
                let _ = handle.task.await;
                log::info!("reminder clock stopped");
                Ok(())
            }
            previous => {
                self.state = previous;
                anyhow::bail!("clock is not running")
            }
        }
    }
}

async fn run_loop(mut runner: TickRunner, period: Duration, cancellation_token: CancellationToken) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => break,
            _ = interval.tick() => {
                runner.run_tick(Local::now().naive_local()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    use crate::test_support::{recording_dispatcher, InMemoryReminderStore};

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn minute_gate_admits_each_minute_once() {
        let mut gate = MinuteGate::default();

        assert!(gate.admit(at(8, 0, 0)));
        assert!(!gate.admit(at(8, 0, 0)));
        assert!(!gate.admit(at(8, 0, 59)));
        assert!(gate.admit(at(8, 1, 3)));
        assert!(!gate.admit(at(8, 1, 45)));
    }

    #[tokio::test]
    async fn a_due_minute_fires_at_most_once() {
        let store = Arc::new(InMemoryReminderStore::with_daily("Lisinopril", "08:00"));
        let (dispatcher, channels) = recording_dispatcher(store.clone());
        let mut runner = TickRunner::new(store, dispatcher);

        runner.run_tick(at(8, 0, 0)).await;
        runner.run_tick(at(8, 0, 40)).await;

        assert_eq!(channels.banner_presented(), 1);
    }

    #[tokio::test]
    async fn non_matching_minutes_fire_nothing() {
        let store = Arc::new(InMemoryReminderStore::with_daily("Lisinopril", "08:00"));
        let (dispatcher, channels) = recording_dispatcher(store.clone());
        let mut runner = TickRunner::new(store, dispatcher);

        runner.run_tick(at(7, 59, 0)).await;
        runner.run_tick(at(8, 1, 0)).await;

        assert_eq!(channels.banner_presented(), 0);
    }

    #[tokio::test]
    async fn later_minutes_fire_again() {
        let store = Arc::new(InMemoryReminderStore::with_daily("Lisinopril", "08:00"));
        let (dispatcher, channels) = recording_dispatcher(store.clone());
        let mut runner = TickRunner::new(store, dispatcher);

        runner.run_tick(at(8, 0, 0)).await;
        runner.run_tick(at(8, 1, 0)).await;
        // The same slot the next day is a fresh occurrence; the gate only
        // guards the current minute.
        runner.run_tick(
            NaiveDate::from_ymd_opt(2025, 6, 3)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        )
        .await;

        assert_eq!(channels.banner_presented(), 2);
    }

    #[tokio::test]
    async fn reminders_sharing_a_minute_all_fire() {
        let store = Arc::new(InMemoryReminderStore::with_daily("Lisinopril", "08:00"));
        store.push_daily("Metformin", "08:00");
        let (dispatcher, channels) = recording_dispatcher(store.clone());
        let mut runner = TickRunner::new(store, dispatcher);

        runner.run_tick(at(8, 0, 0)).await;

        assert_eq!(channels.banner_presented(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_lifecycle_is_idle_running_stopped() {
        let store = Arc::new(InMemoryReminderStore::default());
        let (dispatcher, _channels) = recording_dispatcher(store.clone());
        let mut clock = ReminderClock::new(store, dispatcher);

        assert!(clock.stop().await.is_err());

        clock.start().unwrap();
        assert!(clock.start().is_err());

        clock.stop().await.unwrap();
        assert!(clock.start().is_err());
        assert!(clock.stop().await.is_err());
    }
}
