//! A user session: the scheduler wired to connectivity and the change feed.
//!
//! The session is built by the application's root and lives exactly as long
//! as the signed-in user does; there is no process-wide instance.

use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::connectivity::Connectivity;
use crate::engine::Scheduler;
use crate::feed::ChangeFeed;
use crate::reminder::Reminders;
use crate::remote::ChangeEvent;

/// How often [`Session::run_until`] looks for events about to start.
const REMINDER_TICK: Duration = Duration::from_secs(1);

/// Something the session loop woke up for.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Connectivity(Connectivity),
    /// `None` when the store closed the feed.
    Change(Option<ChangeEvent>),
}

pub struct Session {
    scheduler: Scheduler,
    feed: ChangeFeed,
    connectivity: watch::Receiver<Connectivity>,
    reminders: Reminders,
}

impl Session {
    /// Adopt the monitor's current status, sync if online and subscribe.
    pub async fn start(
        mut scheduler: Scheduler,
        mut connectivity: watch::Receiver<Connectivity>,
    ) -> Self {
        let status = *connectivity.borrow_and_update();
        // Startup state, not a transition the user needs to hear about
        scheduler.adopt_connectivity(status);

        let mut session = Session {
            scheduler,
            feed: ChangeFeed::new(),
            connectivity,
            reminders: Reminders::new(),
        };
        if status.is_online() {
            if let Err(e) = session.scheduler.refresh().await {
                tracing::warn!("initial sync failed: {e}");
            }
            session.subscribe().await;
        }
        session
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn is_subscribed(&self) -> bool {
        self.feed.is_active()
    }

    async fn subscribe(&mut self) {
        let remote = self.scheduler.remote();
        if let Err(e) = self.feed.resubscribe(remote.as_ref()).await {
            tracing::warn!("could not subscribe to changes: {e}");
        }
    }

    /// Wait for the next input. Cancel-safe; returns `None` once the
    /// connectivity monitor is gone.
    pub async fn next_input(&mut self) -> Option<SessionInput> {
        enum Wake {
            Connectivity,
            Change(Option<ChangeEvent>),
            MonitorGone,
        }

        let Session {
            connectivity, feed, ..
        } = self;
        let wake = tokio::select! {
            changed = connectivity.changed() => match changed {
                Ok(()) => Wake::Connectivity,
                Err(_) => Wake::MonitorGone,
            },
            change = feed.next() => Wake::Change(change),
        };

        match wake {
            Wake::Connectivity => Some(SessionInput::Connectivity(
                *self.connectivity.borrow_and_update(),
            )),
            Wake::Change(change) => Some(SessionInput::Change(change)),
            Wake::MonitorGone => None,
        }
    }

    pub async fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Connectivity(status) => {
                if status.is_online() {
                    if let Some(Err(e)) = self.scheduler.set_connectivity(status).await {
                        tracing::warn!("sync after reconnect failed: {e}");
                    }
                    self.subscribe().await;
                } else {
                    self.feed.pause();
                    self.scheduler.set_connectivity(status).await;
                }
            }
            SessionInput::Change(Some(change)) => {
                tracing::info!(?change, "remote change");
                self.scheduler.apply_remote_change(change);
            }
            SessionInput::Change(None) => {}
        }
    }

    /// Announce events that start within the next minute. Returns how many
    /// notices went out.
    pub fn remind(&mut self, now: NaiveDateTime) -> usize {
        let notices = self.reminders.due(&self.scheduler, now);
        let count = notices.len();
        for notice in notices {
            self.scheduler.notify(notice);
        }
        count
    }

    /// Process inputs until `shutdown` resolves or the monitor goes away,
    /// announcing upcoming events along the way. An input already being
    /// handled is finished before shutting down.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        enum Step {
            Stop,
            Remind,
            Input(SessionInput),
        }

        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(REMINDER_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let step = tokio::select! {
                _ = &mut shutdown => Step::Stop,
                _ = ticker.tick() => Step::Remind,
                input = self.next_input() => match input {
                    Some(input) => Step::Input(input),
                    None => Step::Stop,
                },
            };
            match step {
                Step::Stop => break,
                Step::Remind => {
                    self.remind(Local::now().naive_local());
                }
                Step::Input(input) => self.handle(input).await,
            }
        }
    }

    /// End the session, unsubscribing from the feed. The scheduler is handed
    /// back so the caller can inspect its final state.
    pub fn end(mut self) -> Scheduler {
        self.feed.pause();
        self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveTime;

    use crate::cache::MemoryCache;
    use crate::connectivity::ConnectivityMonitor;
    use crate::engine::MutationOutcome;
    use crate::event::{DayOfWeek, Event, EventDraft, EventId, UserProfile};
    use crate::notify::RecordingNotifier;
    use crate::remote::{MemoryRemote, RemoteStore};

    fn draft(title: &str) -> EventDraft {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        EventDraft::general(DayOfWeek::MONDAY, start, end, title)
    }

    async fn start(
        remote: Arc<MemoryRemote>,
        monitor: &ConnectivityMonitor,
    ) -> Session {
        let scheduler = Scheduler::open(
            None,
            Connectivity::Offline,
            remote,
            Arc::new(MemoryCache::new()),
            Arc::new(RecordingNotifier::new()),
        );
        Session::start(scheduler, monitor.subscribe()).await
    }

    #[tokio::test]
    async fn test_start_online_fetches_and_subscribes() {
        let seed = Event::from_draft(EventId::new("seed-1"), draft("Lunch"));
        let remote = Arc::new(MemoryRemote::with_events(vec![seed]));
        let monitor = ConnectivityMonitor::starting_as(Connectivity::Online);

        let mut session = start(remote.clone(), &monitor).await;

        assert!(session.scheduler().is_online());
        assert!(session.is_subscribed());
        assert_eq!(session.scheduler().events().len(), 1);

        remote.insert(&Event::from_draft(EventId::temporary(), draft("Pushed"))).await.unwrap();
        let input = session.next_input().await.unwrap();
        assert!(matches!(input, SessionInput::Change(Some(_))));
        session.handle(input).await;

        assert_eq!(session.scheduler().events().len(), 2);
        assert!(session.scheduler().event(&EventId::new("evt-1")).is_some());
    }

    #[tokio::test]
    async fn test_start_offline_stays_unsubscribed() {
        let monitor = ConnectivityMonitor::starting_as(Connectivity::Offline);
        let session = start(Arc::new(MemoryRemote::new()), &monitor).await;

        assert!(!session.scheduler().is_online());
        assert!(!session.is_subscribed());
    }

    #[tokio::test]
    async fn test_reconnect_replays_and_resubscribes() {
        let remote = Arc::new(MemoryRemote::new());
        let monitor = ConnectivityMonitor::starting_as(Connectivity::Online);
        let mut session = start(remote.clone(), &monitor).await;

        monitor.report(Connectivity::Offline);
        let input = session.next_input().await.unwrap();
        assert_eq!(input, SessionInput::Connectivity(Connectivity::Offline));
        session.handle(input).await;
        assert!(!session.is_subscribed());

        let outcome = session.scheduler_mut().add_event(draft("Gym")).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Queued);

        monitor.report(Connectivity::Online);
        let input = session.next_input().await.unwrap();
        session.handle(input).await;

        assert!(session.is_subscribed());
        assert!(session.scheduler().pending_actions().is_empty());
        assert_eq!(remote.events().len(), 1);
        assert_eq!(session.scheduler().events()[0].id.as_str(), "evt-1");
    }

    #[tokio::test]
    async fn test_remind_goes_through_the_notifier() {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let standup = Event::from_draft(
            EventId::new("seed-1"),
            EventDraft::general(DayOfWeek::MONDAY, start, end, "Standup"),
        );
        let remote = Arc::new(MemoryRemote::with_events(vec![standup]));
        let notifier = Arc::new(RecordingNotifier::new());
        let monitor = ConnectivityMonitor::starting_as(Connectivity::Online);
        let scheduler = Scheduler::open(
            Some(UserProfile::new("user_a", "Alex")),
            Connectivity::Offline,
            remote,
            Arc::new(MemoryCache::new()),
            notifier.clone(),
        );
        let mut session = Session::start(scheduler, monitor.subscribe()).await;
        notifier.drain();

        // 2024-06-03 is a Monday
        let now = chrono::NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(8, 59, 30)
            .unwrap();
        assert_eq!(session.remind(now), 1);
        assert_eq!(session.remind(now), 0);

        let notices = notifier.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Event Starting Soon!");
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown_and_monitor_loss() {
        let monitor = ConnectivityMonitor::starting_as(Connectivity::Offline);
        let mut session = start(Arc::new(MemoryRemote::new()), &monitor).await;

        session.run_until(async {}).await;

        drop(monitor);
        session.run_until(std::future::pending()).await;

        let scheduler = session.end();
        assert!(!scheduler.is_online());
    }
}
