//! Alerts for events that are about to start.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::engine::Scheduler;
use crate::event::{DayOfWeek, Event, EventId};
use crate::notify::Notice;

/// How far ahead of its start an event counts as starting soon.
pub const STARTING_SOON_SECS: i64 = 60;

/// Events on `now`'s weekday that start within [`STARTING_SOON_SECS`] and
/// that `user_id` has not joined. Guests are never reminded.
pub fn starting_soon<'a>(
    events: &'a [Event],
    user_id: Option<&str>,
    now: NaiveDateTime,
) -> Vec<&'a Event> {
    let Some(user_id) = user_id else {
        return Vec::new();
    };
    let today = DayOfWeek::of(&now);
    events
        .iter()
        .filter(|e| e.day == today && !e.engaging_user_ids.contains(user_id))
        .filter(|e| {
            let until = (e.start_time - now.time()).num_seconds();
            until > 0 && until <= STARTING_SOON_SECS
        })
        .collect()
}

/// Remembers which events were already announced, so each one is announced
/// once per approach.
#[derive(Debug, Default)]
pub struct Reminders {
    announced: BTreeSet<EventId>,
}

impl Reminders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices for events that became due since the last check.
    pub fn due(&mut self, scheduler: &Scheduler, now: NaiveDateTime) -> Vec<Notice> {
        let upcoming = starting_soon(
            scheduler.events(),
            scheduler.user().map(|u| u.id.as_str()),
            now,
        );

        let notices = upcoming
            .iter()
            .filter(|e| !self.announced.contains(&e.id))
            .map(|e| {
                tracing::debug!(id = %e.id, "event starting soon");
                Notice::info(
                    "Event Starting Soon!",
                    &format!("{} is about to begin.", e.title),
                )
            })
            .collect();
        // Forget events that passed or were joined, so next week alerts again
        self.announced = upcoming.into_iter().map(|e| e.id.clone()).collect();
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use crate::cache::MemoryCache;
    use crate::connectivity::Connectivity;
    use crate::event::{EventDraft, UserProfile};
    use crate::notify::RecordingNotifier;
    use crate::remote::MemoryRemote;

    fn alex() -> UserProfile {
        UserProfile::new("user_a", "Alex")
    }

    fn monday_at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn standup(day: DayOfWeek) -> Event {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        Event::from_draft(
            EventId::new("evt-1"),
            EventDraft::general(day, start, end, "Standup"),
        )
    }

    #[test]
    fn test_starting_soon_window() {
        let events = vec![standup(DayOfWeek::MONDAY), standup(DayOfWeek::TUESDAY)];
        let user = Some("user_a");

        assert_eq!(starting_soon(&events, user, monday_at(8, 59, 0)).len(), 1);
        assert_eq!(starting_soon(&events, user, monday_at(8, 59, 30)).len(), 1);
        // Too early, already started, or a guest
        assert!(starting_soon(&events, user, monday_at(8, 58, 59)).is_empty());
        assert!(starting_soon(&events, user, monday_at(9, 0, 0)).is_empty());
        assert!(starting_soon(&events, None, monday_at(8, 59, 30)).is_empty());
    }

    #[test]
    fn test_joined_events_are_not_announced() {
        let mut event = standup(DayOfWeek::MONDAY);
        event.engaging_user_ids.insert("user_a".into());

        assert!(starting_soon(&[event], Some("user_a"), monday_at(8, 59, 30)).is_empty());
    }

    #[tokio::test]
    async fn test_each_approach_is_announced_once() {
        let remote = MemoryRemote::with_events(vec![standup(DayOfWeek::MONDAY)]);
        let mut scheduler = Scheduler::open(
            Some(alex()),
            Connectivity::Online,
            Arc::new(remote),
            Arc::new(MemoryCache::new()),
            Arc::new(RecordingNotifier::new()),
        );
        scheduler.refresh().await.unwrap();
        let mut reminders = Reminders::new();

        let first = reminders.due(&scheduler, monday_at(8, 59, 10));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].detail.as_deref(), Some("Standup is about to begin."));
        assert!(reminders.due(&scheduler, monday_at(8, 59, 40)).is_empty());

        // Once it has started it is forgotten and may alert again later
        assert!(reminders.due(&scheduler, monday_at(9, 0, 5)).is_empty());
        assert_eq!(reminders.due(&scheduler, monday_at(8, 59, 50)).len(), 1);
    }
}
