//! The authoritative event store and its change feed.
//!
//! The hosted backend is reached only through [`RemoteStore`]. Inserts do not
//! echo back the generated id; callers re-fetch to learn it.

mod dir;
mod memory;

pub use dir::DirRemote;
pub use memory::MemoryRemote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::LegendResult;
use crate::event::{DayOfWeek, Event, EventId, EventPatch};

/// Row filter for bulk operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub owner: OwnerFilter,
    pub day: Option<DayOfWeek>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerFilter {
    /// Events owned by this user.
    User(String),
    /// Events with no owner.
    General,
}

impl EventFilter {
    pub fn owned_by(user_id: &str) -> Self {
        EventFilter {
            owner: OwnerFilter::User(user_id.to_string()),
            day: None,
        }
    }

    pub fn general() -> Self {
        EventFilter {
            owner: OwnerFilter::General,
            day: None,
        }
    }

    pub fn on(mut self, day: Option<DayOfWeek>) -> Self {
        self.day = day;
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        let owner_matches = match &self.owner {
            OwnerFilter::User(user_id) => event.is_owned_by(user_id),
            OwnerFilter::General => event.is_general(),
        };
        owner_matches && self.day.is_none_or(|day| event.day == day)
    }
}

/// A row-level change pushed by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    Insert { event: Event },
    Update { event: Event },
    Delete { id: EventId },
}

/// A live change feed. Dropping it unsubscribes.
pub struct Subscription {
    changes: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(changes: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Subscription { changes }
    }

    /// Next change, or `None` once the store closed the feed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.changes.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.changes.close();
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_all(&self) -> LegendResult<Vec<Event>>;

    /// Insert a new row. The store assigns its own id and creation time.
    async fn insert(&self, event: &Event) -> LegendResult<()>;

    /// Insert several rows as one commit.
    async fn insert_many(&self, events: &[Event]) -> LegendResult<()> {
        for event in events {
            self.insert(event).await?;
        }
        Ok(())
    }

    /// Updating an id that no longer exists succeeds without effect.
    async fn update(&self, id: &EventId, patch: &EventPatch) -> LegendResult<()>;

    /// Deleting an id that no longer exists succeeds without effect.
    async fn delete(&self, id: &EventId) -> LegendResult<()>;

    /// Delete every row matching `filter`, returning how many went.
    async fn delete_matching(&self, filter: &EventFilter) -> LegendResult<usize>;

    /// Apply `patch` to every row owned by `owner_id` as one commit.
    async fn update_owned(&self, owner_id: &str, patch: &EventPatch) -> LegendResult<usize>;

    async fn subscribe(&self) -> LegendResult<Subscription>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventDraft, UserProfile};
    use chrono::NaiveTime;

    fn event(owner: Option<&UserProfile>, day: DayOfWeek) -> Event {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let draft = match owner {
            Some(profile) => EventDraft::personal(profile, day, start, end, "Focus"),
            None => EventDraft::general(day, start, end, "Focus"),
        };
        Event::from_draft(EventId::new("evt-1"), draft)
    }

    #[test]
    fn test_filters() {
        let alex = UserProfile::new("user_a", "Alex");
        let personal = event(Some(&alex), DayOfWeek::MONDAY);
        let general = event(None, DayOfWeek::TUESDAY);

        assert!(EventFilter::owned_by("user_a").matches(&personal));
        assert!(!EventFilter::owned_by("user_j").matches(&personal));
        assert!(!EventFilter::owned_by("user_a").matches(&general));
        assert!(EventFilter::general().matches(&general));
        assert!(EventFilter::general().on(Some(DayOfWeek::TUESDAY)).matches(&general));
        assert!(!EventFilter::general().on(Some(DayOfWeek::MONDAY)).matches(&general));
    }
}
