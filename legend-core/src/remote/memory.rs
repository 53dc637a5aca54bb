//! Deterministic in-memory remote store.
//!
//! Ids are assigned sequentially (`evt-1`, `evt-2`, ...). Connectivity loss
//! and single commit failures can be injected to exercise rollback and replay.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::error::{LegendError, LegendResult};
use crate::event::{Event, EventId, EventPatch};
use crate::remote::{ChangeEvent, EventFilter, RemoteStore, Subscription};

#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

struct Inner {
    events: Vec<Event>,
    next_id: u64,
    reachable: bool,
    /// Commits left before the injected failure fires.
    fail_after: Option<usize>,
    fail_next_fetch: bool,
    commits: usize,
    subscribers: Vec<mpsc::UnboundedSender<ChangeEvent>>,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            events: Vec::new(),
            next_id: 1,
            reachable: true,
            fail_after: None,
            fail_next_fetch: false,
            commits: 0,
            subscribers: Vec::new(),
        }
    }
}

impl Inner {
    fn begin_commit(&mut self) -> LegendResult<()> {
        if !self.reachable {
            return Err(LegendError::Remote("network unreachable".into()));
        }
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                Err(LegendError::Remote("injected commit failure".into()))
            }
            Some(n) => {
                self.fail_after = Some(n - 1);
                self.commits += 1;
                Ok(())
            }
            None => {
                self.commits += 1;
                Ok(())
            }
        }
    }

    fn store(&mut self, event: &Event) -> Event {
        let mut stored = event.clone();
        stored.id = EventId::new(format!("evt-{}", self.next_id));
        stored.created_at = Utc::now();
        self.next_id += 1;
        self.events.push(stored.clone());
        stored
    }

    fn broadcast(&mut self, change: ChangeEvent) {
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table with rows that already carry their ids.
    pub fn with_events(events: Vec<Event>) -> Self {
        let remote = Self::new();
        if let Ok(mut inner) = remote.inner.lock() {
            inner.events = events;
        }
        remote
    }

    fn lock(&self) -> LegendResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| LegendError::Remote("memory remote lock poisoned".into()))
    }

    /// Current table contents.
    pub fn events(&self) -> Vec<Event> {
        self.lock().map(|inner| inner.events.clone()).unwrap_or_default()
    }

    /// Simulate losing (or regaining) the network.
    pub fn set_reachable(&self, reachable: bool) {
        if let Ok(mut inner) = self.lock() {
            inner.reachable = reachable;
        }
    }

    /// Let the next `n` commits succeed, then fail exactly one.
    pub fn fail_after(&self, n: usize) {
        if let Ok(mut inner) = self.lock() {
            inner.fail_after = Some(n);
        }
    }

    /// Fail the next full fetch once, leaving commits unaffected.
    pub fn fail_next_fetch(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.fail_next_fetch = true;
        }
    }

    /// Number of commits accepted so far.
    pub fn commit_count(&self) -> usize {
        self.lock().map(|inner| inner.commits).unwrap_or_default()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_all(&self) -> LegendResult<Vec<Event>> {
        let mut inner = self.lock()?;
        if !inner.reachable {
            return Err(LegendError::Remote("network unreachable".into()));
        }
        if std::mem::take(&mut inner.fail_next_fetch) {
            return Err(LegendError::Remote("injected fetch failure".into()));
        }
        Ok(inner.events.clone())
    }

    async fn insert(&self, event: &Event) -> LegendResult<()> {
        let mut inner = self.lock()?;
        inner.begin_commit()?;
        let stored = inner.store(event);
        inner.broadcast(ChangeEvent::Insert { event: stored });
        Ok(())
    }

    async fn insert_many(&self, events: &[Event]) -> LegendResult<()> {
        let mut inner = self.lock()?;
        inner.begin_commit()?;
        for event in events {
            let stored = inner.store(event);
            inner.broadcast(ChangeEvent::Insert { event: stored });
        }
        Ok(())
    }

    async fn update(&self, id: &EventId, patch: &EventPatch) -> LegendResult<()> {
        let mut inner = self.lock()?;
        inner.begin_commit()?;
        let updated = inner.events.iter_mut().find(|e| &e.id == id).map(|event| {
            patch.apply_to(event);
            event.clone()
        });
        if let Some(event) = updated {
            inner.broadcast(ChangeEvent::Update { event });
        }
        Ok(())
    }

    async fn delete(&self, id: &EventId) -> LegendResult<()> {
        let mut inner = self.lock()?;
        inner.begin_commit()?;
        let before = inner.events.len();
        inner.events.retain(|e| &e.id != id);
        if inner.events.len() != before {
            inner.broadcast(ChangeEvent::Delete { id: id.clone() });
        }
        Ok(())
    }

    async fn delete_matching(&self, filter: &EventFilter) -> LegendResult<usize> {
        let mut inner = self.lock()?;
        inner.begin_commit()?;
        let (removed, kept): (Vec<Event>, Vec<Event>) =
            inner.events.drain(..).partition(|e| filter.matches(e));
        inner.events = kept;
        for event in &removed {
            inner.broadcast(ChangeEvent::Delete {
                id: event.id.clone(),
            });
        }
        Ok(removed.len())
    }

    async fn update_owned(&self, owner_id: &str, patch: &EventPatch) -> LegendResult<usize> {
        let mut inner = self.lock()?;
        inner.begin_commit()?;
        let mut updated = Vec::new();
        for event in inner.events.iter_mut().filter(|e| e.is_owned_by(owner_id)) {
            patch.apply_to(event);
            updated.push(event.clone());
        }
        let count = updated.len();
        for event in updated {
            inner.broadcast(ChangeEvent::Update { event });
        }
        Ok(count)
    }

    async fn subscribe(&self) -> LegendResult<Subscription> {
        let mut inner = self.lock()?;
        if !inner.reachable {
            return Err(LegendError::Remote("network unreachable".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        inner.subscribers.push(tx);
        Ok(Subscription::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DayOfWeek, EventDraft};
    use chrono::NaiveTime;

    fn draft(title: &str) -> Event {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        Event::from_draft(
            EventId::temporary(),
            EventDraft::general(DayOfWeek::MONDAY, start, end, title),
        )
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let remote = MemoryRemote::new();
        remote.insert(&draft("One")).await.unwrap();
        remote.insert_many(&[draft("Two"), draft("Three")]).await.unwrap();

        let ids: Vec<String> = remote
            .fetch_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["evt-1", "evt-2", "evt-3"]);
    }

    #[tokio::test]
    async fn test_fail_after_fails_exactly_once() {
        let remote = MemoryRemote::new();
        remote.fail_after(1);

        assert!(remote.insert(&draft("One")).await.is_ok());
        assert!(remote.insert(&draft("Two")).await.is_err());
        assert!(remote.insert(&draft("Three")).await.is_ok());
        assert_eq!(remote.events().len(), 2);
        assert_eq!(remote.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_next_fetch_fails_once() {
        let remote = MemoryRemote::new();
        remote.fail_next_fetch();

        remote.insert(&draft("One")).await.unwrap();
        assert!(remote.fetch_all().await.is_err());
        assert_eq!(remote.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_no_ops() {
        let remote = MemoryRemote::new();
        let missing = EventId::new("evt-404");

        remote.update(&missing, &EventPatch::default()).await.unwrap();
        remote.delete(&missing).await.unwrap();
        assert!(remote.events().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let remote = MemoryRemote::new();
        let mut feed = remote.subscribe().await.unwrap();

        remote.insert(&draft("One")).await.unwrap();
        remote.delete(&EventId::new("evt-1")).await.unwrap();

        assert!(matches!(feed.recv().await, Some(ChangeEvent::Insert { .. })));
        assert_eq!(
            feed.recv().await,
            Some(ChangeEvent::Delete {
                id: EventId::new("evt-1")
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_rejects_everything() {
        let remote = MemoryRemote::new();
        remote.set_reachable(false);

        assert!(remote.fetch_all().await.is_err());
        assert!(remote.insert(&draft("One")).await.is_err());
        assert!(remote.subscribe().await.is_err());
    }
}
