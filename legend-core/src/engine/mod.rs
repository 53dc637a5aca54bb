//! The scheduler: in-memory event state kept in step with the local cache,
//! the remote store and the offline action queue.
//!
//! Every operation takes `&mut Scheduler` and resolves its remote commit
//! before returning, so mutations, commit resolutions and change-feed merges
//! never interleave. Optimistic local state is authoritative until a commit
//! confirms or rejects it; a full fetch after replay is the reconciliation
//! point for everything done offline.

mod mutations;
mod sync;


pub use mutations::ClearScope;
pub use sync::ReplaySummary;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::cache::{CacheScope, LocalCache, LocalCacheExt};
use crate::connectivity::Connectivity;
use crate::error::{LegendError, LegendResult};
use crate::event::{DayOfWeek, Event, EventId, EventPatch, UserProfile};
use crate::layout::{Placement, layout};
use crate::notify::{Notice, Notifier};
use crate::queue::{ActionQueue, QueuedAction};
use crate::remote::{EventFilter, RemoteStore};

const EVENTS_KEY: &str = "events";
const QUEUE_KEY: &str = "queue";

/// How a mutation was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The remote store accepted it.
    Committed,
    /// Saved locally; it will be replayed on reconnect.
    Queued,
}

/// The remote half of a mutation.
enum Commit {
    Action(QueuedAction),
    InsertMany(Vec<Event>),
    DeleteMatching(EventFilter),
}

/// One optimistic mutation, ready to run through [`Scheduler::run_mutation`].
struct Mutation {
    next: Vec<Event>,
    commit: Commit,
    /// What to queue instead of committing.
    queued: Vec<QueuedAction>,
    /// Re-fetch after commit to learn server-assigned ids.
    refetch: bool,
    success: &'static str,
    failure: &'static str,
}

/// Whether `a` and `b` describe the same block, ignoring ids, engagement and
/// the owner snapshot.
fn same_slot(a: &Event, b: &Event) -> bool {
    a.day == b.day
        && a.start_time == b.start_time
        && a.end_time == b.end_time
        && a.title == b.title
        && a.description == b.description
        && a.owner_id == b.owner_id
}

pub struct Scheduler {
    user: Option<UserProfile>,
    scope: CacheScope,
    events: Vec<Event>,
    queue: ActionQueue,
    connectivity: Connectivity,
    loading: watch::Sender<bool>,
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    notifier: Arc<dyn Notifier>,
}

impl Scheduler {
    /// Open the scheduler for `user` (or the guest), restoring cached events
    /// and pending actions from that user's cache scope.
    pub fn open(
        user: Option<UserProfile>,
        connectivity: Connectivity,
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let scope = CacheScope::for_user(user.as_ref().map(|u| u.id.as_str()));
        let events: Vec<Event> = cache.load(&scope.key(EVENTS_KEY));
        let queue: ActionQueue = cache.load(&scope.key(QUEUE_KEY));
        let (loading, _) = watch::channel(false);

        tracing::debug!(
            scope = scope.as_str(),
            events = events.len(),
            pending = queue.len(),
            %connectivity,
            "scheduler opened"
        );

        Scheduler {
            user,
            scope,
            events,
            queue,
            connectivity,
            loading,
            remote,
            cache,
            notifier,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|e| &e.id == id)
    }

    pub fn events_for_day(&self, day: DayOfWeek) -> Vec<&Event> {
        self.events.iter().filter(|e| e.day == day).collect()
    }

    /// The day's events with their column placement.
    pub fn layout_day(&self, day: DayOfWeek) -> Vec<(&Event, Placement)> {
        let events = self.events_for_day(day);
        let placements = layout(&events);
        events.into_iter().zip(placements).collect()
    }

    pub fn pending_actions(&self) -> &ActionQueue {
        &self.queue
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Take on a status without treating it as a transition.
    pub(crate) fn adopt_connectivity(&mut self, status: Connectivity) {
        self.connectivity = status;
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Watch the loading flag (set during full fetches and engagement toggles).
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        self.remote.clone()
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    fn find(&self, id: &EventId) -> LegendResult<&Event> {
        self.event(id)
            .ok_or_else(|| LegendError::EventNotFound(id.to_string()))
    }

    /// The id a mutation on `id` should be sent under.
    ///
    /// A temporary id with no queued `add` names a row whose add already
    /// reached the remote store but was never re-fetched. Such a row is
    /// swapped for its server copy first; sending the temporary id would
    /// touch nothing remotely.
    async fn settled_id(&mut self, id: &EventId) -> LegendResult<EventId> {
        if !id.is_temporary() || self.queue.has_pending_add(id) {
            return Ok(id.clone());
        }
        let unsettled = self.find(id)?.clone();
        if !self.is_online() {
            return Err(LegendError::RequiresConnection(format!(
                "Changing '{}' before it has synced",
                unsettled.title
            )));
        }

        tracing::debug!(%id, "re-fetching to learn the server id");
        let known: HashSet<EventId> = self.events.iter().map(|e| e.id.clone()).collect();
        self.fetch_remote().await?;

        let candidates = || {
            self.events
                .iter()
                .filter(|e| !e.id.is_temporary() && same_slot(e, &unsettled))
        };
        candidates()
            .find(|e| !known.contains(&e.id))
            .or_else(|| candidates().next())
            .map(|e| e.id.clone())
            .ok_or_else(|| LegendError::EventNotFound(id.to_string()))
    }

    fn ensure_can_modify(&self, event: &Event) -> LegendResult<()> {
        if event.can_be_modified_by(self.user_id()) {
            Ok(())
        } else {
            Err(LegendError::PermissionDenied(event.id.to_string()))
        }
    }

    fn set_loading(&self, loading: bool) {
        self.loading.send_replace(loading);
    }

    fn persist_events(&self) -> LegendResult<()> {
        self.cache.save(&self.scope.key(EVENTS_KEY), &self.events)
    }

    fn persist_queue(&self) -> LegendResult<()> {
        self.cache.save(&self.scope.key(QUEUE_KEY), &self.queue)
    }

    /// Replace the in-memory events and write them through to the cache.
    fn replace_events(&mut self, events: Vec<Event>) {
        self.events = events;
        if let Err(e) = self.persist_events() {
            tracing::warn!("could not cache events: {e}");
        }
    }

    async fn commit_action(&self, action: &QueuedAction) -> LegendResult<()> {
        match action {
            QueuedAction::Add { event } => self.remote.insert(event).await,
            QueuedAction::Update { id, patch } => self.remote.update(id, patch).await,
            QueuedAction::Delete { id } => self.remote.delete(id).await,
            QueuedAction::ToggleEngagement {
                id,
                engaging_user_ids,
            } => {
                let patch = EventPatch::engagement(engaging_user_ids.clone());
                self.remote.update(id, &patch).await
            }
        }
    }

    async fn commit(&self, commit: &Commit) -> LegendResult<()> {
        match commit {
            Commit::Action(action) => self.commit_action(action).await,
            Commit::InsertMany(events) => self.remote.insert_many(events).await,
            Commit::DeleteMatching(filter) => {
                self.remote.delete_matching(filter).await.map(|_| ())
            }
        }
    }

    /// Apply a mutation optimistically, then commit, queue or roll back.
    ///
    /// While actions are pending the mutation joins the queue behind them
    /// even when online, so it cannot overtake an earlier offline change.
    async fn run_mutation(&mut self, mutation: Mutation) -> LegendResult<MutationOutcome> {
        let Mutation {
            next,
            commit,
            queued,
            refetch,
            success,
            failure,
        } = mutation;

        let previous = std::mem::replace(&mut self.events, next);
        if let Err(e) = self.persist_events() {
            self.events = previous;
            return Err(e);
        }

        if !self.is_online() || !self.queue.is_empty() {
            let previous_queue = self.queue.clone();
            for action in queued {
                self.queue.push(action);
            }
            if let Err(e) = self.persist_queue() {
                self.queue = previous_queue;
                self.replace_events(previous);
                return Err(e);
            }

            if !self.is_online() {
                tracing::debug!(pending = self.queue.len(), "mutation queued while offline");
                self.notifier.notify(Notice::info(
                    "Saved offline",
                    "Your change will sync when you reconnect.",
                ));
                return Ok(MutationOutcome::Queued);
            }

            // A failed replay has already notified and kept the queue
            let _ = self.replay().await;
            return Ok(if self.queue.is_empty() {
                MutationOutcome::Committed
            } else {
                MutationOutcome::Queued
            });
        }

        match self.commit(&commit).await {
            Ok(()) => {
                if refetch {
                    if let Err(e) = self.fetch_remote().await {
                        tracing::warn!("committed, but could not refresh: {e}");
                    }
                }
                self.notifier.notify(Notice::success("Success", success));
                Ok(MutationOutcome::Committed)
            }
            Err(e) => {
                tracing::warn!("{failure}: {e}");
                self.replace_events(previous);
                self.notifier.notify(Notice::error(failure, &e));
                Err(e)
            }
        }
    }
}
