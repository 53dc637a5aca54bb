//! Reconciliation with the remote store: full fetches, queue replay,
//! connectivity transitions and change-feed merges.

use crate::cache::LocalCacheExt;
use crate::connectivity::Connectivity;
use crate::engine::{QUEUE_KEY, Scheduler};
use crate::error::{LegendError, LegendResult};
use crate::notify::Notice;
use crate::queue::QueuedAction;
use crate::remote::ChangeEvent;

/// Result of a completed replay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Actions committed during this pass.
    pub committed: usize,
}

impl Scheduler {
    /// Replace local state with the remote store's contents, with actions
    /// still waiting in the queue applied on top.
    pub(super) async fn fetch_remote(&mut self) -> LegendResult<()> {
        self.set_loading(true);
        let fetched = self.remote.fetch_all().await;
        self.set_loading(false);

        match fetched {
            Ok(mut events) => {
                tracing::debug!(
                    events = events.len(),
                    pending = self.queue.len(),
                    "fetched remote state"
                );
                self.queue.apply_to(&mut events);
                self.replace_events(events);
                Ok(())
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::error("Could not fetch timetable data", &e));
                Err(e)
            }
        }
    }

    /// Bring local state up to date with the remote store.
    ///
    /// Pending actions are replayed first; otherwise a plain fetch would
    /// discard them.
    pub async fn refresh(&mut self) -> LegendResult<()> {
        if !self.is_online() {
            return Err(LegendError::RequiresConnection("Refreshing".into()));
        }
        if self.queue.is_empty() {
            self.fetch_remote().await
        } else {
            self.replay().await.map(|_| ())
        }
    }

    /// Replay queued actions in order, then re-fetch.
    ///
    /// The first failure stops the pass: the failed action and everything
    /// after it go back to the front of the queue, ahead of anything queued
    /// meanwhile, and wait for the next replay. Actions already committed are
    /// not retried. If an `add` went through before the halt, local state is
    /// re-fetched so its row takes on the server id.
    pub async fn replay(&mut self) -> LegendResult<ReplaySummary> {
        if !self.is_online() {
            return Err(LegendError::RequiresConnection("Syncing".into()));
        }

        let snapshot = self.queue.take_all();
        let total = snapshot.len();
        if total > 0 {
            tracing::info!(pending = total, "replaying offline changes");
        }

        let mut remaining = snapshot.into_iter();
        let mut committed = 0;
        let mut added = 0;
        while let Some(action) = remaining.next() {
            tracing::debug!(%action, "replaying");
            if let Err(e) = self.commit_action(&action).await {
                let mut unsent = vec![action];
                unsent.extend(remaining);
                let left = unsent.len();
                self.queue.requeue_front(unsent);
                if let Err(cache_err) = self.persist_queue() {
                    tracing::warn!("could not cache queue: {cache_err}");
                }

                tracing::warn!(committed, left, "replay halted: {e}");
                if added > 0 {
                    if let Err(fetch_err) = self.fetch_remote().await {
                        tracing::warn!(added, "added rows keep temporary ids: {fetch_err}");
                    }
                }
                self.notifier.notify(Notice::error(
                    "Sync failed",
                    format!("{left} change(s) will retry on the next sync ({e})"),
                ));
                return Err(e);
            }

            committed += 1;
            if matches!(action, QueuedAction::Add { .. }) {
                added += 1;
            }
            // Keep the persisted queue equal to what is still unsent
            self.persist_in_flight(remaining.as_slice());
        }

        if let Err(e) = self.fetch_remote().await {
            tracing::warn!("replayed {committed} change(s) but could not refresh: {e}");
        }
        if committed > 0 {
            self.notifier.notify(Notice::success(
                "Sync complete",
                &format!("{committed} offline change(s) synced."),
            ));
        }

        Ok(ReplaySummary { committed })
    }

    fn persist_in_flight(&self, unsent: &[QueuedAction]) {
        let mut pending = self.queue.clone();
        pending.requeue_front(unsent.to_vec());
        if let Err(e) = self.cache.save(&self.scope.key(QUEUE_KEY), &pending) {
            tracing::warn!("could not cache queue: {e}");
        }
    }

    /// React to a connectivity transition. Going online triggers a replay,
    /// whose summary is returned.
    pub async fn set_connectivity(
        &mut self,
        status: Connectivity,
    ) -> Option<LegendResult<ReplaySummary>> {
        if self.connectivity == status {
            return None;
        }
        self.connectivity = status;
        tracing::info!(%status, pending = self.queue.len(), "connectivity changed");

        match status {
            Connectivity::Offline => {
                self.notifier.notify(Notice::info(
                    "You are offline",
                    "Changes will be saved locally and synced when you reconnect.",
                ));
                None
            }
            Connectivity::Online => {
                self.notifier
                    .notify(Notice::info("Back online", "Syncing your changes..."));
                Some(self.replay().await)
            }
        }
    }

    /// Merge a pushed change into local state. Ignored while offline.
    /// Returns whether local state changed.
    pub fn apply_remote_change(&mut self, change: ChangeEvent) -> bool {
        if !self.is_online() {
            tracing::debug!("ignoring change feed event while offline");
            return false;
        }

        let changed = match change {
            ChangeEvent::Insert { event } => {
                if self.events.iter().any(|e| e.id == event.id) {
                    false
                } else {
                    self.events.push(event);
                    true
                }
            }
            ChangeEvent::Update { event } => {
                match self.events.iter_mut().find(|e| e.id == event.id) {
                    Some(existing) if *existing != event => {
                        *existing = event;
                        true
                    }
                    _ => false,
                }
            }
            ChangeEvent::Delete { id } => {
                let before = self.events.len();
                self.events.retain(|e| e.id != id);
                self.events.len() != before
            }
        };

        if changed {
            if let Err(e) = self.persist_events() {
                tracing::warn!("could not cache events: {e}");
            }
        }
        changed
    }
}
