//! Optimistic mutations.

use chrono::Utc;

use crate::engine::{Commit, Mutation, MutationOutcome, Scheduler};
use crate::error::{LegendError, LegendResult};
use crate::event::{DayOfWeek, Event, EventDraft, EventId, EventPatch};
use crate::notify::Notice;
use crate::queue::QueuedAction;
use crate::remote::EventFilter;

/// Which events a clear removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    /// The acting user's own events.
    Personal,
    /// Events without an owner.
    General,
}

impl Scheduler {
    pub async fn add_event(&mut self, draft: EventDraft) -> LegendResult<MutationOutcome> {
        draft.validate()?;
        if let Some(owner) = &draft.owner_id {
            if self.user_id() != Some(owner.as_str()) {
                return Err(LegendError::PermissionDenied(format!(
                    "cannot create events for {owner}"
                )));
            }
        }

        let event = Event::from_draft(EventId::temporary(), draft);
        let mut next = self.events.clone();
        next.push(event.clone());

        self.run_mutation(Mutation {
            next,
            commit: Commit::Action(QueuedAction::Add {
                event: event.clone(),
            }),
            queued: vec![QueuedAction::Add { event }],
            refetch: true,
            success: "Event added to timetable.",
            failure: "Could not add event",
        })
        .await
    }

    pub async fn update_event(
        &mut self,
        id: &EventId,
        patch: EventPatch,
    ) -> LegendResult<MutationOutcome> {
        let id = &self.settled_id(id).await?;
        let current = self.find(id)?;
        self.ensure_can_modify(current)?;

        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        updated.validate()?;

        let next = self
            .events
            .iter()
            .map(|e| if &e.id == id { updated.clone() } else { e.clone() })
            .collect();
        let action = QueuedAction::Update {
            id: id.clone(),
            patch,
        };

        self.run_mutation(Mutation {
            next,
            commit: Commit::Action(action.clone()),
            queued: vec![action],
            refetch: false,
            success: "Event updated.",
            failure: "Error updating event",
        })
        .await
    }

    pub async fn delete_event(&mut self, id: &EventId) -> LegendResult<MutationOutcome> {
        let id = &self.settled_id(id).await?;
        let current = self.find(id)?;
        self.ensure_can_modify(current)?;

        let next = self.events.iter().filter(|e| &e.id != id).cloned().collect();
        let action = QueuedAction::Delete { id: id.clone() };

        self.run_mutation(Mutation {
            next,
            commit: Commit::Action(action.clone()),
            queued: vec![action],
            refetch: false,
            success: "Event deleted.",
            failure: "Error deleting event",
        })
        .await
    }

    /// Flip `user_id`'s engagement on an event. Open to every user.
    pub async fn toggle_engagement(
        &mut self,
        id: &EventId,
        user_id: &str,
    ) -> LegendResult<MutationOutcome> {
        let id = &self.settled_id(id).await?;
        let current = self.find(id)?;

        let mut engaging = current.engaging_user_ids.clone();
        if !engaging.remove(user_id) {
            engaging.insert(user_id.to_string());
        }

        let next = self
            .events
            .iter()
            .map(|e| {
                let mut e = e.clone();
                if &e.id == id {
                    e.engaging_user_ids = engaging.clone();
                }
                e
            })
            .collect();
        let action = QueuedAction::ToggleEngagement {
            id: id.clone(),
            engaging_user_ids: engaging,
        };

        self.set_loading(true);
        let result = self
            .run_mutation(Mutation {
                next,
                commit: Commit::Action(action.clone()),
                queued: vec![action],
                refetch: false,
                success: "Engagement updated.",
                failure: "Could not update engagement status",
            })
            .await;
        self.set_loading(false);
        result
    }

    /// Copy every event of `source` onto each destination day.
    ///
    /// Copies get fresh ids and no engagement. Copies of the acting user's own
    /// events carry the user's current name and color rather than the snapshot
    /// stored on the source event. Other users' personal events are left out,
    /// since nobody may create events on someone else's behalf. Returns the
    /// number of events created.
    pub async fn copy_schedule(
        &mut self,
        source: DayOfWeek,
        destinations: &[DayOfWeek],
    ) -> LegendResult<usize> {
        let user_id = self.user_id();
        let sources: Vec<Event> = self
            .events_for_day(source)
            .into_iter()
            .filter(|e| e.can_be_modified_by(user_id))
            .cloned()
            .collect();
        if sources.is_empty() {
            self.notifier.notify(Notice::info(
                "No events to copy",
                "The selected source day has no events.",
            ));
            return Err(LegendError::NothingToCopy(source.to_string()));
        }

        let profile = self.user.clone();
        let copies: Vec<Event> = destinations
            .iter()
            .flat_map(|&day| {
                let profile = profile.as_ref();
                sources.iter().map(move |event| {
                    let mut copy = event.clone();
                    copy.id = EventId::temporary();
                    copy.day = day;
                    copy.engaging_user_ids.clear();
                    copy.created_at = Utc::now();
                    if let Some(profile) = profile.filter(|p| event.is_owned_by(&p.id)) {
                        copy.owner_name = Some(profile.name.clone());
                        copy.owner_color = profile.color.clone();
                    }
                    copy
                })
            })
            .collect();
        let count = copies.len();

        let mut next = self.events.clone();
        next.extend(copies.iter().cloned());
        let queued = copies
            .iter()
            .cloned()
            .map(|event| QueuedAction::Add { event })
            .collect();

        self.run_mutation(Mutation {
            next,
            commit: Commit::InsertMany(copies),
            queued,
            refetch: true,
            success: "Schedule copied successfully.",
            failure: "Could not copy schedule",
        })
        .await?;
        Ok(count)
    }

    /// Remove the personal or general schedule for one day (or every day).
    /// Returns the number of events removed.
    pub async fn clear_schedule(
        &mut self,
        scope: ClearScope,
        day: Option<DayOfWeek>,
    ) -> LegendResult<usize> {
        let filter = match scope {
            ClearScope::Personal => {
                let user_id = self.user_id().ok_or_else(|| {
                    LegendError::PermissionDenied("guests have no personal schedule".into())
                })?;
                EventFilter::owned_by(user_id)
            }
            ClearScope::General => EventFilter::general(),
        }
        .on(day);

        let (removed, next): (Vec<Event>, Vec<Event>) =
            self.events.iter().cloned().partition(|e| filter.matches(e));
        if removed.is_empty() {
            return Ok(0);
        }

        let queued = removed
            .iter()
            .map(|e| QueuedAction::Delete { id: e.id.clone() })
            .collect();

        self.run_mutation(Mutation {
            next,
            commit: Commit::DeleteMatching(filter),
            queued,
            refetch: false,
            success: "Schedule cleared.",
            failure: "Could not clear schedule",
        })
        .await?;
        Ok(removed.len())
    }

    /// Restamp every event owned by `user_id` with a new name and color.
    ///
    /// One bulk commit; there is no queued form, so it needs a connection.
    /// Returns the number of events rewritten.
    pub async fn update_user_entries(
        &mut self,
        user_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> LegendResult<usize> {
        if self.user_id() != Some(user_id) {
            return Err(LegendError::PermissionDenied(format!(
                "cannot rename events of {user_id}"
            )));
        }
        if !self.is_online() {
            self.notifier.notify(Notice::info(
                "Profile saved locally",
                "Existing events will show your new name once you are back online.",
            ));
            return Err(LegendError::RequiresConnection(
                "Updating your existing events".into(),
            ));
        }

        let patch = EventPatch::owner_snapshot(name, color);
        let previous = self.events.clone();
        let mut rewritten = 0;
        let next = self
            .events
            .iter()
            .cloned()
            .map(|mut e| {
                if e.is_owned_by(user_id) {
                    patch.apply_to(&mut e);
                    rewritten += 1;
                }
                e
            })
            .collect();
        self.replace_events(next);

        match self.remote.update_owned(user_id, &patch).await {
            Ok(_) => {
                if let Some(user) = self.user.as_mut() {
                    user.name = name.to_string();
                    user.color = color.map(String::from);
                }
                // Adds still waiting to replay should carry the new identity too
                if self.queue.restamp_pending_adds(user_id, &patch) > 0 {
                    if let Err(e) = self.persist_queue() {
                        tracing::warn!("could not cache restamped queue: {e}");
                    }
                }
                self.notifier
                    .notify(Notice::success("Success", "Your events now show your new name."));
                Ok(rewritten)
            }
            Err(e) => {
                tracing::warn!("bulk owner update failed: {e}");
                self.replace_events(previous);
                self.notifier.notify(Notice::error("Could not update your events", &e));
                Err(e)
            }
        }
    }
}
