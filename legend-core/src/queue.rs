//! Mutations deferred while offline.
//!
//! Queue order is insertion order and survives persistence and replay:
//! mutations do not commute, so they must reach the remote store in the order
//! they were made.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventId, EventPatch};

/// A mutation waiting to be replayed against the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueuedAction {
    Add {
        event: Event,
    },
    Update {
        id: EventId,
        patch: EventPatch,
    },
    Delete {
        id: EventId,
    },
    ToggleEngagement {
        id: EventId,
        engaging_user_ids: BTreeSet<String>,
    },
}

impl QueuedAction {
    pub fn event_id(&self) -> &EventId {
        match self {
            QueuedAction::Add { event } => &event.id,
            QueuedAction::Update { id, .. }
            | QueuedAction::Delete { id }
            | QueuedAction::ToggleEngagement { id, .. } => id,
        }
    }

    /// Apply this action to a local copy of the table, the way the remote
    /// store will once it is replayed.
    pub fn apply_to(&self, events: &mut Vec<Event>) {
        match self {
            QueuedAction::Add { event } => {
                if !events.iter().any(|e| e.id == event.id) {
                    events.push(event.clone());
                }
            }
            QueuedAction::Update { id, patch } => {
                if let Some(event) = events.iter_mut().find(|e| &e.id == id) {
                    patch.apply_to(event);
                }
            }
            QueuedAction::Delete { id } => events.retain(|e| &e.id != id),
            QueuedAction::ToggleEngagement {
                id,
                engaging_user_ids,
            } => {
                if let Some(event) = events.iter_mut().find(|e| &e.id == id) {
                    event.engaging_user_ids = engaging_user_ids.clone();
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueuedAction::Add { .. } => "add",
            QueuedAction::Update { .. } => "update",
            QueuedAction::Delete { .. } => "delete",
            QueuedAction::ToggleEngagement { .. } => "engagement",
        }
    }
}

impl fmt::Display for QueuedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuedAction::Add { event } => write!(f, "add {event}"),
            other => write!(f, "{} {}", other.label(), other.event_id()),
        }
    }
}

/// FIFO of [`QueuedAction`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionQueue {
    actions: VecDeque<QueuedAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedAction> {
        self.actions.iter()
    }

    /// Whether the `add` that created `id` is still waiting to be sent.
    pub fn has_pending_add(&self, id: &EventId) -> bool {
        self.actions
            .iter()
            .any(|queued| matches!(queued, QueuedAction::Add { event } if &event.id == id))
    }

    /// Replay every queued action onto `events` in order.
    pub fn apply_to(&self, events: &mut Vec<Event>) {
        for action in &self.actions {
            action.apply_to(events);
        }
    }

    /// Append an action.
    ///
    /// Actions on an event whose `add` is still queued never reach the remote
    /// store under the temporary id: updates and engagement changes are folded
    /// into the queued `add`, and a delete cancels the `add` together with
    /// everything queued for it.
    pub fn push(&mut self, action: QueuedAction) {
        let id = action.event_id();
        if !id.is_temporary() || matches!(action, QueuedAction::Add { .. }) {
            self.actions.push_back(action);
            return;
        }

        let pending_add = self.actions.iter_mut().find_map(|queued| match queued {
            QueuedAction::Add { event } if &event.id == id => Some(event),
            _ => None,
        });
        let Some(event) = pending_add else {
            self.actions.push_back(action);
            return;
        };

        match action {
            QueuedAction::Update { patch, .. } => patch.apply_to(event),
            QueuedAction::ToggleEngagement {
                engaging_user_ids, ..
            } => event.engaging_user_ids = engaging_user_ids,
            QueuedAction::Delete { id } => self.actions.retain(|queued| queued.event_id() != &id),
            QueuedAction::Add { .. } => unreachable!("adds are appended above"),
        }
    }

    /// Apply `patch` to queued adds owned by `owner_id`; returns how many changed.
    pub fn restamp_pending_adds(&mut self, owner_id: &str, patch: &EventPatch) -> usize {
        let mut count = 0;
        for action in self.actions.iter_mut() {
            if let QueuedAction::Add { event } = action {
                if event.is_owned_by(owner_id) {
                    patch.apply_to(event);
                    count += 1;
                }
            }
        }
        count
    }

    /// Take every queued action, leaving the queue empty.
    pub fn take_all(&mut self) -> Vec<QueuedAction> {
        self.actions.drain(..).collect()
    }

    /// Put actions back in front of anything queued since they were taken,
    /// keeping their relative order.
    pub fn requeue_front(&mut self, actions: Vec<QueuedAction>) {
        for action in actions.into_iter().rev() {
            self.actions.push_front(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DayOfWeek, EventDraft};
    use chrono::NaiveTime;

    fn offline_event(title: &str) -> Event {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        Event::from_draft(
            EventId::temporary(),
            EventDraft::general(DayOfWeek::MONDAY, start, end, title),
        )
    }

    fn delete(id: &str) -> QueuedAction {
        QueuedAction::Delete {
            id: EventId::new(id),
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = ActionQueue::new();
        queue.push(delete("evt-1"));
        queue.push(delete("evt-2"));
        queue.push(delete("evt-3"));

        let ids: Vec<_> = queue.take_all().iter().map(|a| a.event_id().to_string()).collect();
        assert_eq!(ids, vec!["evt-1", "evt-2", "evt-3"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_requeue_front_keeps_order_ahead_of_new_actions() {
        let mut queue = ActionQueue::new();
        queue.push(delete("evt-9"));
        queue.requeue_front(vec![delete("evt-2"), delete("evt-3")]);

        let ids: Vec<_> = queue.iter().map(|a| a.event_id().to_string()).collect();
        assert_eq!(ids, vec!["evt-2", "evt-3", "evt-9"]);
    }

    #[test]
    fn test_update_of_pending_add_is_folded_in() {
        let mut queue = ActionQueue::new();
        let event = offline_event("Draft");
        let id = event.id.clone();
        queue.push(QueuedAction::Add { event });
        queue.push(QueuedAction::Update {
            id: id.clone(),
            patch: EventPatch {
                title: Some("Final".into()),
                ..Default::default()
            },
        });
        queue.push(QueuedAction::ToggleEngagement {
            id,
            engaging_user_ids: BTreeSet::from(["user_a".to_string()]),
        });

        assert_eq!(queue.len(), 1);
        let Some(QueuedAction::Add { event }) = queue.iter().next() else {
            panic!("expected the add to stay queued");
        };
        assert_eq!(event.title, "Final");
        assert!(event.engaging_user_ids.contains("user_a"));
    }

    #[test]
    fn test_delete_of_pending_add_cancels_it() {
        let mut queue = ActionQueue::new();
        let event = offline_event("Oops");
        let id = event.id.clone();
        queue.push(delete("evt-1"));
        queue.push(QueuedAction::Add { event });
        queue.push(QueuedAction::Delete { id });

        let ids: Vec<_> = queue.iter().map(|a| a.event_id().to_string()).collect();
        assert_eq!(ids, vec!["evt-1"]);
    }

    #[test]
    fn test_apply_to_overlays_pending_actions() {
        let committed = Event::from_draft(
            EventId::new("evt-1"),
            EventDraft::general(
                DayOfWeek::MONDAY,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                "Standup",
            ),
        );
        let added = offline_event("Retro");
        let added_id = added.id.clone();

        let mut queue = ActionQueue::new();
        queue.push(QueuedAction::Update {
            id: EventId::new("evt-1"),
            patch: EventPatch {
                title: Some("Standup (moved)".into()),
                ..Default::default()
            },
        });
        queue.push(QueuedAction::Add { event: added });
        queue.push(delete("evt-404"));
        assert!(queue.has_pending_add(&added_id));
        assert!(!queue.has_pending_add(&EventId::new("evt-1")));

        let mut events = vec![committed];
        queue.apply_to(&mut events);
        queue.apply_to(&mut events);

        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Standup (moved)", "Retro"]);
    }

    #[test]
    fn test_persisted_form_is_tagged() {
        let mut queue = ActionQueue::new();
        queue.push(delete("evt-1"));

        let json = serde_json::to_value(&queue).unwrap();
        assert_eq!(json, serde_json::json!([{ "kind": "delete", "id": "evt-1" }]));

        let back: ActionQueue = serde_json::from_value(json).unwrap();
        assert_eq!(back, queue);
    }
}
