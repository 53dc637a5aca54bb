//! Schedule event types.
//!
//! An [`Event`] is one block on the weekly grid. Events with an owner are
//! "personal" and only their owner may edit them; events without one are
//! "general" and shared by everybody. Engagement (users opting in to an
//! event) is tracked separately from ownership.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LegendError, LegendResult};

const TEMPORARY_ID_PREFIX: &str = "offline-";

/// Identifier of an event.
///
/// Committed events carry the id the remote store assigned. Events created
/// while offline carry a temporary `offline-...` id until the next full fetch
/// replaces them with their committed counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        EventId(id.into())
    }

    /// A fresh local id for an optimistic entry.
    pub fn temporary() -> Self {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        EventId(format!(
            "{}{}-{}",
            TEMPORARY_ID_PREFIX,
            Utc::now().timestamp_millis(),
            &nonce[..8]
        ))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        EventId::new(id)
    }
}

/// Day of the week, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl DayOfWeek {
    pub const SUNDAY: DayOfWeek = DayOfWeek(0);
    pub const MONDAY: DayOfWeek = DayOfWeek(1);
    pub const TUESDAY: DayOfWeek = DayOfWeek(2);
    pub const WEDNESDAY: DayOfWeek = DayOfWeek(3);
    pub const THURSDAY: DayOfWeek = DayOfWeek(4);
    pub const FRIDAY: DayOfWeek = DayOfWeek(5);
    pub const SATURDAY: DayOfWeek = DayOfWeek(6);

    pub fn new(index: u8) -> LegendResult<Self> {
        if index < 7 {
            Ok(DayOfWeek(index))
        } else {
            Err(LegendError::Validation(format!(
                "day of week must be 0-6, got {index}"
            )))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        DAY_NAMES[self.0 as usize]
    }

    /// All seven days, Sunday first.
    pub fn all() -> impl Iterator<Item = DayOfWeek> {
        (0..7).map(DayOfWeek)
    }

    /// The weekday a calendar date falls on.
    pub fn of(date: &impl Datelike) -> Self {
        DayOfWeek(date.weekday().num_days_from_sunday() as u8)
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = LegendError;

    fn try_from(index: u8) -> LegendResult<Self> {
        DayOfWeek::new(index)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> u8 {
        day.0
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DayOfWeek {
    type Err = LegendError;

    /// Accepts an index ("0".."6"), a full name, or a three-letter prefix.
    fn from_str(s: &str) -> LegendResult<Self> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u8>() {
            return DayOfWeek::new(index);
        }

        let lower = s.to_lowercase();
        DAY_NAMES
            .iter()
            .position(|name| {
                let name = name.to_lowercase();
                lower.len() >= 3 && name.starts_with(&lower)
            })
            .map(|i| DayOfWeek(i as u8))
            .ok_or_else(|| LegendError::Validation(format!("Unknown day '{s}'")))
    }
}

/// A scheduled block on the weekly grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Owning user, or `None` for a general event.
    pub owner_id: Option<String>,
    pub day: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub engaging_user_ids: BTreeSet<String>,

    // Snapshot of the owner's identity at the last write
    pub owner_name: Option<String>,
    pub owner_color: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn from_draft(id: EventId, draft: EventDraft) -> Self {
        Event {
            id,
            owner_id: draft.owner_id,
            day: draft.day,
            start_time: draft.start_time,
            end_time: draft.end_time,
            title: draft.title,
            description: draft.description,
            engaging_user_ids: BTreeSet::new(),
            owner_name: draft.owner_name,
            owner_color: draft.owner_color,
            created_at: Utc::now(),
        }
    }

    pub fn is_general(&self) -> bool {
        self.owner_id.is_none()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }

    /// General events are open to everyone, personal ones only to their owner.
    pub fn can_be_modified_by(&self, user_id: Option<&str>) -> bool {
        match (&self.owner_id, user_id) {
            (None, _) => true,
            (Some(owner), Some(user)) => owner == user,
            (Some(_), None) => false,
        }
    }

    /// Half-open overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Event) -> bool {
        self.start_time < other.end_time && self.end_time > other.start_time
    }

    pub fn validate(&self) -> LegendResult<()> {
        validate_fields(&self.title, self.start_time, self.end_time)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{} {}",
            self.day,
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M"),
            self.title
        )
    }
}

fn validate_fields(title: &str, start: NaiveTime, end: NaiveTime) -> LegendResult<()> {
    if title.trim().is_empty() {
        return Err(LegendError::Validation("title is required".into()));
    }
    if end <= start {
        return Err(LegendError::Validation(format!(
            "end time {} must be after start time {}",
            end.format("%H:%M"),
            start.format("%H:%M")
        )));
    }
    Ok(())
}

/// The caller-supplied fields of a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub owner_id: Option<String>,
    pub day: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub title: String,
    pub description: Option<String>,
    pub owner_name: Option<String>,
    pub owner_color: Option<String>,
}

impl EventDraft {
    /// A general (unowned) event.
    pub fn general(day: DayOfWeek, start: NaiveTime, end: NaiveTime, title: &str) -> Self {
        EventDraft {
            owner_id: None,
            day,
            start_time: start,
            end_time: end,
            title: title.to_string(),
            description: None,
            owner_name: None,
            owner_color: None,
        }
    }

    /// A personal event owned by `profile`, stamped with its current name and color.
    pub fn personal(
        profile: &UserProfile,
        day: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
        title: &str,
    ) -> Self {
        EventDraft {
            owner_id: Some(profile.id.clone()),
            owner_name: Some(profile.name.clone()),
            owner_color: profile.color.clone(),
            ..EventDraft::general(day, start, end, title)
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string()).filter(|d| !d.is_empty());
        self
    }

    pub fn validate(&self) -> LegendResult<()> {
        validate_fields(&self.title, self.start_time, self.end_time)
    }
}

/// A partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<DayOfWeek>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engaging_user_ids: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// `Some(None)` clears the color.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_color: Option<Option<String>>,
}

impl EventPatch {
    pub fn engagement(engaging_user_ids: BTreeSet<String>) -> Self {
        EventPatch {
            engaging_user_ids: Some(engaging_user_ids),
            ..Default::default()
        }
    }

    pub fn owner_snapshot(name: &str, color: Option<&str>) -> Self {
        EventPatch {
            owner_name: Some(name.to_string()),
            owner_color: Some(color.map(String::from)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == EventPatch::default()
    }

    pub fn apply_to(&self, event: &mut Event) {
        if let Some(day) = self.day {
            event.day = day;
        }
        if let Some(start) = self.start_time {
            event.start_time = start;
        }
        if let Some(end) = self.end_time {
            event.end_time = end;
        }
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(engaging) = &self.engaging_user_ids {
            event.engaging_user_ids = engaging.clone();
        }
        if let Some(name) = &self.owner_name {
            event.owner_name = Some(name.clone());
        }
        if let Some(color) = &self.owner_color {
            event.owner_color = color.clone();
        }
    }

    /// Fold a later patch into this one; fields set in `later` win.
    pub fn merge(&mut self, later: &EventPatch) {
        macro_rules! take {
            ($field:ident) => {
                if later.$field.is_some() {
                    self.$field = later.$field.clone();
                }
            };
        }
        take!(day);
        take!(start_time);
        take!(end_time);
        take!(title);
        take!(description);
        take!(engaging_user_ids);
        take!(owner_name);
        take!(owner_color);
    }
}

// Keeps an explicit `null` distinct from an absent field.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// The acting user's display identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl UserProfile {
    pub fn new(id: &str, name: &str) -> Self {
        UserProfile {
            id: id.to_string(),
            name: name.to_string(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}
