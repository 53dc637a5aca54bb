//! Remote store kept as a JSON table inside a directory.
//!
//! The directory stands in for the hosted backend: when it is missing (an
//! unmounted share, a disconnected sync folder) every call fails the way a
//! network call would. It has no push channel, so its change feed closes
//! immediately.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::error::{LegendError, LegendResult};
use crate::event::{Event, EventId, EventPatch};
use crate::remote::{EventFilter, RemoteStore, Subscription};

const TABLE_FILE: &str = "events.json";

pub struct DirRemote {
    dir: PathBuf,
}

impl DirRemote {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirRemote { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_reachable(&self) -> bool {
        self.dir.is_dir()
    }

    fn ensure_reachable(&self) -> LegendResult<()> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(LegendError::Remote(format!(
                "{} is not reachable",
                self.dir.display()
            )))
        }
    }

    fn read_table(&self) -> LegendResult<Vec<Event>> {
        self.ensure_reachable()?;
        let path = self.dir.join(TABLE_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| LegendError::Remote(format!("corrupt table {}: {e}", path.display())))
    }

    fn write_table(&self, events: &[Event]) -> LegendResult<()> {
        self.ensure_reachable()?;
        let path = self.dir.join(TABLE_FILE);
        let temp = self.dir.join(format!("{TABLE_FILE}.tmp"));
        std::fs::write(&temp, serde_json::to_string_pretty(events)?)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn stored(event: &Event) -> Event {
        let mut stored = event.clone();
        stored.id = EventId::new(uuid::Uuid::new_v4().to_string());
        stored.created_at = Utc::now();
        stored
    }
}

#[async_trait]
impl RemoteStore for DirRemote {
    async fn fetch_all(&self) -> LegendResult<Vec<Event>> {
        self.read_table()
    }

    async fn insert(&self, event: &Event) -> LegendResult<()> {
        self.insert_many(std::slice::from_ref(event)).await
    }

    async fn insert_many(&self, events: &[Event]) -> LegendResult<()> {
        let mut table = self.read_table()?;
        table.extend(events.iter().map(Self::stored));
        self.write_table(&table)
    }

    async fn update(&self, id: &EventId, patch: &EventPatch) -> LegendResult<()> {
        let mut table = self.read_table()?;
        if let Some(event) = table.iter_mut().find(|e| &e.id == id) {
            patch.apply_to(event);
            self.write_table(&table)?;
        }
        Ok(())
    }

    async fn delete(&self, id: &EventId) -> LegendResult<()> {
        let mut table = self.read_table()?;
        let before = table.len();
        table.retain(|e| &e.id != id);
        if table.len() != before {
            self.write_table(&table)?;
        }
        Ok(())
    }

    async fn delete_matching(&self, filter: &EventFilter) -> LegendResult<usize> {
        let mut table = self.read_table()?;
        let before = table.len();
        table.retain(|e| !filter.matches(e));
        let removed = before - table.len();
        self.write_table(&table)?;
        Ok(removed)
    }

    async fn update_owned(&self, owner_id: &str, patch: &EventPatch) -> LegendResult<usize> {
        let mut table = self.read_table()?;
        let mut count = 0;
        for event in table.iter_mut().filter(|e| e.is_owned_by(owner_id)) {
            patch.apply_to(event);
            count += 1;
        }
        self.write_table(&table)?;
        Ok(count)
    }

    async fn subscribe(&self) -> LegendResult<Subscription> {
        self.ensure_reachable()?;
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(Subscription::new(rx))
    }
}
