//! In-process cache, for tests and embedders that persist elsewhere.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::{CacheKey, LocalCache};
use crate::error::{LegendError, LegendResult};

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> LegendResult<std::sync::MutexGuard<'_, HashMap<CacheKey, String>>> {
        self.entries
            .lock()
            .map_err(|_| LegendError::Cache("memory cache lock poisoned".into()))
    }
}

impl LocalCache for MemoryCache {
    fn read(&self, key: &CacheKey) -> LegendResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn write(&self, key: &CacheKey, value: &str) -> LegendResult<()> {
        self.entries()?.insert(key.clone(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> LegendResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}
