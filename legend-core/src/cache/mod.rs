//! Durable per-user key-value storage.
//!
//! Every key lives inside a [`CacheScope`] derived from the user id (or the
//! guest scope), so switching users never mixes one user's cached events or
//! pending actions into another's.

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::LegendResult;

const GUEST_SCOPE: &str = "guest";

/// Partition of the cache owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheScope(String);

impl CacheScope {
    pub fn for_user(user_id: Option<&str>) -> Self {
        let scope = user_id
            .map(slug::slugify)
            .filter(|s| !s.is_empty())
            .map(|s| format!("user-{s}"))
            .unwrap_or_else(|| GUEST_SCOPE.to_string());
        CacheScope(scope)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self, name: &'static str) -> CacheKey {
        CacheKey {
            scope: self.clone(),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: CacheScope,
    pub name: &'static str,
}

/// Raw storage. Writes must be durable by the time they return.
pub trait LocalCache: Send + Sync {
    fn read(&self, key: &CacheKey) -> LegendResult<Option<String>>;
    fn write(&self, key: &CacheKey, value: &str) -> LegendResult<()>;
    fn remove(&self, key: &CacheKey) -> LegendResult<()>;
}

/// Typed JSON access on top of [`LocalCache`].
pub trait LocalCacheExt: LocalCache {
    /// Missing or unreadable entries fall back to `T::default()`.
    fn load<T: DeserializeOwned + Default>(&self, key: &CacheKey) -> T {
        let raw = match self.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                tracing::warn!(scope = key.scope.as_str(), key = key.name, "cache read failed: {e}");
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(scope = key.scope.as_str(), key = key.name, "discarding unreadable cache entry: {e}");
            T::default()
        })
    }

    fn save<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) -> LegendResult<()> {
        let raw = serde_json::to_string(value)?;
        self.write(key, &raw)
    }
}

impl<C: LocalCache + ?Sized> LocalCacheExt for C {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_per_user() {
        assert_eq!(CacheScope::for_user(None).as_str(), "guest");
        assert_eq!(CacheScope::for_user(Some("user_a")).as_str(), "user-user-a");
        assert_ne!(CacheScope::for_user(Some("a")), CacheScope::for_user(Some("b")));
    }

    #[test]
    fn test_user_named_guest_does_not_share_the_guest_scope() {
        assert_ne!(CacheScope::for_user(Some("guest")), CacheScope::for_user(None));
    }

    #[test]
    fn test_unreadable_entry_loads_default() {
        let cache = MemoryCache::new();
        let key = CacheScope::for_user(None).key("events");
        cache.write(&key, "{not json").unwrap();

        let loaded: Vec<String> = cache.load(&key);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_typed_round_trip() {
        let cache = MemoryCache::new();
        let key = CacheScope::for_user(Some("user_j")).key("queue");
        cache.save(&key, &vec![1, 2, 3]).unwrap();

        let loaded: Vec<u32> = cache.load(&key);
        assert_eq!(loaded, vec![1, 2, 3]);
    }
}
