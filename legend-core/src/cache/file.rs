//! File-backed cache: one JSON file per key under `<root>/<scope>/`.

use std::path::{Path, PathBuf};

use crate::cache::{CacheKey, LocalCache};
use crate::error::{LegendError, LegendResult};

pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(key.scope.as_str())
            .join(format!("{}.json", key.name))
    }
}

impl LocalCache for FileCache {
    fn read(&self, key: &CacheKey) -> LegendResult<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LegendError::Cache(format!(
                "Could not read {}: {e}",
                path.display()
            ))),
        }
    }

    fn write(&self, key: &CacheKey, value: &str) -> LegendResult<()> {
        let path = self.path(key);
        let dir = self.root.join(key.scope.as_str());
        std::fs::create_dir_all(&dir)?;

        // Write-then-rename so an interrupted write never leaves half a file
        let temp = dir.join(format!("{}.json.tmp", key.name));
        std::fs::write(&temp, value)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> LegendResult<()> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheScope, LocalCacheExt};

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheScope::for_user(Some("user_a")).key("queue");

        FileCache::new(dir.path()).save(&key, &vec!["a", "b"]).unwrap();

        let reopened = FileCache::new(dir.path());
        let loaded: Vec<String> = reopened.load(&key);
        assert_eq!(loaded, vec!["a", "b"]);
        assert!(dir.path().join("user-user-a/queue.json").exists());
        assert!(!dir.path().join("user-user-a/queue.json.tmp").exists());
    }

    #[test]
    fn test_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let key = CacheScope::for_user(None).key("events");

        assert_eq!(cache.read(&key).unwrap(), None);
        cache.remove(&key).unwrap();
    }

    #[test]
    fn test_users_do_not_share_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let alex = CacheScope::for_user(Some("alex")).key("events");
        let jordan = CacheScope::for_user(Some("jordan")).key("events");

        cache.save(&alex, &vec![1]).unwrap();

        let loaded: Vec<u32> = cache.load(&jordan);
        assert!(loaded.is_empty());
    }
}
