//! Bounded resolution cache.
//!
//! A concurrent map with try-insert semantics: when two resolutions of the
//! same key race, the first insert is kept and the loser returns its own
//! freshly computed value. Overflow evicts an arbitrary entry; callers
//! must only rely on hit-or-recompute behaviour.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

type CacheKey = (String, String);

#[derive(Debug)]
pub(crate) struct PathCache {
    entries: DashMap<CacheKey, PathBuf>,
    capacity: usize,
}

impl PathCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    pub(crate) fn get(&self, path: &str, base: &str) -> Option<PathBuf> {
        self.entries
            .get(&(path.to_string(), base.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub(crate) fn insert(&self, path: &str, base: &str, resolved: &Path) {
        if self.capacity == 0 {
            return;
        }

        let key = (path.to_string(), base.to_string());
        self.entries
            .entry(key.clone())
            .or_insert_with(|| resolved.to_path_buf());

        while self.entries.len() > self.capacity {
            if !self.evict_one(&key) {
                break;
            }
        }
    }

    pub(crate) fn remove(&self, path: &str, base: &str) {
        self.entries.remove(&(path.to_string(), base.to_string()));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Evicts any entry other than `keep`. Returns `false` if none could be.
    fn evict_one(&self, keep: &CacheKey) -> bool {
        // Clone the key out so no shard guard is held during removal
        let victim = self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .find(|key| key != keep);

        victim.is_some_and(|key| self.entries.remove(&key).is_some())
    }
}
