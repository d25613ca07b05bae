use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::taxonomy::TaxonSuggestion;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<TaxonSuggestion>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// TTL cache of grouped suggestions, keyed by `"<query>:<limit>"`.
///
/// Expired entries are misses on lookup and are removed by [`ResponseCache::spawn_sweeper`].
#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<TaxonSuggestion>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<Vec<TaxonSuggestion>> {
        let found = self
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.data.clone());

        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn set(&self, key: impl Into<String>, data: Vec<TaxonSuggestion>) {
        self.set_at(key, data, Instant::now());
    }

    pub(crate) fn set_at(&self, key: impl Into<String>, data: Vec<TaxonSuggestion>, now: Instant) {
        let entry = CacheEntry {
            data,
            expires_at: now + self.ttl,
        };
        self.write().insert(key.into(), entry);
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Run [`ResponseCache::sweep`] every TTL until the returned handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cache.ttl.max(Duration::from_millis(1)));
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = cache.len(), "swept expired cache entries");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(key: i64, name: &str) -> TaxonSuggestion {
        TaxonSuggestion {
            accepted_key: key,
            accepted_name: name.to_string(),
            rank: "SPECIES".to_string(),
            family: "Fagaceae".to_string(),
            synonyms: Vec::new(),
        }
    }

    #[test]
    fn test_set_then_get() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("quercus:20", vec![suggestion(1, "Quercus robur")]);

        let cached = cache.get("quercus:20").unwrap();
        assert_eq!(cached, vec![suggestion(1, "Quercus robur")]);
        assert_eq!(cache.stats(), (1, 0));
    }

    #[test]
    fn test_miss_counts_once() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        assert!(cache.get("missing:20").is_none());
        assert_eq!(cache.stats(), (0, 1));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let now = Instant::now();
        let cache = ResponseCache::new(Duration::from_secs(5));
        cache.set_at("quercus:20", vec![suggestion(1, "Quercus robur")], now);

        assert!(cache.get_at("quercus:20", now + Duration::from_secs(4)).is_some());
        assert!(cache.get_at("quercus:20", now + Duration::from_secs(5)).is_none());
        assert_eq!(cache.stats(), (1, 1));
        // Not swept yet, only hidden.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_limits_are_independent() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("quercus:10", vec![suggestion(1, "a")]);
        cache.set("quercus:20", vec![suggestion(1, "a"), suggestion(2, "b")]);

        assert_eq!(cache.get("quercus:10").unwrap().len(), 1);
        assert_eq!(cache.get("quercus:20").unwrap().len(), 2);
    }

    #[test]
    fn test_last_set_wins() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("carex:20", vec![suggestion(1, "old")]);
        cache.set("carex:20", vec![suggestion(2, "new")]);
        assert_eq!(cache.get("carex:20").unwrap()[0].accepted_key, 2);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let now = Instant::now();
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.set_at("old:20", vec![suggestion(1, "old")], now);
        cache.set_at("fresh:20", vec![suggestion(2, "fresh")], now + Duration::from_secs(8));

        assert_eq!(cache.sweep_at(now + Duration::from_secs(11)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("fresh:20", now + Duration::from_secs(11)).is_some());
    }

    #[tokio::test]
    async fn test_sweeper_task_removes_expired_entries() {
        let cache = Arc::new(ResponseCache::new(Duration::from_millis(20)));
        cache.set("quercus:20", vec![suggestion(1, "Quercus robur")]);

        let handle = cache.spawn_sweeper();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(cache.is_empty());
    }
}
