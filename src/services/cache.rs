//! Simulated cache cluster.
//!
//! Stands in for the Redis cluster the service would normally talk to.
//! Entries expire lazily: an expired key is removed when it is next read.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::config::CacheConfig;

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Dependency status reported by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub status: &'static str,
    pub cluster: String,
    pub keys: usize,
}

/// A thread-safe in-process key/value store.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<DashMap<String, Entry>>,
    default_ttl: Duration,
    cluster: String,
}

impl CacheService {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            default_ttl: Duration::from_secs(config.default_ttl_secs),
            cluster: config.cluster.clone(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Get a live value.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        if let Some(entry) = self.inner.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        // Guard dropped above; removing while holding it would deadlock the shard.
        self.inner.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    /// Store a value, using the default TTL when none is given.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value, ttl: Option<Duration>) -> Duration {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.inner.insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        ttl
    }

    /// Remove a key, returning whether a live entry was deleted.
    pub fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .remove(key)
            .map(|(_, entry)| entry.is_live(now))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn health(&self) -> CacheHealth {
        CacheHealth {
            status: "UP",
            cluster: self.cluster.clone(),
            keys: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> CacheService {
        CacheService::new(&CacheConfig::default())
    }

    #[test]
    fn test_cache_operations() {
        let cache = cache();
        assert!(cache.get("user:1").is_none());

        let ttl = cache.set("user:1", json!({"name": "kim"}), None);
        assert_eq!(ttl, Duration::from_secs(3600));
        assert_eq!(cache.get("user:1"), Some(json!({"name": "kim"})));

        assert!(cache.delete("user:1"));
        assert!(!cache.delete("user:1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_evicted_on_read() {
        let cache = cache();
        cache.set("short", json!(1), Some(Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(30));

        assert!(cache.get("short").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_health() {
        let cache = cache();
        cache.set("a", json!("b"), None);
        let health = cache.health();
        assert_eq!(health.status, "UP");
        assert_eq!(health.cluster, "redis-cluster:6379");
        assert_eq!(health.keys, 1);
    }
}
