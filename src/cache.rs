//! Injectable cache seam for gamma lookups reused across producers.
//!
//! Producers never talk to a global cache. They receive a `&dyn Cache`,
//! which keeps every pipeline stage constructible in tests with a
//! `NoCache` and lets the daemon share one `MemoryCache` across cycles.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::clock::now_ms;

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value, ttl: Duration);
}

struct Entry {
    expires_at_ms: u64,
    value: Value,
}

/// Process-local cache with per-entry TTL. Expired entries are dropped
/// lazily on access.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = now_ms();
        match entries.get(key) {
            Some(entry) if entry.expires_at_ms > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let expires_at_ms = now_ms().saturating_add(ttl.as_millis() as u64);
        entries.insert(key.to_string(), Entry { expires_at_ms, value });
    }
}

/// Cache that never holds anything. Used by the one-shot binaries, where
/// a fresh process has nothing worth reusing.
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn put(&self, _key: &str, _value: Value, _ttl: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hit_within_ttl() {
        let cache = MemoryCache::new();
        cache.put("k", json!({"slug": "abc"}), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!({"slug": "abc"})));
    }

    #[test]
    fn zero_ttl_entry_is_already_expired() {
        let cache = MemoryCache::new();
        cache.put("k", json!(1), Duration::ZERO);
        assert_eq!(cache.get("k"), None);
        // expired entry was purged, not just hidden
        let entries = cache.entries.lock().expect("lock");
        assert!(entries.is_empty());
    }

    #[test]
    fn no_cache_never_stores() {
        let cache = NoCache;
        cache.put("k", json!(1), Duration::from_secs(60));
        assert_eq!(cache.get("k"), None);
    }
}
