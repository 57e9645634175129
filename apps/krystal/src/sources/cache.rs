//! # Response Cache
//!
//! Bounded, time-limited cache of decoded source responses, shared by clones
//! of a client. A zero TTL disables caching.

use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;

/// Maximum number of cached responses per client.
pub const MAX_CACHED_RESPONSES: u64 = 1_000;

/// Shared TTL cache keyed by request URL.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Option<Cache<String, Value>>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_CACHED_RESPONSES)
    }

    #[must_use]
    pub fn with_capacity(ttl: Duration, max_entries: u64) -> Self {
        if ttl.is_zero() {
            return Self { inner: None };
        }
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner: Some(cache) }
    }

    /// Fresh entry for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Value> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    pub async fn insert(&self, key: String, value: Value) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value).await;
        }
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }

    /// Number of live entries after pending evictions have run.
    pub async fn len(&self) -> u64 {
        match &self.inner {
            Some(cache) => {
                cache.run_pending_tasks().await;
                cache.entry_count()
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn hit_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("k".to_string(), json!({"a": 1})).await;
        assert_eq!(cache.get("k").await, Some(json!({"a": 1})));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_never_hits() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("k".to_string(), json!(1)).await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let clone = cache.clone();
        clone.insert("k".to_string(), json!("v")).await;
        assert_eq!(cache.len().await, 1);

        cache.clear();
        assert_eq!(clone.get("k").await, None);
        assert_eq!(clone.len().await, 0);
    }

    #[tokio::test]
    async fn distinct_keys_stay_within_capacity() {
        let cache = ResponseCache::with_capacity(Duration::from_secs(3600), 100);
        for i in 0..5_000 {
            cache.insert(format!("q{}", i), json!(i)).await;
        }
        assert!(cache.len().await <= 100);
    }
}
