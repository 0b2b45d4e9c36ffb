//! Response caching
//!
//! Provides:
//! - `CacheStore`, a string key/value store with per-entry TTL
//! - Redis and in-process implementations
//! - `ResponseCache`, a JSON wrapper whose failures never reach callers
//! - Deterministic key generation from a prefix and parameters

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::{RedisCache, RedisCacheConfig};

use crate::errors::{AppError, Result};
use crate::metrics::{record_cache, record_cache_error};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key/value store with expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<()>;

    /// Returns whether a key was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn ping(&self) -> Result<()>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

/// Build a cache key from a prefix and parameters.
///
/// Parameters are sorted by name, so the same set always yields the same
/// key regardless of the order it was given in:
/// `news_list` + `[(page, 0), (platform, all)]` -> `news_list:page:0:platform:all`.
pub fn generate_key(prefix: &str, params: &[(&str, String)]) -> String {
    let sorted: BTreeMap<&str, &str> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

    let mut key = String::from(prefix);
    for (name, value) in sorted {
        key.push(':');
        key.push_str(name);
        key.push(':');
        key.push_str(value);
    }
    key
}

/// Cache label for metrics: the key's prefix
fn cache_name(key: &str) -> String {
    key.split(':').next().unwrap_or(key).to_string()
}

/// JSON response cache over a `CacheStore`.
///
/// Reads and writes are best-effort: an unreachable or misbehaving store is
/// logged, counted, and otherwise treated as a miss.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    default_ttl_secs: u64,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl_secs: u64) -> Self {
        Self {
            store,
            default_ttl_secs,
        }
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Cached value for `key`, or `None` on miss or any failure
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                record_cache_error("get");
                return None;
            }
        };

        let Some(json) = raw else {
            debug!(key = %key, "Cache miss");
            record_cache(false, &cache_name(key));
            return None;
        };

        match serde_json::from_str(&json) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                record_cache(true, &cache_name(key));
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value did not parse, treating as miss");
                record_cache_error("decode");
                None
            }
        }
    }

    /// Store `value` under `key` with the default TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl_secs).await
    }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize value for cache");
                record_cache_error("encode");
                return;
            }
        };

        if let Err(e) = self.store.set_ex(key, json, ttl_secs).await {
            warn!(key = %key, error = %e, "Failed to cache value, continuing without cache");
            record_cache_error("set");
        }
    }

    /// Remove `key`; failures are logged and reported as "nothing removed"
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(deleted) => {
                debug!(key = %key, deleted, "Cache delete");
                deleted
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                record_cache_error("delete");
                false
            }
        }
    }

    /// Cached value, or the loader's value which is then cached.
    /// Loader errors propagate and nothing is cached for them.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let value = loader().await?;
        self.set(key, &value).await;
        Ok(value)
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await.map_err(|e| match e {
            AppError::CacheError { .. } => e,
            other => AppError::CacheError {
                message: other.to_string(),
            },
        })
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose every operation fails
    #[derive(Default)]
    pub struct FailingCache {
        pub calls: AtomicUsize,
    }

    impl FailingCache {
        fn fail<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::CacheError {
                message: "connection refused".to_string(),
            })
        }
    }

    #[async_trait]
    impl CacheStore for FailingCache {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            self.fail()
        }

        async fn set_ex(&self, _key: &str, _value: String, _ttl_secs: u64) -> Result<()> {
            self.fail()
        }

        async fn delete(&self, _key: &str) -> Result<bool> {
            self.fail()
        }

        async fn ping(&self) -> Result<()> {
            self.fail()
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FailingCache;
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio_test::assert_err;

    #[test]
    fn test_generate_key_sorts_params() {
        let a = generate_key(
            "news_list",
            &[("platform", "all".to_string()), ("page", "0".to_string())],
        );
        let b = generate_key(
            "news_list",
            &[("page", "0".to_string()), ("platform", "all".to_string())],
        );

        assert_eq!(a, "news_list:page:0:platform:all");
        assert_eq!(a, b);
        assert_eq!(generate_key("news_detail", &[]), "news_detail");
    }

    #[test]
    fn test_generate_key_distinguishes_values() {
        let first = generate_key("news_list", &[("page", "1".to_string())]);
        let second = generate_key("news_list", &[("page", "2".to_string())]);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_round_trip_through_memory() {
        let cache = ResponseCache::new(Arc::new(MemoryCache::new()), 120);
        cache.set("news_detail:slug:a", &vec![1u32, 2, 3]).await;

        let cached: Option<Vec<u32>> = cache.get("news_detail:slug:a").await;
        assert_eq!(cached, Some(vec![1, 2, 3]));
        assert!(cache.delete("news_detail:slug:a").await);
        assert_eq!(cache.get::<Vec<u32>>("news_detail:slug:a").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies() {
        let cache = ResponseCache::new(Arc::new(MemoryCache::new()), 120);
        cache.set("k", &"v").await;

        tokio::time::advance(Duration::from_secs(121)).await;
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let store = Arc::new(FailingCache::default());
        let cache = ResponseCache::new(store.clone(), 120);

        assert_eq!(cache.get::<String>("k").await, None);
        cache.set("k", &"v").await;
        assert!(!cache.delete("k").await);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_err!(cache.ping().await);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let store = Arc::new(MemoryCache::new());
        store.set_ex("k", "not json".to_string(), 60).await.unwrap();
        let cache = ResponseCache::new(store, 60);

        assert_eq!(cache.get::<Vec<u32>>("k").await, None);
    }

    #[tokio::test]
    async fn test_get_or_load() {
        let cache = ResponseCache::new(Arc::new(MemoryCache::new()), 60);

        let first: Vec<u32> = cache.get_or_load("k", || async { Ok(vec![7]) }).await.unwrap();
        let second: Vec<u32> = cache
            .get_or_load("k", || async { Err(AppError::Internal { message: "not called".into() }) })
            .await
            .unwrap();
        assert_eq!(first, second);

        let err = cache
            .get_or_load::<Vec<u32>, _, _>("missing", || async {
                Err(AppError::Internal { message: "boom".into() })
            })
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(cache.get::<Vec<u32>>("missing").await, None);
    }
}
