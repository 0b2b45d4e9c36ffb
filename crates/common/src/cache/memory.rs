//! In-process cache store
//!
//! Used when no Redis URL is configured or Redis cannot be reached. Built on
//! `moka`, which handles capacity and per-entry expiry concurrently.
//! Each entry also records its deadline on the tokio clock and is treated as
//! gone once that passes, so paused-time tests can step past a TTL.

use super::CacheStore;
use crate::errors::Result;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
    expires_at: Instant,
}

impl Entry {
    fn new(value: String, ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        Self {
            value,
            ttl,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Expires each entry after the ttl it was written with
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// `CacheStore` backed by a bounded `moka` cache in process memory
pub struct MemoryCache {
    entries: Cache<String, Entry>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of entries
    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries.max(1))
                .expire_after(EntryTtl)
                .build(),
        }
    }

    /// Number of entries after pending evictions are applied
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key).await {
            Some(entry) if entry.is_live() => Ok(Some(entry.value)),
            Some(_) => {
                self.entries.invalidate(key).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<()> {
        self.entries
            .insert(key.to_string(), Entry::new(value, ttl_secs))
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .remove(key)
            .await
            .is_some_and(|entry| entry.is_live()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryCache::new();
        assert_ok!(cache.set_ex("k", "v".into(), 120).await);

        tokio::time::advance(Duration::from_secs(119)).await;
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_restarts_ttl() {
        let cache = MemoryCache::new();
        assert_ok!(cache.set_ex("k", "old".into(), 10).await);

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_ok!(cache.set_ex("k", "new".into(), 10).await);

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = MemoryCache::with_capacity(2);
        for i in 0..20 {
            assert_ok!(cache.set_ex(&format!("k{}", i), i.to_string(), 60).await);
        }

        assert!(cache.len().await <= 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();
        assert_ok!(cache.set_ex("k", "v".into(), 60).await);
        assert!(assert_ok!(cache.delete("k").await));
        assert!(!assert_ok!(cache.delete("k").await));
        assert_ok!(cache.ping().await);
    }
}
