//! Redis cache store

use super::CacheStore;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::debug;

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis URL (redis://host:port/db)
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: String,
}

/// Redis-backed `CacheStore`
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl RedisCache {
    /// Connect to Redis
    pub async fn new(config: RedisCacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to create Redis client: {}", e)
            })?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self { connection, config })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(&full_key).await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to get key '{}': {}", full_key, e),
            })?;

        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<()> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        conn.set_ex::<_, _, ()>(&full_key, value, ttl_secs)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })?;

        debug!(key = %full_key, ttl_secs, "Cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&full_key).await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to delete key '{}': {}", full_key, e),
            })?;

        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
