//! Cache layer
//!
//! An in-process cache (moka) in front of the read-heavy queries: single
//! posts by slug, pages of the public post list and the category list.
//! Values are stored as JSON so any serializable type can be cached.
//!
//! # Usage
//!
//! ```rust,ignore
//! use inkpost::cache::{create_cache, CacheLayer};
//! use inkpost::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default())?;
//! cache.set("post:hello", &post, Duration::from_secs(60)).await?;
//! cache.delete_pattern("posts:*").await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The methods are generic over the cached type, so this trait is not
/// object safe. Services hold the concrete `Cache` type instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values whose key matches a glob pattern (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// The cache used by the services
pub type Cache = MemoryCache;

/// Create the cache from configuration
pub fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    if config.max_capacity == 0 {
        anyhow::bail!("cache.max_capacity must be greater than 0");
    }
    let ttl = Duration::from_secs(config.ttl_seconds);
    Ok(Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        ttl,
    )))
}
