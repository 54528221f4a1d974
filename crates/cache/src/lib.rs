//! # Roomcast Cache Crate
//!
//! A two-tier read path: a fast cache tier in front of an authoritative
//! origin. Reads go to the cache first and fall through to the origin on a
//! miss; a confirmed origin read populates the cache. Writes never touch the
//! cache, so a cached value stays until its TTL runs out.
//!
//! The chain is used twice in the backend: in front of the account table and
//! in front of the remote identity service.

pub mod chain;
pub mod error;
pub mod memory;
pub mod redis_tier;

pub use chain::{CacheAside, CacheEntry, Origin, Provenance};
pub use error::{CacheError, CacheResult, LookupError};
pub use memory::MemoryCache;
pub use redis_tier::RedisCache;

use async_trait::async_trait;

/// Fast tier of the chain. Keys are fully namespaced strings.
#[async_trait]
pub trait CacheTier<V>: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<V>>;

    async fn set(&self, key: &str, value: &V) -> CacheResult<()>;
}
