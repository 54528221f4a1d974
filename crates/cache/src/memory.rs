//! Process-local cache tier.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{CacheResult, CacheTier};

#[derive(Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// In-memory map with an optional time-to-live. Expired entries are pruned
/// on write.
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    ttl: Option<Duration>,
}

impl<V> MemoryCache<V> {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_fresh(&self, entry: &Entry<V>, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.stored_at) < ttl,
            None => true,
        }
    }
}

#[async_trait]
impl<V> CacheTier<V> for MemoryCache<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> CacheResult<Option<V>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &V) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                stored_at: now,
            },
        );
        Ok(())
    }
}
