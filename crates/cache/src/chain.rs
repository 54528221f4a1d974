//! The cache-aside decorator.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{CacheTier, LookupError};

/// Authoritative tier: a durable store or a remote service.
///
/// `Ok(None)` means the origin answered and has no such record; `Err` means
/// the origin could not be asked. The chain treats both as not found.
#[async_trait]
pub trait Origin<K, V>: Send + Sync {
    async fn fetch(&self, key: &K) -> anyhow::Result<Option<V>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Cache,
    Origin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
    pub provenance: Provenance,
}

/// Read-through chain over one cache tier and one origin.
pub struct CacheAside<K, V> {
    namespace: String,
    cache: Arc<dyn CacheTier<V>>,
    origin: Arc<dyn Origin<K, V>>,
}

impl<K, V> Clone for CacheAside<K, V> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            cache: Arc::clone(&self.cache),
            origin: Arc::clone(&self.origin),
        }
    }
}

impl<K, V> CacheAside<K, V>
where
    K: Display + Clone + Send + Sync,
    V: Send + Sync,
{
    /// `namespace` prefixes every cache key, e.g. `user` gives `user:7`.
    pub fn new(
        namespace: impl Into<String>,
        cache: Arc<dyn CacheTier<V>>,
        origin: Arc<dyn Origin<K, V>>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            cache,
            origin,
        }
    }

    pub fn cache_key(&self, key: &K) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Cache hit returns without calling the origin. On a miss the origin is
    /// asked and a found value is written back before returning.
    pub async fn get(&self, key: &K) -> Result<CacheEntry<K, V>, LookupError> {
        let cache_key = self.cache_key(key);

        match self.cache.get(&cache_key).await {
            Ok(Some(value)) => {
                debug!(key = %cache_key, "cache hit");
                return Ok(CacheEntry {
                    key: key.clone(),
                    value,
                    provenance: Provenance::Cache,
                });
            }
            Ok(None) => debug!(key = %cache_key, "cache miss"),
            Err(error) => warn!(key = %cache_key, %error, "cache read failed, falling through to origin"),
        }

        let value = match self.origin.fetch(key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Err(LookupError::NotFound(cache_key)),
            Err(error) => {
                warn!(key = %cache_key, error = ?error, "origin lookup failed");
                return Err(LookupError::NotFound(cache_key));
            }
        };

        if let Err(error) = self.cache.set(&cache_key, &value).await {
            warn!(key = %cache_key, %error, "failed to populate cache");
        }

        Ok(CacheEntry {
            key: key.clone(),
            value,
            provenance: Provenance::Origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheError, CacheResult, MemoryCache};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingOrigin {
        values: HashMap<i64, String>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingOrigin {
        fn new(values: &[(i64, &str)]) -> Self {
            Self {
                values: values.iter().map(|(k, v)| (*k, v.to_string())).collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Origin<i64, String> for CountingOrigin {
        async fn fetch(&self, key: &i64) -> anyhow::Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("origin unavailable");
            }
            Ok(self.values.get(key).cloned())
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheTier<String> for BrokenCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Backend("down".into()))
        }

        async fn set(&self, _key: &str, _value: &String) -> CacheResult<()> {
            Err(CacheError::Backend("down".into()))
        }
    }

    fn chain(origin: Arc<CountingOrigin>, ttl: Option<Duration>) -> CacheAside<i64, String> {
        CacheAside::new("usr", Arc::new(MemoryCache::new(ttl)), origin)
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let origin = Arc::new(CountingOrigin::new(&[(7, "alice")]));
        let chain = chain(origin.clone(), None);

        let first = chain.get(&7).await.unwrap();
        let second = chain.get(&7).await.unwrap();

        assert_eq!(first.provenance, Provenance::Origin);
        assert_eq!(second.provenance, Provenance::Cache);
        assert_eq!(first.value, second.value);
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_go_back_to_origin() {
        let origin = Arc::new(CountingOrigin::new(&[(7, "alice")]));
        let chain = chain(origin.clone(), Some(Duration::from_secs(60)));

        chain.get(&7).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(chain.get(&7).await.unwrap().provenance, Provenance::Cache);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(chain.get(&7).await.unwrap().provenance, Provenance::Origin);
        assert_eq!(origin.calls(), 2);
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let origin = Arc::new(CountingOrigin::new(&[]));
        let chain = chain(origin.clone(), None);

        assert_eq!(
            chain.get(&9).await.unwrap_err(),
            LookupError::NotFound("usr:9".into())
        );
        assert!(chain.get(&9).await.is_err());
        assert_eq!(origin.calls(), 2);
    }

    #[tokio::test]
    async fn origin_failure_surfaces_as_not_found() {
        let mut origin = CountingOrigin::new(&[(7, "alice")]);
        origin.fail = true;
        let chain = chain(Arc::new(origin), None);

        assert!(matches!(chain.get(&7).await, Err(LookupError::NotFound(_))));
    }

    #[tokio::test]
    async fn broken_cache_tier_degrades_to_origin_reads() {
        let origin = Arc::new(CountingOrigin::new(&[(7, "alice")]));
        let chain: CacheAside<i64, String> =
            CacheAside::new("usr", Arc::new(BrokenCache), origin.clone());

        assert_eq!(chain.get(&7).await.unwrap().value, "alice");
        assert_eq!(chain.get(&7).await.unwrap().provenance, Provenance::Origin);
        assert_eq!(origin.calls(), 2);
    }
}
