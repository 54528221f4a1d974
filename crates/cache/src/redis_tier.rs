//! Shared cache tier backed by Redis. Values are stored as JSON strings.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;

use crate::{CacheResult, CacheTier};

pub struct RedisCache<V> {
    connection: ConnectionManager,
    key_prefix: String,
    ttl: Option<Duration>,
    _value: PhantomData<fn() -> V>,
}

impl<V> RedisCache<V> {
    pub fn new(connection: ConnectionManager, key_prefix: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            connection,
            key_prefix: key_prefix.into(),
            ttl,
            _value: PhantomData,
        }
    }

    fn full_key(&self, key: &str) -> String {
        prefixed(&self.key_prefix, key)
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{key}")
    }
}

#[async_trait]
impl<V> CacheTier<V> for RedisCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &str) -> CacheResult<Option<V>> {
        let key = self.full_key(key);
        let mut conn = self.connection.clone();
        let raw: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;

        match raw {
            Some(json) => {
                trace!(%key, "redis cache hit");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &V) -> CacheResult<()> {
        let key = self.full_key(key);
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(json);
        if let Some(ttl) = self.ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
