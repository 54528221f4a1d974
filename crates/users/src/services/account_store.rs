//! Account reads through a shared cache, writes straight to the table.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use roomcast_cache::{CacheAside, CacheEntry, CacheTier, Origin, RedisCache};
use roomcast_config::RedisConfig;
use roomcast_database::{Account, AccountRepository, DatabaseError};
use tracing::info;

use crate::types::{UserError, UserResult};

pub struct AccountOrigin {
    repository: AccountRepository,
}

impl AccountOrigin {
    pub fn new(repository: AccountRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Origin<i64, Account> for AccountOrigin {
    async fn fetch(&self, user_id: &i64) -> anyhow::Result<Option<Account>> {
        Ok(self.repository.find_by_id(*user_id).await?)
    }
}

/// Cache-aside account store. Only `find_by_id` is cached; every update goes
/// directly to the repository and the cached copy ages out by TTL.
#[derive(Clone)]
pub struct CachedAccountStore {
    repository: AccountRepository,
    chain: CacheAside<i64, Account>,
}

impl CachedAccountStore {
    pub const NAMESPACE: &'static str = "user";

    pub fn new(repository: AccountRepository, cache: Arc<dyn CacheTier<Account>>) -> Self {
        let origin = Arc::new(AccountOrigin::new(repository.clone()));
        Self {
            repository,
            chain: CacheAside::new(Self::NAMESPACE, cache, origin),
        }
    }

    pub fn with_redis(
        repository: AccountRepository,
        connection: ConnectionManager,
        config: &RedisConfig,
    ) -> Self {
        let prefix = config.key_prefix.clone().unwrap_or_default();
        let cache = Arc::new(RedisCache::new(connection, prefix, config.cache_ttl()));
        Self::new(repository, cache)
    }

    pub async fn find_by_id(&self, user_id: i64) -> UserResult<CacheEntry<i64, Account>> {
        self.chain
            .get(&user_id)
            .await
            .map_err(|_| UserError::NotFound(user_id))
    }

    pub async fn find_by_username(&self, username: &str) -> UserResult<Option<Account>> {
        Ok(self.repository.find_by_username(username).await?)
    }

    pub async fn update_profile_pic(&self, user_id: i64, profile_pic: &str) -> UserResult<()> {
        self.repository
            .update_profile_pic(user_id, profile_pic)
            .await
            .map_err(|error| not_found_as(user_id, error))?;
        info!(user_id, "profile picture updated");
        Ok(())
    }

    pub async fn update_username(&self, user_id: i64, username: &str) -> UserResult<()> {
        self.repository
            .update_username(user_id, username)
            .await
            .map_err(|error| not_found_as(user_id, error))
    }
}

fn not_found_as(user_id: i64, error: DatabaseError) -> UserError {
    match error {
        DatabaseError::NotFound(_) => UserError::NotFound(user_id),
        other => other.into(),
    }
}
