//! Cached user resolution in front of the identity service.

use std::sync::Arc;

use async_trait::async_trait;
use roomcast_cache::{CacheAside, MemoryCache, Origin};
use roomcast_config::IdentityConfig;
use tracing::debug;

use crate::entities::UserProfile;
use crate::services::identity_client::IdentityService;

/// Best-effort profile lookup. `None` means the user could not be resolved
/// for any reason.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn lookup(&self, user_id: i64) -> Option<UserProfile>;
}

/// Adapts an [`IdentityService`] to the cache chain's origin contract.
pub struct IdentityOrigin {
    identity: Arc<dyn IdentityService>,
}

impl IdentityOrigin {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl Origin<i64, UserProfile> for IdentityOrigin {
    async fn fetch(&self, user_id: &i64) -> anyhow::Result<Option<UserProfile>> {
        Ok(Some(self.identity.get_user_by_id(*user_id).await?))
    }
}

#[derive(Clone)]
pub struct UserResolver {
    chain: CacheAside<i64, UserProfile>,
}

impl UserResolver {
    pub const NAMESPACE: &'static str = "usr";

    pub fn new(identity: Arc<dyn IdentityService>, config: &IdentityConfig) -> Self {
        let cache = Arc::new(MemoryCache::new(Some(config.user_cache_ttl())));
        Self {
            chain: CacheAside::new(Self::NAMESPACE, cache, Arc::new(IdentityOrigin::new(identity))),
        }
    }
}

#[async_trait]
impl UserLookup for UserResolver {
    async fn lookup(&self, user_id: i64) -> Option<UserProfile> {
        match self.chain.get(&user_id).await {
            Ok(entry) => Some(entry.value),
            Err(error) => {
                debug!(user_id, %error, "user could not be resolved");
                None
            }
        }
    }
}
