use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use roomcast_cache::MemoryCache;
use roomcast_chats::{
    HttpRoomDirectory, HubContext, MemoryBus, MessageBus, MessageService, RedisBus, RoomManager,
};
use roomcast_config::{AppConfig, RedisConfig};
use roomcast_database::{initialize_database, AccountRepository, ChatRepository};
use roomcast_gateway::GatewayState;
use roomcast_users::{CachedAccountStore, HttpIdentityClient, IdentityService, UserResolver};
use sqlx::SqlitePool;
use tracing::{info, warn};

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the gateway needs, wired from configuration.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub rooms: Arc<RoomManager>,
    pub identity: Arc<dyn IdentityService>,
    pub accounts: Arc<CachedAccountStore>,
    pub redis_conn: Option<ConnectionManager>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let redis = connect_redis(&config.redis).await;

        let identity: Arc<dyn IdentityService> = Arc::new(
            HttpIdentityClient::new(&config.identity)
                .context("failed to build identity client")?,
        );
        let directory = HttpRoomDirectory::new(&config.rooms)
            .context("failed to build room directory client")?;

        let bus: Arc<dyn MessageBus> = match &redis {
            Some((client, conn)) => Arc::new(RedisBus::new(client.clone(), conn.clone())),
            None => {
                warn!("no redis, broadcasts stay inside this process");
                Arc::new(MemoryBus::default())
            }
        };

        let context = HubContext {
            bus,
            messages: Arc::new(MessageService::new(
                Arc::new(ChatRepository::new(db_pool.clone())),
                &config.chat,
            )),
            users: Arc::new(UserResolver::new(identity.clone(), &config.identity)),
            config: config.chat.clone(),
        };
        let rooms = Arc::new(RoomManager::new(context, Arc::new(directory)));

        let account_repo = AccountRepository::new(db_pool.clone());
        let accounts = Arc::new(match &redis {
            Some((_, conn)) => {
                CachedAccountStore::with_redis(account_repo, conn.clone(), &config.redis)
            }
            None => CachedAccountStore::new(
                account_repo,
                Arc::new(MemoryCache::new(config.redis.cache_ttl())),
            ),
        });

        info!(
            identity = %config.identity.base_url,
            directory = %config.rooms.directory_url,
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            rooms,
            identity,
            accounts,
            redis_conn: redis.map(|(_, conn)| conn),
        })
    }

    pub fn gateway_state(&self) -> GatewayState {
        GatewayState::new(
            self.rooms.clone(),
            self.identity.clone(),
            self.accounts.clone(),
        )
    }
}

/// Redis is optional for a single process; without it the bus and the
/// account cache fall back to in-memory tiers.
async fn connect_redis(config: &RedisConfig) -> Option<(redis::Client, ConnectionManager)> {
    let client = match redis::Client::open(config.url.as_str()) {
        Ok(client) => client,
        Err(e) => {
            warn!("failed to create redis client, proceeding without redis: {}", e);
            return None;
        }
    };

    match tokio::time::timeout(REDIS_CONNECT_TIMEOUT, ConnectionManager::new(client.clone())).await
    {
        Ok(Ok(conn)) => {
            info!(url = %config.url, "redis connection established");
            Some((client, conn))
        }
        Ok(Err(e)) => {
            warn!("failed to connect to redis, proceeding without redis: {}", e);
            None
        }
        Err(_) => {
            warn!(url = %config.url, "redis connection timed out, proceeding without redis");
            None
        }
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
