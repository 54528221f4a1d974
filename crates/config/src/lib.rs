use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "roomcast.toml",
    "config/roomcast.toml",
    "crates/config/roomcast.toml",
    "../roomcast.toml",
    "../config/roomcast.toml",
    "../crates/config/roomcast.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub identity: IdentityConfig,
    pub rooms: RoomDirectoryConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 9090,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://roomcast.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Redis backs both the cross-process message bus and the account cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// Expiry for cached account records. Zero keeps them until evicted.
    #[serde(default)]
    pub cache_ttl_seconds: u64,
    #[serde(default)]
    pub key_prefix: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            cache_ttl_seconds: 0,
            key_prefix: None,
        }
    }
}

impl RedisConfig {
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
    }
}

/// Connection settings for the external identity service.
///
/// ```
/// use roomcast_config::IdentityConfig;
///
/// let identity = IdentityConfig::default();
/// assert_eq!(identity.base_url, "http://localhost:7070");
/// assert_eq!(identity.request_timeout_seconds, 30);
/// assert_eq!(identity.user_cache_ttl_seconds, 3600);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub base_url: String,
    #[serde(default = "IdentityConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "IdentityConfig::default_user_cache_ttl")]
    pub user_cache_ttl_seconds: u64,
}

impl IdentityConfig {
    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_user_cache_ttl() -> u64 {
        3600
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn user_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.user_cache_ttl_seconds)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7070".to_string(),
            request_timeout_seconds: Self::default_request_timeout(),
            user_cache_ttl_seconds: Self::default_user_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDirectoryConfig {
    pub directory_url: String,
    #[serde(default = "RoomDirectoryConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl RoomDirectoryConfig {
    const fn default_request_timeout() -> u64 {
        30
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for RoomDirectoryConfig {
    fn default() -> Self {
        Self {
            directory_url: "http://localhost:8080".to_string(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Tuning for room hubs and websocket connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub max_message_size: usize,
    pub write_wait_seconds: u64,
    pub pong_wait_seconds: u64,
    pub outbound_queue_capacity: usize,
    /// Seconds an empty hub lingers before it is reclaimed. Zero keeps hubs forever.
    #[serde(default)]
    pub hub_idle_timeout_seconds: u64,
    pub history_timeout_seconds: u64,
    pub default_avatar: String,
    pub topic_prefix: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_size: 512,
            write_wait_seconds: 10,
            pong_wait_seconds: 60,
            outbound_queue_capacity: 256,
            hub_idle_timeout_seconds: 0,
            history_timeout_seconds: 5,
            default_avatar: "https://i.imgur.com/cINvch3.png".to_string(),
            topic_prefix: "pubsub:chat:".to_string(),
        }
    }
}

impl ChatConfig {
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_seconds)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_seconds)
    }

    /// Pings go out at nine tenths of the read-idle timeout so the peer always
    /// has a chance to answer before the reader gives up.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }

    pub fn hub_idle_timeout(&self) -> Option<Duration> {
        (self.hub_idle_timeout_seconds > 0)
            .then(|| Duration::from_secs(self.hub_idle_timeout_seconds))
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.history_timeout_seconds)
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use roomcast_config::load;
///
/// std::env::remove_var("ROOMCAST_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("redis.url", defaults.redis.url.clone())?
        .set_default(
            "redis.cache_ttl_seconds",
            clamp_i64(defaults.redis.cache_ttl_seconds),
        )?
        .set_default("identity.base_url", defaults.identity.base_url.clone())?
        .set_default(
            "identity.request_timeout_seconds",
            clamp_i64(defaults.identity.request_timeout_seconds),
        )?
        .set_default(
            "identity.user_cache_ttl_seconds",
            clamp_i64(defaults.identity.user_cache_ttl_seconds),
        )?
        .set_default("rooms.directory_url", defaults.rooms.directory_url.clone())?
        .set_default(
            "rooms.request_timeout_seconds",
            clamp_i64(defaults.rooms.request_timeout_seconds),
        )?
        .set_default(
            "chat.max_message_size",
            clamp_i64(defaults.chat.max_message_size as u64),
        )?
        .set_default(
            "chat.write_wait_seconds",
            clamp_i64(defaults.chat.write_wait_seconds),
        )?
        .set_default(
            "chat.pong_wait_seconds",
            clamp_i64(defaults.chat.pong_wait_seconds),
        )?
        .set_default(
            "chat.outbound_queue_capacity",
            clamp_i64(defaults.chat.outbound_queue_capacity as u64),
        )?
        .set_default(
            "chat.hub_idle_timeout_seconds",
            clamp_i64(defaults.chat.hub_idle_timeout_seconds),
        )?
        .set_default(
            "chat.history_timeout_seconds",
            clamp_i64(defaults.chat.history_timeout_seconds),
        )?
        .set_default("chat.default_avatar", defaults.chat.default_avatar.clone())?
        .set_default("chat.topic_prefix", defaults.chat.topic_prefix.clone())?;

    let mut builder = builder;
    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("ROOMCAST_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via ROOMCAST_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix("ROOMCAST").separator("__"));

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.chat.max_message_size == 0 {
        anyhow::bail!("chat.max_message_size must be greater than zero");
    }
    if config.chat.outbound_queue_capacity == 0 {
        anyhow::bail!("chat.outbound_queue_capacity must be greater than zero");
    }
    if config.chat.pong_wait_seconds == 0 {
        anyhow::bail!("chat.pong_wait_seconds must be greater than zero");
    }

    debug!(?config, "loaded roomcast configuration");
    Ok(config)
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
