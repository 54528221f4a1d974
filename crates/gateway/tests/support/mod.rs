//! Builds a complete gateway against mocked identity and directory
//! services, an in-memory bus and a throwaway SQLite database.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use httpmock::prelude::*;
use roomcast_cache::MemoryCache;
use roomcast_chats::{HttpRoomDirectory, HubContext, MemoryBus, MessageBus, MessageService, RoomManager};
use roomcast_config::{ChatConfig, DatabaseConfig, IdentityConfig, RoomDirectoryConfig};
use roomcast_database::{initialize_database, AccountRepository, ChatRepository, Pool};
use roomcast_gateway::{create_router, GatewayState};
use roomcast_users::{CachedAccountStore, HttpIdentityClient, IdentityService, UserResolver};
use serde_json::json;
use tempfile::TempDir;

pub struct TestBackend {
    pub state: GatewayState,
    pub pool: Pool,
    pub identity: MockServer,
    pub directory: MockServer,
    _dir: TempDir,
}

impl TestBackend {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let pool = initialize_database(&DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("gateway.db").display()),
            max_connections: 2,
        })
        .await
        .unwrap();

        let identity = MockServer::start_async().await;
        mock_user(&identity, "tok-alice", 7, "alice", "").await;
        mock_user(&identity, "tok-bob", 8, "bob", "https://cdn/bob.png").await;
        identity
            .mock_async(|when, then| {
                when.method(GET).path("/session/validate").header("X-Access-Token", "tok-bad");
                then.status(401).json_body(json!({"err": "invalid session"}));
            })
            .await;

        let directory = MockServer::start_async().await;
        directory
            .mock_async(|when, then| {
                when.method(GET).path("/room/42");
                then.status(200).json_body(json!({"room_id": 42}));
            })
            .await;

        let identity_client: Arc<dyn IdentityService> = Arc::new(
            HttpIdentityClient::new(&IdentityConfig {
                base_url: identity.base_url(),
                request_timeout_seconds: 2,
                ..IdentityConfig::default()
            })
            .unwrap(),
        );
        let room_directory = HttpRoomDirectory::new(&RoomDirectoryConfig {
            directory_url: directory.base_url(),
            request_timeout_seconds: 2,
        })
        .unwrap();

        let config = ChatConfig::default();
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::default());
        let context = HubContext {
            bus,
            messages: Arc::new(MessageService::new(
                Arc::new(ChatRepository::new(pool.clone())),
                &config,
            )),
            users: Arc::new(UserResolver::new(identity_client.clone(), &IdentityConfig::default())),
            config,
        };
        let rooms = Arc::new(RoomManager::new(context, Arc::new(room_directory)));
        let accounts = Arc::new(CachedAccountStore::new(
            AccountRepository::new(pool.clone()),
            Arc::new(MemoryCache::new(None)),
        ));

        Self {
            state: GatewayState::new(rooms, identity_client, accounts),
            pool,
            identity,
            directory,
            _dir: temp_dir,
        }
    }

    /// Serve the router on an ephemeral port.
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = create_router(self.state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }
}

async fn mock_user(server: &MockServer, token: &'static str, user_id: i64, username: &str, pic: &str) {
    let profile = json!({
        "user_id": user_id,
        "username": username,
        "profile_pic": pic,
    });

    let session = json!({"err": "", "data": {"user_id": user_id}});
    server
        .mock_async(|when, then| {
            when.method(GET).path("/session/validate").header("X-Access-Token", token);
            then.status(200).json_body(session);
        })
        .await;

    let info = json!({"err": "", "data": profile.clone()});
    server
        .mock_async(|when, then| {
            when.method(GET).path("/user/info").header("X-Access-Token", token);
            then.status(200).json_body(info);
        })
        .await;

    let by_id = json!({"err": "", "data": profile});
    let path = format!("/usr/{user_id}");
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(by_id);
        })
        .await;
}
