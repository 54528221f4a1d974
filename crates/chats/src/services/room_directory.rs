//! Client for the external room directory.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use roomcast_config::RoomDirectoryConfig;
use tracing::warn;

/// Answers whether a room exists. Implementations fail closed: any error
/// is reported as "does not exist".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn room_exists(&self, room_id: i64) -> bool;
}

#[derive(Clone)]
pub struct HttpRoomDirectory {
    http: Client,
    base_url: String,
}

impl HttpRoomDirectory {
    pub fn new(config: &RoomDirectoryConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.directory_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RoomDirectory for HttpRoomDirectory {
    async fn room_exists(&self, room_id: i64) -> bool {
        let url = format!("{}/room/{}", self.base_url, room_id);
        match self.http.get(&url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(error) => {
                warn!(room_id, %error, "room directory request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn directory(base_url: String) -> HttpRoomDirectory {
        HttpRoomDirectory::new(&RoomDirectoryConfig {
            directory_url: base_url,
            request_timeout_seconds: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn ok_status_means_the_room_exists() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/room/42");
                then.status(200).body("{}");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/room/99");
                then.status(404);
            })
            .await;

        let directory = directory(server.base_url());
        assert!(directory.room_exists(42).await);
        assert!(!directory.room_exists(99).await);
    }

    #[tokio::test]
    async fn unreachable_directory_fails_closed() {
        let directory = directory("http://127.0.0.1:9".into());
        assert!(!directory.room_exists(42).await);
    }
}
