//! HTTP client for the remote identity service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use roomcast_config::IdentityConfig;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::entities::UserProfile;
use crate::types::{IdentityError, IdentityResult};

pub const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// Questions the chat backend asks the identity service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve a session token to the user id it belongs to.
    async fn validate_session(&self, token: &str) -> IdentityResult<i64>;

    /// Profile of the token's owner.
    async fn get_user_info(&self, token: &str) -> IdentityResult<UserProfile>;

    async fn get_user_by_id(&self, user_id: i64) -> IdentityResult<UserProfile>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    err: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    user_id: i64,
}

#[derive(Clone)]
pub struct HttpIdentityClient {
    http: Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(config: &IdentityConfig) -> IdentityResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> IdentityResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(IdentityError::Status(status.as_u16()));
        }

        let envelope: Envelope<T> = response.json().await?;
        if let Some(err) = envelope.err.filter(|err| !err.is_empty()) {
            return Err(IdentityError::Rejected(err));
        }
        envelope.data.ok_or(IdentityError::MissingData)
    }
}

#[async_trait]
impl IdentityService for HttpIdentityClient {
    async fn validate_session(&self, token: &str) -> IdentityResult<i64> {
        let url = format!("{}/session/validate", self.base_url);
        let session: SessionData = self
            .fetch(self.http.get(url).header(ACCESS_TOKEN_HEADER, token))
            .await?;
        debug!(user_id = session.user_id, "session validated");
        Ok(session.user_id)
    }

    async fn get_user_info(&self, token: &str) -> IdentityResult<UserProfile> {
        let url = format!("{}/user/info", self.base_url);
        self.fetch(self.http.get(url).header(ACCESS_TOKEN_HEADER, token))
            .await
    }

    async fn get_user_by_id(&self, user_id: i64) -> IdentityResult<UserProfile> {
        let url = format!("{}/usr/{}", self.base_url, user_id);
        self.fetch(self.http.get(url)).await
    }
}
