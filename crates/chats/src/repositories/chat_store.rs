//! Append/range-query contract over the durable chat log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomcast_database::{ChatMessage, ChatRepository, NewChatMessage};
use tracing::error;

use crate::types::ChatResult;

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Persist a message. Failures propagate; an unpersisted message must
    /// not be broadcast.
    async fn insert(&self, message: NewChatMessage) -> ChatResult<ChatMessage>;

    /// Messages of `room_id` with `start <= created_at < end` in insertion
    /// order. A failed query yields an empty list.
    async fn messages_between(
        &self,
        room_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ChatMessage>;
}

#[async_trait]
impl ChatStore for ChatRepository {
    async fn insert(&self, message: NewChatMessage) -> ChatResult<ChatMessage> {
        Ok(self.create(&message).await?)
    }

    async fn messages_between(
        &self,
        room_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ChatMessage> {
        match self.find_by_room_between(room_id, start, end).await {
            Ok(messages) => messages,
            Err(error) => {
                error!(room_id, %error, "chat history query failed");
                Vec::new()
            }
        }
    }
}
