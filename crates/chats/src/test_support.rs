//! In-process stand-ins for the hub's collaborators, for tests and
//! single-node experiments.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use roomcast_database::{ChatMessage, DatabaseError, NewChatMessage};
use roomcast_users::{UserLookup, UserProfile};
use tokio::sync::RwLock;

use crate::pubsub::MessageBus;
use crate::repositories::ChatStore;
use crate::services::RoomDirectory;
use crate::types::{BusError, BusResult, ChatResult};

#[derive(Default)]
pub struct MemoryChatStore {
    messages: RwLock<Vec<ChatMessage>>,
    fail_inserts: bool,
}

impl MemoryChatStore {
    /// A store whose inserts always fail.
    pub fn failing() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            fail_inserts: true,
        }
    }

    pub async fn all(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn insert(&self, message: NewChatMessage) -> ChatResult<ChatMessage> {
        if self.fail_inserts {
            return Err(DatabaseError::QueryError("store unavailable".into()).into());
        }

        let mut messages = self.messages.write().await;
        let stored = ChatMessage {
            chat_id: messages.len() as i64 + 1,
            room_id: message.room_id,
            user_id: message.user_id,
            message: message.message,
            created_at: message.created_at,
        };
        messages.push(stored.clone());
        Ok(stored)
    }

    async fn messages_between(
        &self,
        room_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ChatMessage> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.room_id == room_id && m.created_at >= start && m.created_at < end)
            .cloned()
            .collect()
    }
}

/// Directory that knows a fixed set of rooms.
pub struct StaticDirectory {
    rooms: HashSet<i64>,
}

impl StaticDirectory {
    pub fn new(rooms: impl IntoIterator<Item = i64>) -> Self {
        Self {
            rooms: rooms.into_iter().collect(),
        }
    }
}

#[async_trait]
impl RoomDirectory for StaticDirectory {
    async fn room_exists(&self, room_id: i64) -> bool {
        self.rooms.contains(&room_id)
    }
}

pub struct StaticUsers {
    profiles: HashMap<i64, UserProfile>,
}

impl StaticUsers {
    pub fn new(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.user_id, p)).collect(),
        }
    }
}

#[async_trait]
impl UserLookup for StaticUsers {
    async fn lookup(&self, user_id: i64) -> Option<UserProfile> {
        self.profiles.get(&user_id).cloned()
    }
}

/// Bus that accepts subscriptions but refuses every publish.
#[derive(Default)]
pub struct UnreachableBus;

#[async_trait]
impl MessageBus for UnreachableBus {
    async fn publish(&self, topic: &str, _payload: &str) -> BusResult<()> {
        Err(BusError::Closed(topic.to_string()))
    }

    async fn subscribe(&self, _topic: &str) -> BusResult<BoxStream<'static, String>> {
        Ok(Box::pin(futures::stream::pending()))
    }
}
