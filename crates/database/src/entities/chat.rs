//! Chat log entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted chat line. Immutable once stored; `chat_id` is assigned on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub chat_id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub room_id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NewChatMessage {
    pub fn now(room_id: i64, user_id: i64, message: impl Into<String>) -> Self {
        Self {
            room_id,
            user_id,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
