//! Message normalisation, persistence and history assembly.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use roomcast_config::ChatConfig;
use roomcast_database::NewChatMessage;
use roomcast_users::{UserLookup, UserProfile};
use tracing::debug;

use crate::entities::{ChatPayload, HistoryBatch};
use crate::repositories::ChatStore;
use crate::types::{ChatError, ChatResult};

/// Newlines become spaces and surrounding whitespace is dropped. Returns
/// `None` for a message with nothing left.
pub fn normalize_message(raw: &str) -> Option<String> {
    let text = raw.replace('\n', " ");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// `[00:00 UTC, 00:00 UTC next day)` around `now`.
pub fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

pub struct MessageService {
    store: Arc<dyn ChatStore>,
    max_message_size: usize,
    default_avatar: String,
}

impl MessageService {
    pub fn new(store: Arc<dyn ChatStore>, config: &ChatConfig) -> Self {
        Self {
            store,
            max_message_size: config.max_message_size,
            default_avatar: config.default_avatar.clone(),
        }
    }

    /// Persist `raw` for `author` and return the encoded broadcast payload.
    ///
    /// `Ok(None)` means the message was blank and nothing was stored. A
    /// store failure is returned as an error and nothing may be broadcast.
    pub async fn post(
        &self,
        room_id: i64,
        author: &UserProfile,
        raw: &str,
    ) -> ChatResult<Option<String>> {
        if raw.len() > self.max_message_size {
            return Err(ChatError::Validation(format!(
                "message of {} bytes exceeds the {} byte limit",
                raw.len(),
                self.max_message_size
            )));
        }

        let Some(text) = normalize_message(raw) else {
            return Ok(None);
        };

        let stored = self
            .store
            .insert(NewChatMessage::now(room_id, author.user_id, text))
            .await?;
        debug!(chat_id = stored.chat_id, room_id, "message persisted");

        let payload = ChatPayload::from_profile(author, stored.message, &self.default_avatar);
        Ok(Some(serde_json::to_string(&payload)?))
    }

    /// Today's messages for `room_id`, enriched with author metadata.
    /// Messages whose author cannot be resolved are left out.
    pub async fn history(
        &self,
        room_id: i64,
        users: &dyn UserLookup,
        now: DateTime<Utc>,
    ) -> HistoryBatch {
        let (start, end) = day_window(now);
        let messages = self.store.messages_between(room_id, start, end).await;

        let mut chats = Vec::with_capacity(messages.len());
        for message in messages {
            match users.lookup(message.user_id).await {
                Some(author) => chats.push(ChatPayload::from_profile(
                    &author,
                    message.message,
                    &self.default_avatar,
                )),
                None => debug!(room_id, user_id = message.user_id, "skipping message from unknown author"),
            }
        }

        HistoryBatch { chats }
    }
}
