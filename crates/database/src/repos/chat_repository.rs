//! Repository for the append-only chat log.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, info};

use crate::entities::{ChatMessage, NewChatMessage};
use crate::types::{errors::DatabaseError, DatabaseResult};

/// Chat log persistence. Timestamps are stored as unix milliseconds so range
/// scans compare integers.
#[derive(Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message and return it with its assigned id.
    pub async fn create(&self, message: &NewChatMessage) -> DatabaseResult<ChatMessage> {
        let result = sqlx::query(
            "INSERT INTO chats (room_id, user_id, message, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message.room_id)
        .bind(message.user_id)
        .bind(&message.message)
        .bind(message.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        let chat_id = result.last_insert_rowid();

        info!(
            chat_id,
            room_id = message.room_id,
            user_id = message.user_id,
            "stored chat message"
        );

        Ok(ChatMessage {
            chat_id,
            room_id: message.room_id,
            user_id: message.user_id,
            message: message.message.clone(),
            created_at: message.created_at,
        })
    }

    /// All messages of a room with `start <= created_at < end`, in insertion order.
    pub async fn find_by_room_between(
        &self,
        room_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatabaseResult<Vec<ChatMessage>> {
        debug!(room_id, %start, %end, "querying chat history");

        let rows = sqlx::query(
            "SELECT chat_id, room_id, user_id, message, created_at
             FROM chats
             WHERE room_id = ? AND created_at >= ? AND created_at < ?
             ORDER BY chat_id ASC",
        )
        .bind(room_id)
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_chat_row).collect()
    }
}

fn map_chat_row(row: &SqliteRow) -> DatabaseResult<ChatMessage> {
    let created_ms: i64 = row.try_get("created_at")?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_ms).ok_or_else(|| {
        DatabaseError::ValidationError(format!("invalid chat timestamp {created_ms}"))
    })?;

    Ok(ChatMessage {
        chat_id: row.try_get("chat_id")?,
        room_id: row.try_get("room_id")?,
        user_id: row.try_get("user_id")?,
        message: row.try_get("message")?,
        created_at,
    })
}
