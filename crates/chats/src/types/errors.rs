//! Error types for the chat system.

use roomcast_database::DatabaseError;
use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

pub type BusResult<T> = Result<T, BusError>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("room {0} not found")]
    RoomNotFound(i64),

    #[error("hub for room {0} is closed")]
    HubClosed(i64),

    #[error("chat service is shutting down")]
    ShuttingDown,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to persist message: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("topic {0} is closed")]
    Closed(String),
}
