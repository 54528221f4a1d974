//! Error types for the cache chain.

use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// Failure inside the cache tier itself. Never surfaced to chain callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        CacheError::Backend(error.to_string())
    }
}

/// What a caller of the chain sees when neither tier could produce a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("{0} not found")]
    NotFound(String),
}
