//! Error types for identity lookups and the account store.

use roomcast_database::DatabaseError;
use thiserror::Error;

pub type IdentityResult<T> = Result<T, IdentityError>;
pub type UserResult<T> = Result<T, UserError>;

/// Failure talking to the identity service. Callers treat every variant as
/// "unknown user".
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity service answered with status {0}")]
    Status(u16),

    #[error("identity service rejected the request: {0}")]
    Rejected(String),

    #[error("identity response carried no data")]
    MissingData,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user {0} not found")]
    NotFound(i64),

    #[error("invalid user data: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for UserError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::ValidationError(message) => UserError::Validation(message),
            other => UserError::Database(other),
        }
    }
}
