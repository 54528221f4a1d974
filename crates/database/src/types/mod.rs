//! Shared types for the database layer

pub mod errors;

pub type DatabaseResult<T> = Result<T, errors::DatabaseError>;
