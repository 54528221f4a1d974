//! Roomcast Database Crate
//!
//! Connection management, migrations and the two durable stores used by the
//! chat backend: the append-only chat log and the account/profile table.

use sqlx::SqlitePool;
use roomcast_config::DatabaseConfig;

pub mod connection;
pub mod migrations;
pub mod repos;
pub mod entities;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{AccountRepository, ChatRepository};

pub use entities::{
    account::Account,
    chat::{ChatMessage, NewChatMessage},
};

pub use types::{errors::DatabaseError, DatabaseResult};

pub use sqlx::SqlitePool as Pool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
