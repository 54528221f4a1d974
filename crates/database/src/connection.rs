//! SQLite pool setup for the chat log and account tables.

use std::path::Path;

use anyhow::{Context, Result};
use roomcast_config::DatabaseConfig;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::fs;
use tracing::{debug, info};

/// Open the pool described by `config`, creating the database file first
/// when it lives on disk.
pub async fn prepare_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    if let Some(path) = sqlite_file(&config.url) {
        create_database_file(path).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .with_context(|| format!("failed to connect to database {}", config.url))?;

    // WAL lets history reads proceed while messages are appended.
    for pragma in ["PRAGMA journal_mode = WAL", "PRAGMA busy_timeout = 5000"] {
        sqlx::query(pragma)
            .execute(&pool)
            .await
            .with_context(|| format!("failed to apply `{pragma}`"))?;
    }

    info!(url = %config.url, max_connections = config.max_connections, "chat database ready");
    Ok(pool)
}

/// The on-disk file behind a sqlite url; `None` for in-memory databases and
/// non-sqlite urls.
fn sqlite_file(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or_default();

    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(Path::new(path))
    }
}

async fn create_database_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    fs::File::create(path)
        .await
        .with_context(|| format!("failed to create sqlite file {}", path.display()))?;
    debug!(path = %path.display(), "created sqlite database file");
    Ok(())
}
