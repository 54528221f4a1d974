//! Repository for account profile rows.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

use crate::entities::Account;
use crate::types::{errors::DatabaseError, DatabaseResult};

/// Authoritative store for account profiles.
#[derive(Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: i64) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT user_id, username, profile_pic, created_at FROM accounts WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_account_row).transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT user_id, username, profile_pic, created_at FROM accounts WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_account_row).transpose()
    }

    pub async fn update_profile_pic(&self, user_id: i64, profile_pic: &str) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE accounts SET profile_pic = ? WHERE user_id = ?")
            .bind(profile_pic)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("account {user_id}")));
        }

        info!(user_id, "updated account profile picture");
        Ok(())
    }

    pub async fn update_username(&self, user_id: i64, username: &str) -> DatabaseResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DatabaseError::ValidationError(
                "username must not be empty".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE accounts SET username = ? WHERE user_id = ?")
            .bind(username)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("account {user_id}")));
        }

        info!(user_id, "updated account username");
        Ok(())
    }
}

fn map_account_row(row: &SqliteRow) -> DatabaseResult<Account> {
    Ok(Account {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        profile_pic: row.try_get("profile_pic")?,
        created_at: row.try_get("created_at")?,
    })
}
