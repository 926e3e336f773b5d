//! User persistence operations

use serde::{Deserialize, Serialize};
use slotwatch_core::{Error, Result, User};
use sqlx::SqlitePool;

const DEFAULT_LANGUAGE: &str = "EN";

/// User record stored in database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub telegram_chat_id: i64,
    pub language: String,
    pub created_at: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            telegram_chat_id: row.telegram_chat_id,
            language: row.language,
        }
    }
}

/// Register a chat. Returns the user and whether it was newly created.
pub async fn register_user(
    pool: &SqlitePool,
    telegram_chat_id: i64,
    language: Option<&str>,
) -> Result<(User, bool)> {
    let language = language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_uppercase();

    let result = sqlx::query(
        "INSERT INTO users (telegram_chat_id, language) VALUES (?, ?) ON CONFLICT(telegram_chat_id) DO NOTHING",
    )
    .bind(telegram_chat_id)
    .bind(&language)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    let user = find_user_by_chat(pool, telegram_chat_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user for chat {}", telegram_chat_id)))?;

    Ok((user, result.rows_affected() > 0))
}

/// Look up a user by their Telegram chat id
pub async fn find_user_by_chat(pool: &SqlitePool, telegram_chat_id: i64) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, telegram_chat_id, language, created_at FROM users WHERE telegram_chat_id = ? LIMIT 1",
    )
    .bind(telegram_chat_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row.map(User::from))
}

/// List all users
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, telegram_chat_id, language, created_at FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(rows.into_iter().map(User::from).collect())
}

/// Delete a user and, through the foreign key, all their tracked rewards
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}
