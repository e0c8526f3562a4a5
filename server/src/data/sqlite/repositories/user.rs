//! User and user-settings repository

use sqlx::SqliteConnection;

use crate::data::sqlite::SqliteError;
use crate::data::types::{UserRow, UserSettingsRow};

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, is_active, created_at, updated_at";

/// Insert a new active user
pub async fn create_user(
    conn: &mut SqliteConnection,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
    now: i64,
) -> Result<UserRow, SqliteError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (email, password_hash, full_name, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, 1, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| SqliteError::from_unique(e, "Email already registered"))?;
    Ok(row)
}

pub async fn get_user(conn: &mut SqliteConnection, id: i64) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Lookup by email (case-insensitive via column collation)
pub async fn get_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Create default settings for a user
pub async fn create_settings(
    conn: &mut SqliteConnection,
    user_id: i64,
    now: i64,
) -> Result<UserSettingsRow, SqliteError> {
    let row = sqlx::query_as::<_, UserSettingsRow>(
        "INSERT INTO user_settings (user_id, created_at, updated_at) VALUES (?, ?, ?) \
         RETURNING user_id, theme, timezone, notifications_enabled, created_at, updated_at",
    )
    .bind(user_id)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn get_settings(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<UserSettingsRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserSettingsRow>(
        "SELECT user_id, theme, timezone, notifications_enabled, created_at, updated_at \
         FROM user_settings WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}
