//! Task comment repository

use sqlx::SqliteConnection;

use crate::data::sqlite::SqliteError;
use crate::data::types::{CommentRow, CommentWithAuthorRow};

const COMMENT_COLUMNS: &str =
    "id, task_id, user_id, parent_comment_id, content, is_deleted, created_at, updated_at";

pub async fn insert_comment(
    conn: &mut SqliteConnection,
    task_id: i64,
    user_id: i64,
    parent_comment_id: Option<i64>,
    content: &str,
    now: i64,
) -> Result<CommentRow, SqliteError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        "INSERT INTO task_comments (task_id, user_id, parent_comment_id, content, is_deleted, \
         created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?) RETURNING {COMMENT_COLUMNS}"
    ))
    .bind(task_id)
    .bind(user_id)
    .bind(parent_comment_id)
    .bind(content)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Fetch a comment regardless of its deleted flag
pub async fn get_comment(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<CommentRow>, SqliteError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM task_comments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Live comments of a task with their authors, oldest first
pub async fn list_for_task(
    conn: &mut SqliteConnection,
    task_id: i64,
) -> Result<Vec<CommentWithAuthorRow>, SqliteError> {
    let rows = sqlx::query_as::<_, CommentWithAuthorRow>(
        r#"
        SELECT c.id, c.task_id, c.user_id, c.parent_comment_id, c.content, c.is_deleted,
               c.created_at, c.updated_at, u.email, u.full_name
        FROM task_comments c
        JOIN users u ON u.id = c.user_id
        WHERE c.task_id = ? AND c.is_deleted = 0
        ORDER BY c.created_at, c.id
        "#,
    )
    .bind(task_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn update_content(
    conn: &mut SqliteConnection,
    id: i64,
    content: &str,
    now: i64,
) -> Result<Option<CommentRow>, SqliteError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        "UPDATE task_comments SET content = ?, updated_at = ? WHERE id = ? AND is_deleted = 0 \
         RETURNING {COMMENT_COLUMNS}"
    ))
    .bind(content)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn mark_deleted(
    conn: &mut SqliteConnection,
    id: i64,
    now: i64,
) -> Result<bool, SqliteError> {
    let result = sqlx::query(
        "UPDATE task_comments SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Write a full snapshot back: insert if the id is gone, else overwrite every non-key column
pub async fn upsert_comment(
    conn: &mut SqliteConnection,
    row: &CommentRow,
) -> Result<(), SqliteError> {
    sqlx::query(
        r#"
        INSERT INTO task_comments (id, task_id, user_id, parent_comment_id, content, is_deleted,
                                   created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            task_id = excluded.task_id,
            user_id = excluded.user_id,
            parent_comment_id = excluded.parent_comment_id,
            content = excluded.content,
            is_deleted = excluded.is_deleted,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(row.id)
    .bind(row.task_id)
    .bind(row.user_id)
    .bind(row.parent_comment_id)
    .bind(&row.content)
    .bind(row.is_deleted)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}
