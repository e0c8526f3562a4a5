//! Tag and task-tag link repository

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::data::sqlite::SqliteError;
use crate::data::types::{Scope, TagRow, TaskTagRow};

const TAG_COLUMNS: &str =
    "id, tag_name, color, workspace_id, user_id, is_active, created_at, updated_at";

/// Active tags are unique by (scope, name)
const DUPLICATE_NAME: &str = "An active tag with this name already exists in this scope";

pub async fn insert_tag(
    conn: &mut SqliteConnection,
    tag_name: &str,
    color: Option<&str>,
    scope: Scope,
    now: i64,
) -> Result<TagRow, SqliteError> {
    let row = sqlx::query_as::<_, TagRow>(&format!(
        "INSERT INTO tags (tag_name, color, workspace_id, user_id, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 1, ?, ?) RETURNING {TAG_COLUMNS}"
    ))
    .bind(tag_name)
    .bind(color)
    .bind(scope.workspace_id())
    .bind(scope.user_id())
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| SqliteError::from_unique(e, DUPLICATE_NAME))?;
    Ok(row)
}

/// Fetch a tag regardless of its active flag
pub async fn get_tag(conn: &mut SqliteConnection, id: i64) -> Result<Option<TagRow>, SqliteError> {
    let row = sqlx::query_as::<_, TagRow>(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Active tag with this exact name in this scope
pub async fn find_active_by_name(
    conn: &mut SqliteConnection,
    scope: Scope,
    tag_name: &str,
) -> Result<Option<TagRow>, SqliteError> {
    let sql = match scope {
        Scope::Workspace(_) => format!(
            "SELECT {TAG_COLUMNS} FROM tags \
             WHERE workspace_id = ? AND user_id IS NULL AND tag_name = ? AND is_active = 1 \
             ORDER BY id LIMIT 1"
        ),
        Scope::User(_) => format!(
            "SELECT {TAG_COLUMNS} FROM tags \
             WHERE user_id = ? AND workspace_id IS NULL AND tag_name = ? AND is_active = 1 \
             ORDER BY id LIMIT 1"
        ),
    };
    let owner = scope.workspace_id().or(scope.user_id());
    let row = sqlx::query_as::<_, TagRow>(&sql)
        .bind(owner)
        .bind(tag_name)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Active tags of one scope, by name
pub async fn list_active(
    conn: &mut SqliteConnection,
    scope: Scope,
) -> Result<Vec<TagRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {TAG_COLUMNS} FROM tags WHERE is_active = 1"));
    match scope {
        Scope::Workspace(id) => qb
            .push(" AND user_id IS NULL AND workspace_id = ")
            .push_bind(id),
        Scope::User(id) => qb
            .push(" AND workspace_id IS NULL AND user_id = ")
            .push_bind(id),
    };
    qb.push(" ORDER BY tag_name, id");
    let rows = qb.build_query_as::<TagRow>().fetch_all(conn).await?;
    Ok(rows)
}

/// Rename/recolor. `color: Some(None)` clears it.
pub async fn update_tag(
    conn: &mut SqliteConnection,
    id: i64,
    tag_name: Option<&str>,
    color: Option<Option<&str>>,
    now: i64,
) -> Result<Option<TagRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tags SET updated_at = ");
    qb.push_bind(now);
    if let Some(name) = tag_name {
        qb.push(", tag_name = ").push_bind(name.to_string());
    }
    if let Some(color) = color {
        qb.push(", color = ").push_bind(color.map(str::to_string));
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {TAG_COLUMNS}"));
    let row = qb
        .build_query_as::<TagRow>()
        .fetch_optional(conn)
        .await
        .map_err(|e| SqliteError::from_unique(e, DUPLICATE_NAME))?;
    Ok(row)
}

pub async fn deactivate_tag(
    conn: &mut SqliteConnection,
    id: i64,
    now: i64,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("UPDATE tags SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Write a full snapshot back: insert if the id is gone, else overwrite every non-key column
pub async fn upsert_tag(conn: &mut SqliteConnection, row: &TagRow) -> Result<(), SqliteError> {
    sqlx::query(
        r#"
        INSERT INTO tags (id, tag_name, color, workspace_id, user_id, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            tag_name = excluded.tag_name,
            color = excluded.color,
            workspace_id = excluded.workspace_id,
            user_id = excluded.user_id,
            is_active = excluded.is_active,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(row.id)
    .bind(&row.tag_name)
    .bind(&row.color)
    .bind(row.workspace_id)
    .bind(row.user_id)
    .bind(row.is_active)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(conn)
    .await
    .map_err(|e| SqliteError::from_unique(e, DUPLICATE_NAME))?;
    Ok(())
}

// ============================================================================
// Task links
// ============================================================================

/// Attach a tag. Linking twice is a no-op.
pub async fn link(conn: &mut SqliteConnection, task_id: i64, tag_id: i64) -> Result<(), SqliteError> {
    sqlx::query("INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES (?, ?)")
        .bind(task_id)
        .bind(tag_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Detach one tag, returning whether a link existed
pub async fn unlink(
    conn: &mut SqliteConnection,
    task_id: i64,
    tag_id: i64,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM task_tags WHERE task_id = ? AND tag_id = ?")
        .bind(task_id)
        .bind(tag_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove every tag from a task
pub async fn clear_links(conn: &mut SqliteConnection, task_id: i64) -> Result<(), SqliteError> {
    sqlx::query("DELETE FROM task_tags WHERE task_id = ?")
        .bind(task_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Remove a tag from every task
pub async fn unlink_all_for_tag(
    conn: &mut SqliteConnection,
    tag_id: i64,
) -> Result<u64, SqliteError> {
    let result = sqlx::query("DELETE FROM task_tags WHERE tag_id = ?")
        .bind(tag_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Active tags of a batch of tasks
pub async fn tags_for_tasks(
    conn: &mut SqliteConnection,
    task_ids: &[i64],
) -> Result<Vec<TaskTagRow>, SqliteError> {
    if task_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT tt.task_id, g.id AS tag_id, g.tag_name, g.color \
         FROM task_tags tt JOIN tags g ON g.id = tt.tag_id \
         WHERE g.is_active = 1 AND tt.task_id IN (",
    );
    let mut sep = qb.separated(", ");
    for id in task_ids {
        sep.push_bind(*id);
    }
    qb.push(") ORDER BY tt.task_id, g.tag_name, g.id");
    let rows = qb.build_query_as::<TaskTagRow>().fetch_all(conn).await?;
    Ok(rows)
}
