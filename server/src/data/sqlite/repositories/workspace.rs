//! Workspace and membership repository

use sqlx::SqliteConnection;

use crate::data::sqlite::SqliteError;
use crate::data::types::{MembershipRow, WorkspaceRow, WorkspaceWithRole};

pub async fn create_workspace(
    conn: &mut SqliteConnection,
    name: &str,
    is_personal: bool,
    created_by_user_id: i64,
    now: i64,
) -> Result<WorkspaceRow, SqliteError> {
    let row = sqlx::query_as::<_, WorkspaceRow>(
        "INSERT INTO workspaces (name, is_personal, created_by_user_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id, name, is_personal, created_by_user_id, created_at, updated_at",
    )
    .bind(name)
    .bind(is_personal)
    .bind(created_by_user_id)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn get_workspace(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<WorkspaceRow>, SqliteError> {
    let row = sqlx::query_as::<_, WorkspaceRow>(
        "SELECT id, name, is_personal, created_by_user_id, created_at, updated_at \
         FROM workspaces WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Add a member, or reactivate and re-role an existing membership
pub async fn upsert_member(
    conn: &mut SqliteConnection,
    workspace_id: i64,
    user_id: i64,
    role: &str,
    now: i64,
) -> Result<(), SqliteError> {
    sqlx::query(
        r#"
        INSERT INTO workspace_members (workspace_id, user_id, role, is_active, joined_at)
        VALUES (?, ?, ?, 1, ?)
        ON CONFLICT(workspace_id, user_id) DO UPDATE SET
            role = excluded.role,
            is_active = 1
        "#,
    )
    .bind(workspace_id)
    .bind(user_id)
    .bind(role)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// True iff an active membership row exists
pub async fn is_active_member(
    conn: &mut SqliteConnection,
    user_id: i64,
    workspace_id: i64,
) -> Result<bool, SqliteError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM workspace_members \
         WHERE user_id = ? AND workspace_id = ? AND is_active = 1)",
    )
    .bind(user_id)
    .bind(workspace_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

/// Active memberships of a user
pub async fn list_memberships(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<MembershipRow>, SqliteError> {
    let rows = sqlx::query_as::<_, MembershipRow>(
        "SELECT workspace_id, role FROM workspace_members \
         WHERE user_id = ? AND is_active = 1 ORDER BY workspace_id",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Workspaces the user is an active member of, with role
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<WorkspaceWithRole>, SqliteError> {
    let rows = sqlx::query_as::<_, WorkspaceWithRole>(
        r#"
        SELECT w.id, w.name, w.is_personal, m.role, m.joined_at
        FROM workspaces w
        JOIN workspace_members m ON m.workspace_id = w.id
        WHERE m.user_id = ? AND m.is_active = 1
        ORDER BY w.is_personal DESC, w.name, w.id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
