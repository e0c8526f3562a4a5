//! Task list repository

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::data::sqlite::SqliteError;
use crate::data::types::{Scope, TaskListRow, TaskListSummaryRow};

const LIST_COLUMNS: &str = "id, name, description, workspace_id, user_id, position_order, \
     is_active, created_by_user_id, created_at, updated_at";

/// Fields for a new task list
#[derive(Debug, Clone)]
pub struct NewTaskList<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub scope: Scope,
    pub position_order: i64,
    pub created_by_user_id: i64,
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskListPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub position_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl TaskListPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.position_order.is_none()
            && self.is_active.is_none()
    }
}

pub async fn insert_task_list(
    conn: &mut SqliteConnection,
    new: &NewTaskList<'_>,
    now: i64,
) -> Result<TaskListRow, SqliteError> {
    let row = sqlx::query_as::<_, TaskListRow>(&format!(
        "INSERT INTO task_lists (name, description, workspace_id, user_id, position_order, \
         is_active, created_by_user_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?) RETURNING {LIST_COLUMNS}"
    ))
    .bind(new.name)
    .bind(new.description)
    .bind(new.scope.workspace_id())
    .bind(new.scope.user_id())
    .bind(new.position_order)
    .bind(new.created_by_user_id)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Fetch a list regardless of its active flag
pub async fn get_task_list(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<TaskListRow>, SqliteError> {
    let row = sqlx::query_as::<_, TaskListRow>(&format!(
        "SELECT {LIST_COLUMNS} FROM task_lists WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

fn summary_select() -> QueryBuilder<'static, Sqlite> {
    QueryBuilder::new(
        r#"
        SELECT l.id, l.name, l.description, l.workspace_id, l.user_id, l.position_order,
               l.is_active, l.created_by_user_id, l.created_at, l.updated_at,
               (SELECT COUNT(*) FROM tasks t
                 WHERE t.task_list_id = l.id AND t.is_active = 1 AND t.is_completed = 0
               ) AS incomplete_task_count
        FROM task_lists l
        WHERE l.is_active = 1
        "#,
    )
}

/// Active lists of one workspace with their incomplete-task counters
pub async fn list_summaries_for_workspace(
    conn: &mut SqliteConnection,
    workspace_id: i64,
) -> Result<Vec<TaskListSummaryRow>, SqliteError> {
    let mut qb = summary_select();
    qb.push(" AND l.workspace_id = ")
        .push_bind(workspace_id)
        .push(" ORDER BY l.position_order, l.id");
    let rows = qb
        .build_query_as::<TaskListSummaryRow>()
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Personal lists of the user plus lists of every workspace they belong to
pub async fn list_summaries_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<TaskListSummaryRow>, SqliteError> {
    let mut qb = summary_select();
    qb.push(" AND (l.user_id = ")
        .push_bind(user_id)
        .push(
            " OR l.workspace_id IN (SELECT workspace_id FROM workspace_members \
             WHERE is_active = 1 AND user_id = ",
        )
        .push_bind(user_id)
        .push(")) ORDER BY l.position_order, l.id");
    let rows = qb
        .build_query_as::<TaskListSummaryRow>()
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

/// Apply a patch and return the updated row
pub async fn update_task_list(
    conn: &mut SqliteConnection,
    id: i64,
    patch: &TaskListPatch,
    now: i64,
) -> Result<Option<TaskListRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE task_lists SET updated_at = ");
    qb.push_bind(now);
    if let Some(name) = &patch.name {
        qb.push(", name = ").push_bind(name.clone());
    }
    if let Some(description) = &patch.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    if let Some(position_order) = patch.position_order {
        qb.push(", position_order = ").push_bind(position_order);
    }
    if let Some(is_active) = patch.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {LIST_COLUMNS}"));

    let row = qb
        .build_query_as::<TaskListRow>()
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Write a full snapshot back: insert if the id is gone, else overwrite every non-key column
pub async fn upsert_task_list(
    conn: &mut SqliteConnection,
    row: &TaskListRow,
) -> Result<(), SqliteError> {
    sqlx::query(
        r#"
        INSERT INTO task_lists (id, name, description, workspace_id, user_id, position_order,
                                is_active, created_by_user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            workspace_id = excluded.workspace_id,
            user_id = excluded.user_id,
            position_order = excluded.position_order,
            is_active = excluded.is_active,
            created_by_user_id = excluded.created_by_user_id,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(row.id)
    .bind(&row.name)
    .bind(&row.description)
    .bind(row.workspace_id)
    .bind(row.user_id)
    .bind(row.position_order)
    .bind(row.is_active)
    .bind(row.created_by_user_id)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}
