//! Activity log repository (append-only)

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::data::sqlite::SqliteError;
use crate::data::types::{ActivityRow, PageWindow};

/// Which rows an activity listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityScope {
    Workspace(i64),
    Task(i64),
    User(i64),
}

pub async fn insert_activity(
    conn: &mut SqliteConnection,
    user_id: i64,
    workspace_id: Option<i64>,
    task_id: Option<i64>,
    action: &str,
    details: &str,
    now: i64,
) -> Result<i64, SqliteError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO activity_logs (user_id, workspace_id, task_id, action, details, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(workspace_id)
    .bind(task_id)
    .bind(action)
    .bind(details)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, scope: ActivityScope) {
    match scope {
        ActivityScope::Workspace(id) => qb.push(" WHERE workspace_id = ").push_bind(id),
        ActivityScope::Task(id) => qb.push(" WHERE task_id = ").push_bind(id),
        ActivityScope::User(id) => qb.push(" WHERE user_id = ").push_bind(id),
    };
}

/// Newest first
pub async fn list_activity(
    conn: &mut SqliteConnection,
    scope: ActivityScope,
    window: PageWindow,
) -> Result<Vec<ActivityRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, user_id, workspace_id, task_id, action, details, created_at FROM activity_logs",
    );
    push_scope(&mut qb, scope);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(window.limit())
        .push(" OFFSET ")
        .push_bind(window.offset());
    let rows = qb.build_query_as::<ActivityRow>().fetch_all(conn).await?;
    Ok(rows)
}

pub async fn count_activity(
    conn: &mut SqliteConnection,
    scope: ActivityScope,
) -> Result<i64, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM activity_logs");
    push_scope(&mut qb, scope);
    let count: i64 = qb.build_query_scalar().fetch_one(conn).await?;
    Ok(count)
}
