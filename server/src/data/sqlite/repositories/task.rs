//! Task repository
//!
//! Task listings are built with `QueryBuilder` so that every filter and sort
//! key stays parameterized. Only `ORDER BY` fragments are pushed as text, and
//! those come from closed enums.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::data::sqlite::SqliteError;
use crate::data::types::{
    PageWindow, Scope, SortOrder, TaskEdgeRow, TaskFilter, TaskPriority, TaskRow, TaskSortBy,
    TaskStatus,
};
use crate::utils::sql::contains_pattern;

const TASK_COLUMNS: &str = "t.id, t.task_list_id, t.parent_task_id, t.title, t.description, \
     t.priority, t.status, t.is_completed, t.due_datetime, t.recurrence_rule, \
     t.recurrence_end_date, t.position_order, t.is_active, t.created_by_user_id, \
     t.created_at, t.updated_at";

const RETURNING_COLUMNS: &str = " RETURNING id, task_list_id, parent_task_id, title, description, \
     priority, status, is_completed, due_datetime, recurrence_rule, recurrence_end_date, \
     position_order, is_active, created_by_user_id, created_at, updated_at";

/// SQLite's default bound-parameter limit is 999; stay well below it
const ID_CHUNK_SIZE: usize = 500;

/// Fields for a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_list_id: i64,
    pub parent_task_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub is_completed: bool,
    pub due_datetime: Option<i64>,
    pub recurrence_rule: Option<String>,
    pub recurrence_end_date: Option<i64>,
    pub position_order: i64,
    pub created_by_user_id: i64,
}

/// Partial update. Outer `None` leaves the column unchanged, inner `None` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_task_id: Option<Option<i64>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub is_completed: Option<bool>,
    pub due_datetime: Option<Option<i64>>,
    pub recurrence_rule: Option<Option<String>>,
    pub recurrence_end_date: Option<Option<i64>>,
    pub position_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub async fn insert_task(
    conn: &mut SqliteConnection,
    new: &NewTask,
    now: i64,
) -> Result<TaskRow, SqliteError> {
    let row = sqlx::query_as::<_, TaskRow>(&format!(
        r#"
        INSERT INTO tasks (task_list_id, parent_task_id, title, description, priority, status,
                           is_completed, due_datetime, recurrence_rule, recurrence_end_date,
                           position_order, is_active, created_by_user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
        {RETURNING_COLUMNS}
        "#
    ))
    .bind(new.task_list_id)
    .bind(new.parent_task_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.priority)
    .bind(new.status)
    .bind(new.is_completed)
    .bind(new.due_datetime)
    .bind(&new.recurrence_rule)
    .bind(new.recurrence_end_date)
    .bind(new.position_order)
    .bind(new.created_by_user_id)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Fetch a task regardless of its active flag
pub async fn get_task(conn: &mut SqliteConnection, id: i64) -> Result<Option<TaskRow>, SqliteError> {
    let row = sqlx::query_as::<_, TaskRow>(&format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Apply a patch and return the updated row
pub async fn update_task(
    conn: &mut SqliteConnection,
    id: i64,
    patch: &TaskPatch,
    now: i64,
) -> Result<Option<TaskRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET updated_at = ");
    qb.push_bind(now);
    if let Some(title) = &patch.title {
        qb.push(", title = ").push_bind(title.clone());
    }
    if let Some(description) = &patch.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    if let Some(parent) = patch.parent_task_id {
        qb.push(", parent_task_id = ").push_bind(parent);
    }
    if let Some(priority) = patch.priority {
        qb.push(", priority = ").push_bind(priority.as_str());
    }
    if let Some(status) = patch.status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    if let Some(is_completed) = patch.is_completed {
        qb.push(", is_completed = ").push_bind(is_completed);
    }
    if let Some(due) = patch.due_datetime {
        qb.push(", due_datetime = ").push_bind(due);
    }
    if let Some(rule) = &patch.recurrence_rule {
        qb.push(", recurrence_rule = ").push_bind(rule.clone());
    }
    if let Some(end) = patch.recurrence_end_date {
        qb.push(", recurrence_end_date = ").push_bind(end);
    }
    if let Some(position_order) = patch.position_order {
        qb.push(", position_order = ").push_bind(position_order);
    }
    if let Some(is_active) = patch.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(RETURNING_COLUMNS);

    let row = qb.build_query_as::<TaskRow>().fetch_optional(conn).await?;
    Ok(row)
}

/// Parent/child edges of every active task in a list
pub async fn edges_for_list(
    conn: &mut SqliteConnection,
    task_list_id: i64,
) -> Result<Vec<TaskEdgeRow>, SqliteError> {
    let rows = sqlx::query_as::<_, TaskEdgeRow>(
        "SELECT id, parent_task_id FROM tasks WHERE task_list_id = ? AND is_active = 1",
    )
    .bind(task_list_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Soft-delete a set of tasks, returning how many rows flipped
pub async fn deactivate_many(
    conn: &mut SqliteConnection,
    ids: &[i64],
    now: i64,
) -> Result<u64, SqliteError> {
    let mut affected = 0;
    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE tasks SET is_active = 0, updated_at = ");
        qb.push_bind(now);
        qb.push(" WHERE is_active = 1 AND id IN (");
        let mut sep = qb.separated(", ");
        for id in chunk {
            sep.push_bind(*id);
        }
        qb.push(")");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

fn push_list_filter(qb: &mut QueryBuilder<'_, Sqlite>, task_list_id: i64, filter: &TaskFilter) {
    qb.push(" WHERE t.is_active = 1 AND t.task_list_id = ")
        .push_bind(task_list_id);

    if !filter.statuses.is_empty() {
        qb.push(" AND t.status IN (");
        let mut sep = qb.separated(", ");
        for status in &filter.statuses {
            sep.push_bind(status.as_str());
        }
        qb.push(")");
    }

    if filter.has_tag_filter() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM task_tags tt JOIN tags g ON g.id = tt.tag_id \
             WHERE tt.task_id = t.id AND g.is_active = 1 AND (",
        );
        let mut wrote = false;
        if !filter.tag_ids.is_empty() {
            qb.push("g.id IN (");
            let mut sep = qb.separated(", ");
            for id in &filter.tag_ids {
                sep.push_bind(*id);
            }
            qb.push(")");
            wrote = true;
        }
        if !filter.tag_names.is_empty() {
            if wrote {
                qb.push(" OR ");
            }
            qb.push("g.tag_name IN (");
            let mut sep = qb.separated(", ");
            for name in &filter.tag_names {
                sep.push_bind(name.clone());
            }
            qb.push(")");
        }
        qb.push("))");
    }

    if !filter.assigned_user_ids.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM task_assignments a WHERE a.task_id = t.id AND a.user_id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in &filter.assigned_user_ids {
            sep.push_bind(*id);
        }
        qb.push("))");
    }

    if let Some(start) = filter.due_start {
        qb.push(" AND t.due_datetime >= ").push_bind(start);
    }
    if let Some(end) = filter.due_end {
        qb.push(" AND t.due_datetime <= ").push_bind(end);
    }
}

/// `ORDER BY` clause for a sort key. Ties always break on id so pages are stable.
fn order_clause(sort_by: TaskSortBy, order: SortOrder) -> String {
    let dir = order.as_sql();
    match sort_by {
        TaskSortBy::Custom => format!(" ORDER BY t.position_order {dir}, t.id ASC"),
        TaskSortBy::Deadline => format!(
            " ORDER BY (t.due_datetime IS NULL) ASC, t.due_datetime {dir}, t.id ASC"
        ),
        TaskSortBy::Priority => format!(
            " ORDER BY CASE t.priority WHEN 'High' THEN 0 WHEN 'Medium' THEN 1 ELSE 2 END {dir}, \
             t.id ASC"
        ),
        TaskSortBy::CreatedAt => format!(" ORDER BY t.created_at {dir}, t.id ASC"),
    }
}

/// One page of active tasks of a list
pub async fn list_page(
    conn: &mut SqliteConnection,
    task_list_id: i64,
    filter: &TaskFilter,
    sort_by: TaskSortBy,
    order: SortOrder,
    window: PageWindow,
) -> Result<Vec<TaskRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks t"));
    push_list_filter(&mut qb, task_list_id, filter);
    qb.push(order_clause(sort_by, order));
    qb.push(" LIMIT ")
        .push_bind(window.limit())
        .push(" OFFSET ")
        .push_bind(window.offset());

    let rows = qb.build_query_as::<TaskRow>().fetch_all(conn).await?;
    Ok(rows)
}

/// Active tasks in a list, ignoring every filter
pub async fn count_active(
    conn: &mut SqliteConnection,
    task_list_id: i64,
) -> Result<i64, SqliteError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE task_list_id = ? AND is_active = 1")
            .bind(task_list_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

/// Active, not completed tasks in a list
pub async fn count_incomplete(
    conn: &mut SqliteConnection,
    task_list_id: i64,
) -> Result<i64, SqliteError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE task_list_id = ? AND is_active = 1 AND is_completed = 0",
    )
    .bind(task_list_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Active tasks in a list matching the filter
pub async fn count_filtered(
    conn: &mut SqliteConnection,
    task_list_id: i64,
    filter: &TaskFilter,
) -> Result<i64, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM tasks t");
    push_list_filter(&mut qb, task_list_id, filter);
    let count: i64 = qb.build_query_scalar().fetch_one(conn).await?;
    Ok(count)
}

fn push_search_filter(qb: &mut QueryBuilder<'_, Sqlite>, keyword: &str, scope: Scope) {
    let pattern = contains_pattern(keyword);
    qb.push(" JOIN task_lists l ON l.id = t.task_list_id AND l.is_active = 1");
    qb.push(" WHERE t.is_active = 1");
    match scope {
        Scope::Workspace(id) => qb.push(" AND l.workspace_id = ").push_bind(id),
        Scope::User(id) => qb.push(" AND l.user_id = ").push_bind(id),
    };
    qb.push(" AND (LOWER(t.title) LIKE ")
        .push_bind(pattern.clone())
        .push(" ESCAPE '\\' OR LOWER(COALESCE(t.description, '')) LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\')");
}

/// Case-insensitive title/description search within one scope
pub async fn search(
    conn: &mut SqliteConnection,
    keyword: &str,
    scope: Scope,
    window: PageWindow,
) -> Result<Vec<TaskRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks t"));
    push_search_filter(&mut qb, keyword, scope);
    qb.push(" ORDER BY t.updated_at DESC, t.id DESC LIMIT ")
        .push_bind(window.limit())
        .push(" OFFSET ")
        .push_bind(window.offset());
    let rows = qb.build_query_as::<TaskRow>().fetch_all(conn).await?;
    Ok(rows)
}

pub async fn search_count(
    conn: &mut SqliteConnection,
    keyword: &str,
    scope: Scope,
) -> Result<i64, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM tasks t");
    push_search_filter(&mut qb, keyword, scope);
    let count: i64 = qb.build_query_scalar().fetch_one(conn).await?;
    Ok(count)
}

/// Write a full snapshot back: insert if the id is gone, else overwrite every non-key column
pub async fn upsert_task(conn: &mut SqliteConnection, row: &TaskRow) -> Result<(), SqliteError> {
    sqlx::query(
        r#"
        INSERT INTO tasks (id, task_list_id, parent_task_id, title, description, priority, status,
                           is_completed, due_datetime, recurrence_rule, recurrence_end_date,
                           position_order, is_active, created_by_user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            task_list_id = excluded.task_list_id,
            parent_task_id = excluded.parent_task_id,
            title = excluded.title,
            description = excluded.description,
            priority = excluded.priority,
            status = excluded.status,
            is_completed = excluded.is_completed,
            due_datetime = excluded.due_datetime,
            recurrence_rule = excluded.recurrence_rule,
            recurrence_end_date = excluded.recurrence_end_date,
            position_order = excluded.position_order,
            is_active = excluded.is_active,
            created_by_user_id = excluded.created_by_user_id,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(row.id)
    .bind(row.task_list_id)
    .bind(row.parent_task_id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.priority)
    .bind(row.status)
    .bind(row.is_completed)
    .bind(row.due_datetime)
    .bind(&row.recurrence_rule)
    .bind(row.recurrence_end_date)
    .bind(row.position_order)
    .bind(row.is_active)
    .bind(row.created_by_user_id)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::sqlite::memory_pool;
    use crate::data::sqlite::repositories::task_list::{self, NewTaskList};
    use crate::data::sqlite::repositories::user;

    pub(crate) fn new_task(list_id: i64, user_id: i64, title: &str) -> NewTask {
        NewTask {
            task_list_id: list_id,
            parent_task_id: None,
            title: title.to_string(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            is_completed: false,
            due_datetime: None,
            recurrence_rule: None,
            recurrence_end_date: None,
            position_order: 0,
            created_by_user_id: user_id,
        }
    }

    async fn seed(conn: &mut SqliteConnection) -> (i64, i64) {
        let u = user::create_user(conn, "t@example.com", "h", None, 1)
            .await
            .unwrap();
        let list = task_list::insert_task_list(
            conn,
            &NewTaskList {
                name: "L",
                description: None,
                scope: Scope::User(u.id),
                position_order: 0,
                created_by_user_id: u.id,
            },
            1,
        )
        .await
        .unwrap();
        (u.id, list.id)
    }

    fn first_page() -> PageWindow {
        PageWindow {
            page: 1,
            page_size: 25,
        }
    }

    #[tokio::test]
    async fn test_insert_defaults_and_patch() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (uid, list) = seed(&mut conn).await;

        let task = insert_task(&mut conn, &new_task(list, uid, "Buy milk"), 5)
            .await
            .unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.is_active);

        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            is_completed: Some(true),
            description: Some(Some("2 litres".into())),
            ..Default::default()
        };
        let updated = update_task(&mut conn, task.id, &patch, 6)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert!(updated.is_completed);
        assert_eq!(updated.description.as_deref(), Some("2 litres"));
        assert_eq!(updated.title, "Buy milk");

        let cleared = TaskPatch {
            description: Some(None),
            ..Default::default()
        };
        let updated = update_task(&mut conn, task.id, &cleared, 7)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.description.is_none());
    }

    #[tokio::test]
    async fn test_priority_sort_is_rank_not_lexical() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (uid, list) = seed(&mut conn).await;

        let mut ids = Vec::new();
        for p in [
            TaskPriority::Low,
            TaskPriority::High,
            TaskPriority::Medium,
            TaskPriority::High,
        ] {
            let mut t = new_task(list, uid, "x");
            t.priority = p;
            ids.push(insert_task(&mut conn, &t, 1).await.unwrap().id);
        }

        let rows = list_page(
            &mut conn,
            list,
            &TaskFilter::default(),
            TaskSortBy::Priority,
            SortOrder::Asc,
            first_page(),
        )
        .await
        .unwrap();
        let got: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(got, vec![ids[1], ids[3], ids[2], ids[0]]);
    }

    #[tokio::test]
    async fn test_deadline_sort_keeps_nulls_last() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (uid, list) = seed(&mut conn).await;

        let mut none = new_task(list, uid, "none");
        none.due_datetime = None;
        let none_id = insert_task(&mut conn, &none, 1).await.unwrap().id;
        let mut early = new_task(list, uid, "early");
        early.due_datetime = Some(100);
        let early_id = insert_task(&mut conn, &early, 1).await.unwrap().id;
        let mut late = new_task(list, uid, "late");
        late.due_datetime = Some(200);
        let late_id = insert_task(&mut conn, &late, 1).await.unwrap().id;

        for (order, expected) in [
            (SortOrder::Asc, vec![early_id, late_id, none_id]),
            (SortOrder::Desc, vec![late_id, early_id, none_id]),
        ] {
            let rows = list_page(
                &mut conn,
                list,
                &TaskFilter::default(),
                TaskSortBy::Deadline,
                order,
                first_page(),
            )
            .await
            .unwrap();
            let got: Vec<i64> = rows.iter().map(|r| r.id).collect();
            assert_eq!(got, expected);
        }
    }

    #[tokio::test]
    async fn test_filters_and_counts() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (uid, list) = seed(&mut conn).await;

        let mut done = new_task(list, uid, "done");
        done.status = TaskStatus::Completed;
        done.due_datetime = Some(50);
        insert_task(&mut conn, &done, 1).await.unwrap();
        let mut open = new_task(list, uid, "open");
        open.due_datetime = Some(150);
        let open_id = insert_task(&mut conn, &open, 1).await.unwrap().id;

        let filter = TaskFilter {
            statuses: vec![TaskStatus::Pending],
            due_start: Some(100),
            due_end: Some(150),
            ..Default::default()
        };
        let rows = list_page(
            &mut conn,
            list,
            &filter,
            TaskSortBy::Custom,
            SortOrder::Asc,
            first_page(),
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, open_id);
        assert_eq!(count_active(&mut conn, list).await.unwrap(), 2);
        assert_eq!(count_incomplete(&mut conn, list).await.unwrap(), 2);
        assert_eq!(count_filtered(&mut conn, list, &filter).await.unwrap(), 1);

        let by_assignee = TaskFilter {
            assigned_user_ids: vec![uid],
            ..Default::default()
        };
        assert_eq!(count_filtered(&mut conn, list, &by_assignee).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deactivate_many_and_edges() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (uid, list) = seed(&mut conn).await;

        let root = insert_task(&mut conn, &new_task(list, uid, "root"), 1)
            .await
            .unwrap();
        let mut child = new_task(list, uid, "child");
        child.parent_task_id = Some(root.id);
        let child = insert_task(&mut conn, &child, 1).await.unwrap();

        let edges = edges_for_list(&mut conn, list).await.unwrap();
        assert_eq!(edges.len(), 2);

        let flipped = deactivate_many(&mut conn, &[root.id, child.id], 2)
            .await
            .unwrap();
        assert_eq!(flipped, 2);
        // Already inactive rows are not counted again
        assert_eq!(deactivate_many(&mut conn, &[root.id], 3).await.unwrap(), 0);
        assert!(edges_for_list(&mut conn, list).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_scoped_and_case_insensitive() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (uid, list) = seed(&mut conn).await;

        let mut t = new_task(list, uid, "Buy MILK");
        t.description = Some("from the 100% organic shop".into());
        insert_task(&mut conn, &t, 1).await.unwrap();
        insert_task(&mut conn, &new_task(list, uid, "Walk dog"), 1)
            .await
            .unwrap();

        let hits = search(&mut conn, "milk", Scope::User(uid), first_page())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(search_count(&mut conn, "100%", Scope::User(uid)).await.unwrap(), 1);
        assert_eq!(search_count(&mut conn, "milk", Scope::User(uid + 1)).await.unwrap(), 0);
        assert_eq!(search_count(&mut conn, "milk", Scope::Workspace(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_reinserts_missing_row() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let (uid, list) = seed(&mut conn).await;
        let task = insert_task(&mut conn, &new_task(list, uid, "gone"), 1)
            .await
            .unwrap();

        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        upsert_task(&mut conn, &task).await.unwrap();
        assert_eq!(get_task(&mut conn, task.id).await.unwrap(), Some(task));
    }
}
