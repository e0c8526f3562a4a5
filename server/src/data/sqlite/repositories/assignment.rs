//! Task assignment repository

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::data::sqlite::SqliteError;
use crate::data::types::AssigneeRow;

/// Users currently assigned to a task
pub async fn assigned_user_ids(
    conn: &mut SqliteConnection,
    task_id: i64,
) -> Result<Vec<i64>, SqliteError> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT user_id FROM task_assignments WHERE task_id = ? ORDER BY user_id",
    )
    .bind(task_id)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

/// Assign a user. Assigning twice is a no-op.
pub async fn insert_assignment(
    conn: &mut SqliteConnection,
    task_id: i64,
    user_id: i64,
    now: i64,
) -> Result<bool, SqliteError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO task_assignments (task_id, user_id, assigned_at) VALUES (?, ?, ?)",
    )
    .bind(task_id)
    .bind(user_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Unassign a user, returning whether a row existed
pub async fn delete_assignment(
    conn: &mut SqliteConnection,
    task_id: i64,
    user_id: i64,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM task_assignments WHERE task_id = ? AND user_id = ?")
        .bind(task_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Assigned users of a batch of tasks
pub async fn assignees_for_tasks(
    conn: &mut SqliteConnection,
    task_ids: &[i64],
) -> Result<Vec<AssigneeRow>, SqliteError> {
    if task_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT a.task_id, u.id AS user_id, u.email, u.full_name \
         FROM task_assignments a JOIN users u ON u.id = a.user_id \
         WHERE a.task_id IN (",
    );
    let mut sep = qb.separated(", ");
    for id in task_ids {
        sep.push_bind(*id);
    }
    qb.push(") ORDER BY a.task_id, a.assigned_at, u.id");
    let rows = qb.build_query_as::<AssigneeRow>().fetch_all(conn).await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::memory_pool;
    use crate::data::sqlite::repositories::{task, task_list, user};
    use crate::data::types::Scope;

    #[tokio::test]
    async fn test_assign_and_unassign() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let a = user::create_user(&mut conn, "a@example.com", "h", Some("A"), 1)
            .await
            .unwrap();
        let b = user::create_user(&mut conn, "b@example.com", "h", None, 1)
            .await
            .unwrap();
        let list = task_list::insert_task_list(
            &mut conn,
            &task_list::NewTaskList {
                name: "L",
                description: None,
                scope: Scope::User(a.id),
                position_order: 0,
                created_by_user_id: a.id,
            },
            1,
        )
        .await
        .unwrap();
        let t = task::insert_task(&mut conn, &task::tests::new_task(list.id, a.id, "x"), 1)
            .await
            .unwrap();

        assert!(insert_assignment(&mut conn, t.id, a.id, 1).await.unwrap());
        assert!(!insert_assignment(&mut conn, t.id, a.id, 2).await.unwrap());
        assert!(insert_assignment(&mut conn, t.id, b.id, 3).await.unwrap());
        assert_eq!(
            assigned_user_ids(&mut conn, t.id).await.unwrap(),
            vec![a.id, b.id]
        );

        let rows = assignees_for_tasks(&mut conn, &[t.id]).await.unwrap();
        assert_eq!(rows[0].user.full_name.as_deref(), Some("A"));
        assert_eq!(rows[1].user.email, "b@example.com");

        assert!(delete_assignment(&mut conn, t.id, b.id).await.unwrap());
        assert!(!delete_assignment(&mut conn, t.id, b.id).await.unwrap());
        assert!(assignees_for_tasks(&mut conn, &[]).await.unwrap().is_empty());
    }
}
