//! Undo log repository

use sqlx::SqliteConnection;

use crate::data::sqlite::SqliteError;
use crate::data::types::UndoRow;

pub async fn insert_entry(
    conn: &mut SqliteConnection,
    user_id: i64,
    entity_type: &str,
    entity_id: i64,
    operation: &str,
    data_snapshot: &str,
    now: i64,
) -> Result<i64, SqliteError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO undo_log (user_id, entity_type, entity_id, operation, data_snapshot, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(entity_type)
    .bind(entity_id)
    .bind(operation)
    .bind(data_snapshot)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn get_entry(conn: &mut SqliteConnection, id: i64) -> Result<Option<UndoRow>, SqliteError> {
    let row = sqlx::query_as::<_, UndoRow>(
        "SELECT id, user_id, entity_type, entity_id, operation, data_snapshot, created_at \
         FROM undo_log WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn delete_entry(conn: &mut SqliteConnection, id: i64) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM undo_log WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop a user's entries created before `cutoff`
pub async fn purge_expired(
    conn: &mut SqliteConnection,
    user_id: i64,
    cutoff: i64,
) -> Result<u64, SqliteError> {
    let result = sqlx::query("DELETE FROM undo_log WHERE user_id = ? AND created_at < ?")
        .bind(user_id)
        .bind(cutoff)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::memory_pool;
    use crate::data::sqlite::repositories::user;

    #[tokio::test]
    async fn test_entry_lifecycle() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let u = user::create_user(&mut conn, "u@example.com", "h", None, 1)
            .await
            .unwrap();

        let old = insert_entry(&mut conn, u.id, "task", 1, "delete", "{}", 100)
            .await
            .unwrap();
        let fresh = insert_entry(&mut conn, u.id, "task", 2, "delete", "{}", 200)
            .await
            .unwrap();

        assert_eq!(purge_expired(&mut conn, u.id, 150).await.unwrap(), 1);
        assert!(get_entry(&mut conn, old).await.unwrap().is_none());

        let entry = get_entry(&mut conn, fresh).await.unwrap().unwrap();
        assert_eq!(entry.entity_id, 2);
        assert_eq!(entry.operation, "delete");

        assert!(delete_entry(&mut conn, fresh).await.unwrap());
        assert!(!delete_entry(&mut conn, fresh).await.unwrap());
    }
}
