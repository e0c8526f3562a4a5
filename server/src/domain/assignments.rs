//! Assignee management
//!
//! Only users who can access the list's scope may be assigned. The task's
//! creator is always assigned and is never removed by a replace.

use sqlx::SqliteConnection;

use crate::data::sqlite::repositories::assignment;
use crate::data::types::{Scope, TaskRow};

use super::access::user_is_assignable;
use super::error::{DomainError, DomainResult};

/// Requested ids that may be assigned in `scope`, deduplicated, order kept
async fn assignable_subset(
    conn: &mut SqliteConnection,
    scope: Scope,
    requested: &[i64],
) -> DomainResult<Vec<i64>> {
    let mut out = Vec::with_capacity(requested.len());
    for &user_id in requested {
        if out.contains(&user_id) {
            continue;
        }
        if user_is_assignable(conn, user_id, scope).await? {
            out.push(user_id);
        } else {
            tracing::debug!(user_id, ?scope, "Skipped assignee without access");
        }
    }
    Ok(out)
}

/// Make the assignee set equal to the accessible part of `requested` plus the creator.
///
/// Returns the final set.
pub async fn replace_assignees(
    conn: &mut SqliteConnection,
    task: &TaskRow,
    scope: Scope,
    requested: &[i64],
    now: i64,
) -> DomainResult<Vec<i64>> {
    let mut wanted = assignable_subset(conn, scope, requested).await?;
    if !wanted.contains(&task.created_by_user_id) {
        wanted.insert(0, task.created_by_user_id);
    }

    let current = assignment::assigned_user_ids(conn, task.id).await?;
    for user_id in &current {
        if *user_id != task.created_by_user_id && !wanted.contains(user_id) {
            assignment::delete_assignment(conn, task.id, *user_id).await?;
        }
    }
    for user_id in &wanted {
        if !current.contains(user_id) {
            assignment::insert_assignment(conn, task.id, *user_id, now).await?;
        }
    }
    Ok(assignment::assigned_user_ids(conn, task.id).await?)
}

/// Add accessible users to the set. Returns the ids that were newly assigned.
pub async fn add_assignees(
    conn: &mut SqliteConnection,
    task: &TaskRow,
    scope: Scope,
    requested: &[i64],
    now: i64,
) -> DomainResult<Vec<i64>> {
    let mut added = Vec::new();
    for user_id in assignable_subset(conn, scope, requested).await? {
        if assignment::insert_assignment(conn, task.id, user_id, now).await? {
            added.push(user_id);
        }
    }
    Ok(added)
}

/// Remove one assignee. The creator cannot be removed.
pub async fn remove_assignee(
    conn: &mut SqliteConnection,
    task: &TaskRow,
    user_id: i64,
) -> DomainResult<()> {
    if user_id == task.created_by_user_id {
        return Err(DomainError::validation(
            "The task creator cannot be unassigned",
        ));
    }
    if !assignment::delete_assignment(conn, task.id, user_id).await? {
        return Err(DomainError::not_found("User is not assigned to this task"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::memory_pool;
    use crate::data::sqlite::repositories::task;
    use crate::data::sqlite::repositories::task::tests::new_task;
    use crate::domain::access::tests::{list, team, user};

    #[tokio::test]
    async fn test_replace_with_empty_keeps_creator() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let alice = user(&mut conn, "a@example.com").await;
        let bob = user(&mut conn, "b@example.com").await;
        let outsider = user(&mut conn, "c@example.com").await;
        let ws = team(&mut conn, &[alice, bob]).await;
        let l = list(&mut conn, Scope::Workspace(ws), alice).await;
        let t = task::insert_task(&mut conn, &new_task(l, alice, "x"), 1)
            .await
            .unwrap();
        let scope = Scope::Workspace(ws);

        let set = replace_assignees(&mut conn, &t, scope, &[bob, outsider, bob], 1)
            .await
            .unwrap();
        assert_eq!(set, vec![alice, bob]);

        let set = replace_assignees(&mut conn, &t, scope, &[], 2).await.unwrap();
        assert_eq!(set, vec![alice]);
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let alice = user(&mut conn, "a@example.com").await;
        let bob = user(&mut conn, "b@example.com").await;
        let ws = team(&mut conn, &[alice, bob]).await;
        let l = list(&mut conn, Scope::Workspace(ws), alice).await;
        let t = task::insert_task(&mut conn, &new_task(l, alice, "x"), 1)
            .await
            .unwrap();
        let scope = Scope::Workspace(ws);
        replace_assignees(&mut conn, &t, scope, &[], 1).await.unwrap();

        assert_eq!(
            add_assignees(&mut conn, &t, scope, &[alice, bob], 2)
                .await
                .unwrap(),
            vec![bob]
        );
        assert!(matches!(
            remove_assignee(&mut conn, &t, alice).await,
            Err(DomainError::Validation(_))
        ));
        remove_assignee(&mut conn, &t, bob).await.unwrap();
        assert!(matches!(
            remove_assignee(&mut conn, &t, bob).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
