//! Access resolution for lists, tasks and tags
//!
//! Workspace-scoped entities require an active membership. Personal entities
//! require the requester to be the owner. Rows with neither or both scope
//! columns set are integrity faults and surface as `InvalidOwner`.

use sqlx::SqliteConnection;

use crate::data::sqlite::repositories::{task, task_list, workspace};
use crate::data::types::{Scope, TaskListRow, TaskRow};

use super::error::{DomainError, DomainResult};

/// Outcome of checking a list against a requester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAccess {
    Allowed(Scope),
    Forbidden,
    InvalidOwner,
}

impl ListAccess {
    /// Turn a denial into the matching error
    pub fn into_result(self) -> DomainResult<Scope> {
        match self {
            Self::Allowed(scope) => Ok(scope),
            Self::Forbidden => Err(DomainError::forbidden("Access denied to this task list")),
            Self::InvalidOwner => Err(invalid_owner()),
        }
    }
}

/// An accessible, active task together with its list's scope
#[derive(Debug, Clone)]
pub struct TaskAccess {
    pub task: TaskRow,
    pub scope: Scope,
}

impl TaskAccess {
    pub fn workspace_id(&self) -> Option<i64> {
        self.scope.workspace_id()
    }

    pub fn personal_owner(&self) -> Option<i64> {
        self.scope.user_id()
    }
}

pub(crate) fn invalid_owner() -> DomainError {
    DomainError::InvalidOwner(
        "Task list must belong to exactly one of a workspace or a user".to_string(),
    )
}

/// True iff an active membership row exists
pub async fn can_access_workspace(
    conn: &mut SqliteConnection,
    user_id: i64,
    workspace_id: i64,
) -> DomainResult<bool> {
    Ok(workspace::is_active_member(conn, user_id, workspace_id).await?)
}

/// Whether `user_id` may act within `scope`
pub async fn can_access_scope(
    conn: &mut SqliteConnection,
    user_id: i64,
    scope: Scope,
) -> DomainResult<bool> {
    match scope {
        Scope::Workspace(ws) => can_access_workspace(conn, user_id, ws).await,
        Scope::User(owner) => Ok(owner == user_id),
    }
}

pub async fn resolve_list_access(
    conn: &mut SqliteConnection,
    user_id: i64,
    list: &TaskListRow,
) -> DomainResult<ListAccess> {
    let Some(scope) = list.scope() else {
        return Ok(ListAccess::InvalidOwner);
    };
    if can_access_scope(conn, user_id, scope).await? {
        Ok(ListAccess::Allowed(scope))
    } else {
        Ok(ListAccess::Forbidden)
    }
}

/// Load an active list the requester can access
pub async fn load_accessible_list(
    conn: &mut SqliteConnection,
    user_id: i64,
    list_id: i64,
) -> DomainResult<(TaskListRow, Scope)> {
    let list = task_list::get_task_list(conn, list_id)
        .await?
        .filter(|l| l.is_active)
        .ok_or_else(|| DomainError::not_found("Task list not found"))?;
    let scope = resolve_list_access(conn, user_id, &list)
        .await?
        .into_result()?;
    Ok((list, scope))
}

/// Load an active task whose active list the requester can access.
///
/// Missing, inactive and inaccessible tasks are all reported as not found.
pub async fn resolve_task_access(
    conn: &mut SqliteConnection,
    user_id: i64,
    task_id: i64,
) -> DomainResult<TaskAccess> {
    let not_found = || DomainError::not_found("Task not found or access denied");

    let task = task::get_task(conn, task_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(not_found)?;
    let list = task_list::get_task_list(conn, task.task_list_id)
        .await?
        .filter(|l| l.is_active)
        .ok_or_else(not_found)?;

    match resolve_list_access(conn, user_id, &list).await? {
        ListAccess::Allowed(scope) => Ok(TaskAccess { task, scope }),
        ListAccess::Forbidden => Err(not_found()),
        ListAccess::InvalidOwner => Err(invalid_owner()),
    }
}

/// Whether `user_id` may be assigned to tasks of a list with this scope
pub async fn user_is_assignable(
    conn: &mut SqliteConnection,
    user_id: i64,
    scope: Scope,
) -> DomainResult<bool> {
    can_access_scope(conn, user_id, scope).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::sqlite::memory_pool;
    use crate::data::sqlite::repositories::task_list::NewTaskList;
    use crate::data::sqlite::repositories::user;

    pub(crate) async fn user(conn: &mut SqliteConnection, email: &str) -> i64 {
        user::create_user(conn, email, "h", None, 1).await.unwrap().id
    }

    pub(crate) async fn team(conn: &mut SqliteConnection, members: &[i64]) -> i64 {
        let ws = workspace::create_workspace(conn, "Team", false, members[0], 1)
            .await
            .unwrap();
        for m in members {
            workspace::upsert_member(conn, ws.id, *m, "member", 1)
                .await
                .unwrap();
        }
        ws.id
    }

    pub(crate) async fn list(conn: &mut SqliteConnection, scope: Scope, creator: i64) -> i64 {
        task_list::insert_task_list(
            conn,
            &NewTaskList {
                name: "List",
                description: None,
                scope,
                position_order: 0,
                created_by_user_id: creator,
            },
            1,
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_list_access_variants() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let alice = user(&mut conn, "alice@example.com").await;
        let bob = user(&mut conn, "bob@example.com").await;
        let ws = team(&mut conn, &[alice]).await;

        let personal = list(&mut conn, Scope::User(alice), alice).await;
        let shared = list(&mut conn, Scope::Workspace(ws), alice).await;

        let row = task_list::get_task_list(&mut conn, personal).await.unwrap().unwrap();
        assert_eq!(
            resolve_list_access(&mut conn, alice, &row).await.unwrap(),
            ListAccess::Allowed(Scope::User(alice))
        );
        assert_eq!(
            resolve_list_access(&mut conn, bob, &row).await.unwrap(),
            ListAccess::Forbidden
        );

        let row = task_list::get_task_list(&mut conn, shared).await.unwrap().unwrap();
        assert_eq!(
            resolve_list_access(&mut conn, bob, &row).await.unwrap(),
            ListAccess::Forbidden
        );

        sqlx::query("UPDATE task_lists SET user_id = ? WHERE id = ?")
            .bind(alice)
            .bind(shared)
            .execute(&mut *conn)
            .await
            .unwrap();
        let row = task_list::get_task_list(&mut conn, shared).await.unwrap().unwrap();
        assert_eq!(
            resolve_list_access(&mut conn, alice, &row).await.unwrap(),
            ListAccess::InvalidOwner
        );
        assert!(matches!(
            load_accessible_list(&mut conn, alice, shared).await,
            Err(DomainError::InvalidOwner(_))
        ));
    }

    #[tokio::test]
    async fn test_task_access_hides_inactive_list() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let alice = user(&mut conn, "alice@example.com").await;
        let bob = user(&mut conn, "bob@example.com").await;
        let l = list(&mut conn, Scope::User(alice), alice).await;
        let t = task::insert_task(
            &mut conn,
            &crate::data::sqlite::repositories::task::tests::new_task(l, alice, "x"),
            1,
        )
        .await
        .unwrap();

        let access = resolve_task_access(&mut conn, alice, t.id).await.unwrap();
        assert_eq!(access.personal_owner(), Some(alice));
        assert_eq!(access.workspace_id(), None);

        assert!(matches!(
            resolve_task_access(&mut conn, bob, t.id).await,
            Err(DomainError::NotFound(_))
        ));

        sqlx::query("UPDATE task_lists SET is_active = 0 WHERE id = ?")
            .bind(l)
            .execute(&mut *conn)
            .await
            .unwrap();
        assert!(matches!(
            resolve_task_access(&mut conn, alice, t.id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_assignable_follows_membership() {
        let pool = memory_pool().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let alice = user(&mut conn, "alice@example.com").await;
        let bob = user(&mut conn, "bob@example.com").await;
        let ws = team(&mut conn, &[alice, bob]).await;

        assert!(user_is_assignable(&mut conn, bob, Scope::Workspace(ws)).await.unwrap());
        assert!(!user_is_assignable(&mut conn, bob, Scope::User(alice)).await.unwrap());
        assert!(user_is_assignable(&mut conn, alice, Scope::User(alice)).await.unwrap());
    }
}
