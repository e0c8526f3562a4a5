//! Task reads: detail assembly, filtered listings and search

use std::collections::HashMap;

use sqlx::SqliteConnection;

use crate::core::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::data::sqlite::repositories::{assignment, tag, task};
use crate::data::types::{
    PageWindow, Scope, SortOrder, TaskFilter, TaskRow, TaskSortBy, TaskTagRow, UserRef,
};

use super::access::{load_accessible_list, resolve_task_access};
use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};

/// A task with its active tags and assignees
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetail {
    pub task: TaskRow,
    pub tags: Vec<TaskTagRow>,
    pub assigned_users: Vec<UserRef>,
}

impl TaskDetail {
    pub fn assignee_ids(&self) -> Vec<i64> {
        self.assigned_users.iter().map(|u| u.user_id).collect()
    }
}

/// Attach tags and assignees to a batch of rows, keeping row order
pub async fn load_details(
    conn: &mut SqliteConnection,
    rows: Vec<TaskRow>,
) -> DomainResult<Vec<TaskDetail>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let mut tags: HashMap<i64, Vec<TaskTagRow>> = HashMap::new();
    for row in tag::tags_for_tasks(conn, &ids).await? {
        tags.entry(row.task_id).or_default().push(row);
    }
    let mut users: HashMap<i64, Vec<UserRef>> = HashMap::new();
    for row in assignment::assignees_for_tasks(conn, &ids).await? {
        users.entry(row.task_id).or_default().push(row.user);
    }

    Ok(rows
        .into_iter()
        .map(|task| TaskDetail {
            tags: tags.remove(&task.id).unwrap_or_default(),
            assigned_users: users.remove(&task.id).unwrap_or_default(),
            task,
        })
        .collect())
}

pub async fn load_detail(conn: &mut SqliteConnection, row: TaskRow) -> DomainResult<TaskDetail> {
    load_details(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| DomainError::Internal("task detail assembly returned nothing".into()))
}

/// Clamp raw paging input: page >= 1, page_size in [1, MAX_PAGE_SIZE]
pub fn page_window(page: Option<i64>, page_size: Option<i64>) -> PageWindow {
    let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
    let page_size = page_size
        .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
        .clamp(1, i64::from(MAX_PAGE_SIZE));
    PageWindow {
        page: page as u32,
        page_size: page_size as u32,
    }
}

/// Listing request for one list
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub task_list_id: i64,
    pub filter: TaskFilter,
    pub sort_by: TaskSortBy,
    pub sort_order: SortOrder,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// One page of tasks.
///
/// `total_count` covers every active task of the list and ignores filters.
/// `filtered_count` is the exact count under the filters.
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<TaskDetail>,
    pub total_count: i64,
    pub filtered_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl TaskEngine {
    pub async fn get_task(&self, user_id: i64, task_id: i64) -> DomainResult<TaskDetail> {
        let mut conn = self.pool.acquire().await?;
        let access = resolve_task_access(&mut conn, user_id, task_id).await?;
        load_detail(&mut conn, access.task).await
    }

    pub async fn list_tasks(&self, user_id: i64, query: TaskQuery) -> DomainResult<TaskPage> {
        let window = page_window(query.page, query.page_size);
        let mut conn = self.pool.acquire().await?;
        load_accessible_list(&mut conn, user_id, query.task_list_id).await?;

        let rows = task::list_page(
            &mut conn,
            query.task_list_id,
            &query.filter,
            query.sort_by,
            query.sort_order,
            window,
        )
        .await?;
        let total_count = task::count_active(&mut conn, query.task_list_id).await?;
        let filtered_count =
            task::count_filtered(&mut conn, query.task_list_id, &query.filter).await?;
        let tasks = load_details(&mut conn, rows).await?;

        Ok(TaskPage {
            tasks,
            total_count,
            filtered_count,
            page: window.page,
            page_size: window.page_size,
        })
    }

    /// Substring search over one workspace, or the caller's personal lists
    pub async fn search_tasks(
        &self,
        user_id: i64,
        keyword: &str,
        workspace_id: Option<i64>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> DomainResult<TaskPage> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(DomainError::validation("Search keyword must not be empty"));
        }
        let window = page_window(page, page_size);
        let mut conn = self.pool.acquire().await?;

        let scope = match workspace_id {
            Some(ws) => {
                if !super::access::can_access_workspace(&mut conn, user_id, ws).await? {
                    return Err(DomainError::forbidden("Not a member of this workspace"));
                }
                Scope::Workspace(ws)
            }
            None => Scope::User(user_id),
        };

        let rows = task::search(&mut conn, keyword, scope, window).await?;
        let total_count = task::search_count(&mut conn, keyword, scope).await?;
        let tasks = load_details(&mut conn, rows).await?;
        Ok(TaskPage {
            tasks,
            total_count,
            filtered_count: total_count,
            page: window.page,
            page_size: window.page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::task::tests::new_task;
    use crate::data::types::TaskStatus;
    use crate::domain::access::tests::{list, team, user};
    use crate::domain::engine::testing::engine;

    #[test]
    fn test_page_window_clamps() {
        assert_eq!(
            page_window(Some(0), Some(500)),
            PageWindow {
                page: 1,
                page_size: 100
            }
        );
        assert_eq!(
            page_window(None, None),
            PageWindow {
                page: 1,
                page_size: 25
            }
        );
        assert_eq!(page_window(Some(-3), Some(0)).page_size, 1);
    }

    #[tokio::test]
    async fn test_list_tasks_counts_and_access() {
        let (engine, _) = engine().await;
        let (alice, bob, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let bob = user(&mut conn, "b@example.com").await;
            let l = list(&mut conn, Scope::User(alice), alice).await;
            let mut done = new_task(l, alice, "done");
            done.status = TaskStatus::Completed;
            task::insert_task(&mut conn, &done, 1).await.unwrap();
            task::insert_task(&mut conn, &new_task(l, alice, "open"), 1)
                .await
                .unwrap();
            (alice, bob, l)
        };

        let page = engine
            .list_tasks(
                alice,
                TaskQuery {
                    task_list_id: l,
                    filter: TaskFilter {
                        statuses: vec![TaskStatus::Pending],
                        ..Default::default()
                    },
                    page: Some(0),
                    page_size: Some(500),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.total_count, 2);
        assert_eq!(page.filtered_count, 1);
        assert_eq!((page.page, page.page_size), (1, 100));

        let denied = engine
            .list_tasks(
                bob,
                TaskQuery {
                    task_list_id: l,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(denied, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_search_requires_membership() {
        let (engine, _) = engine().await;
        let (alice, bob, ws) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let bob = user(&mut conn, "b@example.com").await;
            let ws = team(&mut conn, &[alice]).await;
            let l = list(&mut conn, Scope::Workspace(ws), alice).await;
            task::insert_task(&mut conn, &new_task(l, alice, "Quarterly report"), 1)
                .await
                .unwrap();
            (alice, bob, ws)
        };

        let page = engine
            .search_tasks(alice, "REPORT", Some(ws), None, None)
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert!(matches!(
            engine.search_tasks(bob, "report", Some(ws), None, None).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            engine.search_tasks(alice, "  ", None, None, None).await,
            Err(DomainError::Validation(_))
        ));
    }
}
