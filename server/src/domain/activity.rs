//! Activity log sink
//!
//! Writes happen after the mutation commits, on their own connection.
//! Failures are logged and swallowed.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::data::sqlite::repositories::activity::{self, ActivityScope};
use crate::data::types::ActivityRow;
use crate::utils::time::now_secs;

use super::access::{can_access_workspace, resolve_task_access};
use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};
use super::query::page_window;

/// One audit row
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub user_id: i64,
    pub workspace_id: Option<i64>,
    pub task_id: Option<i64>,
    pub action: &'static str,
    pub details: Value,
}

impl ActivityEvent {
    pub fn new(user_id: i64, action: &'static str) -> Self {
        Self {
            user_id,
            workspace_id: None,
            task_id: None,
            action,
            details: Value::Object(Default::default()),
        }
    }

    pub fn workspace(mut self, workspace_id: Option<i64>) -> Self {
        self.workspace_id = workspace_id;
        self
    }

    pub fn task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Clone)]
pub struct ActivityRecorder {
    pool: SqlitePool,
}

impl ActivityRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fire-and-forget write
    pub async fn record(&self, event: ActivityEvent) {
        let result = async {
            let mut conn = self.pool.acquire().await?;
            activity::insert_activity(
                &mut conn,
                event.user_id,
                event.workspace_id,
                event.task_id,
                event.action,
                &event.details.to_string(),
                now_secs(),
            )
            .await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                action = event.action,
                user_id = event.user_id,
                "Failed to record activity"
            );
        }
    }
}

/// One page of activity rows, newest first
#[derive(Debug, Clone)]
pub struct ActivityPage {
    pub logs: Vec<ActivityRow>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl TaskEngine {
    /// Workspace rows need membership, task rows need task access,
    /// otherwise the caller's own rows.
    pub async fn list_activity(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
        task_id: Option<i64>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> DomainResult<ActivityPage> {
        let window = page_window(page, page_size);
        let mut conn = self.pool.acquire().await?;

        let scope = match (workspace_id, task_id) {
            (Some(ws), _) => {
                if !can_access_workspace(&mut conn, user_id, ws).await? {
                    return Err(DomainError::forbidden("Not a member of this workspace"));
                }
                ActivityScope::Workspace(ws)
            }
            (None, Some(task)) => {
                resolve_task_access(&mut conn, user_id, task).await?;
                ActivityScope::Task(task)
            }
            (None, None) => ActivityScope::User(user_id),
        };

        let logs = activity::list_activity(&mut conn, scope, window).await?;
        let total_count = activity::count_activity(&mut conn, scope).await?;
        Ok(ActivityPage {
            logs,
            total_count,
            page: window.page,
            page_size: window.page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::memory_pool;
    use crate::data::sqlite::repositories::activity::{ActivityScope, list_activity};
    use crate::data::sqlite::repositories::user;
    use crate::data::types::PageWindow;

    #[tokio::test]
    async fn test_record_writes_row() {
        let pool = memory_pool().await.unwrap();
        let uid = {
            let mut conn = pool.acquire().await.unwrap();
            user::create_user(&mut conn, "a@example.com", "h", None, 1)
                .await
                .unwrap()
                .id
        };

        let recorder = ActivityRecorder::new(pool.clone());
        recorder
            .record(
                ActivityEvent::new(uid, "task_created")
                    .details(serde_json::json!({"title": "Buy milk"})),
            )
            .await;

        let mut conn = pool.acquire().await.unwrap();
        let rows = list_activity(
            &mut conn,
            ActivityScope::User(uid),
            PageWindow {
                page: 1,
                page_size: 10,
            },
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].details, r#"{"title":"Buy milk"}"#);
    }

    #[tokio::test]
    async fn test_record_failure_is_swallowed() {
        let pool = memory_pool().await.unwrap();
        let recorder = ActivityRecorder::new(pool);
        // Unknown user violates the foreign key; must not panic
        recorder.record(ActivityEvent::new(12345, "task_deleted")).await;
    }

    #[tokio::test]
    async fn test_list_activity_scopes() {
        use crate::domain::access::tests::{list, team, user as make_user};
        use crate::domain::engine::testing::engine;
        use crate::domain::tasks::CreateTaskInput;
        use crate::data::types::Scope;

        let (engine, _) = engine().await;
        let (ann, bob, ws, list_id) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let ann = make_user(&mut conn, "ann@example.com").await;
            let bob = make_user(&mut conn, "bob@example.com").await;
            let ws = team(&mut conn, &[ann]).await;
            let list_id = list(&mut conn, Scope::Workspace(ws), ann).await;
            (ann, bob, ws, list_id)
        };

        let task = engine
            .create_task(
                ann,
                CreateTaskInput {
                    task_list_id: list_id,
                    title: "Ship it".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let page = engine
            .list_activity(ann, Some(ws), None, None, None)
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.logs[0].action, "task_created");
        assert_eq!(page.page_size, 25);

        let by_task = engine
            .list_activity(ann, None, Some(task.task.id), None, None)
            .await
            .unwrap();
        assert_eq!(by_task.logs.len(), 1);

        let own = engine.list_activity(bob, None, None, None, None).await.unwrap();
        assert_eq!(own.total_count, 0);

        assert!(matches!(
            engine.list_activity(bob, Some(ws), None, None, None).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            engine.list_activity(bob, None, Some(task.task.id), None, None).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
