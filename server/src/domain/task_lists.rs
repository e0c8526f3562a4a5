//! Task list management

use serde_json::json;

use crate::data::sqlite::repositories::task_list::{self, NewTaskList, TaskListPatch};
use crate::data::sqlite::repositories::{task, workspace};
use crate::data::types::TaskListSummaryRow;
use crate::utils::time::now_secs;

use super::access::load_accessible_list;
use super::activity::ActivityEvent;
use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};
use super::tags::{ensure_scope_writable, scope_from_request};
use super::undo::{UndoSnapshot, capture};

/// Fields for a new list
#[derive(Debug, Clone, Default)]
pub struct CreateTaskListInput {
    pub name: String,
    pub description: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
    pub position_order: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct TaskListUpdateOutcome {
    pub list: TaskListSummaryRow,
    pub undo_id: Option<i64>,
}

fn clean_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name must not be empty"));
    }
    Ok(name.to_string())
}

impl TaskEngine {
    /// Lists of one workspace, or every list the caller can see
    pub async fn list_task_lists(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> DomainResult<Vec<TaskListSummaryRow>> {
        let mut conn = self.pool.acquire().await?;
        match workspace_id {
            Some(ws) => {
                if !workspace::is_active_member(&mut conn, user_id, ws).await? {
                    return Err(DomainError::forbidden("Not a member of this workspace"));
                }
                Ok(task_list::list_summaries_for_workspace(&mut conn, ws).await?)
            }
            None => Ok(task_list::list_summaries_for_user(&mut conn, user_id).await?),
        }
    }

    pub async fn get_task_list(
        &self,
        user_id: i64,
        list_id: i64,
    ) -> DomainResult<TaskListSummaryRow> {
        let mut conn = self.pool.acquire().await?;
        let (list, _) = load_accessible_list(&mut conn, user_id, list_id).await?;
        let incomplete_task_count = task::count_incomplete(&mut conn, list_id).await?;
        Ok(TaskListSummaryRow {
            list,
            incomplete_task_count,
        })
    }

    pub async fn create_task_list(
        &self,
        user_id: i64,
        input: CreateTaskListInput,
    ) -> DomainResult<TaskListSummaryRow> {
        let scope = scope_from_request(input.workspace_id, input.user_id, "Task list")?;
        let name = clean_name(&input.name)?;

        let mut tx = self.pool.begin().await?;
        ensure_scope_writable(&mut tx, user_id, scope).await?;
        let list = task_list::insert_task_list(
            &mut tx,
            &NewTaskList {
                name: &name,
                description: input.description.as_deref(),
                scope,
                position_order: input.position_order.unwrap_or(0),
                created_by_user_id: user_id,
            },
            now_secs(),
        )
        .await?;
        tx.commit().await?;

        tracing::debug!(list_id = list.id, user_id, "Task list created");
        self.activity
            .record(
                ActivityEvent::new(user_id, "task_list_created")
                    .workspace(scope.workspace_id())
                    .details(json!({"task_list_id": list.id, "name": list.name})),
            )
            .await;
        Ok(TaskListSummaryRow {
            list,
            incomplete_task_count: 0,
        })
    }

    /// Patch a list. `is_active = false` soft-deletes it and returns an undo id.
    pub async fn update_task_list(
        &self,
        user_id: i64,
        list_id: i64,
        mut patch: TaskListPatch,
    ) -> DomainResult<TaskListUpdateOutcome> {
        if patch.is_empty() {
            return Err(DomainError::validation("No valid fields to update"));
        }
        if let Some(name) = &patch.name {
            patch.name = Some(clean_name(name)?);
        }
        let now = now_secs();

        let mut tx = self.pool.begin().await?;
        let (before, scope) = load_accessible_list(&mut tx, user_id, list_id).await?;
        let undo_id = if patch.is_active == Some(false) {
            Some(capture(&mut tx, user_id, "delete", &UndoSnapshot::TaskList(before), now).await?)
        } else {
            None
        };
        let list = task_list::update_task_list(&mut tx, list_id, &patch, now)
            .await?
            .ok_or_else(|| DomainError::not_found("Task list not found"))?;
        let incomplete_task_count = task::count_incomplete(&mut tx, list_id).await?;
        tx.commit().await?;

        let action = if undo_id.is_some() {
            "task_list_deleted"
        } else {
            "task_list_updated"
        };
        self.activity
            .record(
                ActivityEvent::new(user_id, action)
                    .workspace(scope.workspace_id())
                    .details(json!({"task_list_id": list_id})),
            )
            .await;
        Ok(TaskListUpdateOutcome {
            list: TaskListSummaryRow {
                list,
                incomplete_task_count,
            },
            undo_id,
        })
    }

    /// Soft-delete a list. Returns the undo id.
    pub async fn delete_task_list(&self, user_id: i64, list_id: i64) -> DomainResult<i64> {
        let outcome = self
            .update_task_list(
                user_id,
                list_id,
                TaskListPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        outcome
            .undo_id
            .ok_or_else(|| DomainError::Internal("list delete produced no undo entry".into()))
    }
}
