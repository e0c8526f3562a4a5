//! Task mutations
//!
//! `is_active` is a one-way latch outside of undo. A PUT with
//! `is_active = false` soft-deletes only that task, while `delete_task`
//! cascades to every descendant.

use serde_json::json;
use sqlx::SqliteConnection;

use crate::data::sqlite::repositories::task::{self, NewTask, TaskPatch};
use crate::data::sqlite::repositories::{assignment, tag};
use crate::data::types::{Scope, TaskPriority, TaskStatus, UserRef};
use crate::utils::time::now_secs;

use super::access::{TaskAccess, load_accessible_list, resolve_task_access};
use super::activity::ActivityEvent;
use super::assignments::{add_assignees, remove_assignee, replace_assignees};
use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};
use super::events::ChangeEvent;
use super::hierarchy::TaskForest;
use super::query::{TaskDetail, load_detail};
use super::tags::{TagRef, attach_tags, replace_tags, resolve_tag};
use super::undo::{UndoSnapshot, capture};

/// Fields for a new task
#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    pub task_list_id: i64,
    pub parent_task_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub is_completed: Option<bool>,
    pub due_datetime: Option<i64>,
    pub recurrence_rule: Option<String>,
    pub recurrence_end_date: Option<i64>,
    pub position_order: Option<i64>,
    pub tags: Vec<TagRef>,
    pub assigned_user_ids: Vec<i64>,
}

/// Partial update with optional full-replace of tags and assignees
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub patch: TaskPatch,
    pub tags: Option<Vec<TagRef>>,
    pub assigned_user_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub task: TaskDetail,
    /// Set when the update soft-deleted the task
    pub undo_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub undo_id: i64,
    pub deleted_count: u64,
}

/// Same change applied to many tasks
#[derive(Debug, Clone, Default)]
pub struct BulkUpdateInput {
    pub task_ids: Vec<i64>,
    pub status: Option<TaskStatus>,
    pub is_completed: Option<bool>,
    pub is_active: Option<bool>,
    pub add_tag_ids: Vec<i64>,
    pub remove_tag_ids: Vec<i64>,
    pub assign_user_ids: Vec<i64>,
    pub unassign_user_ids: Vec<i64>,
}

impl BulkUpdateInput {
    fn has_changes(&self) -> bool {
        self.status.is_some()
            || self.is_completed.is_some()
            || self.is_active.is_some()
            || !self.add_tag_ids.is_empty()
            || !self.remove_tag_ids.is_empty()
            || !self.assign_user_ids.is_empty()
            || !self.unassign_user_ids.is_empty()
    }
}

fn clean_title(raw: &str) -> DomainResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    Ok(title.to_string())
}

/// A status change without an explicit `is_completed` keeps the pair in step
fn sync_completion(patch: &mut TaskPatch) {
    if let Some(status) = patch.status
        && patch.is_completed.is_none()
    {
        patch.is_completed = Some(status == TaskStatus::Completed);
    }
}

/// Parent must be an active task of the same list
async fn check_parent(
    conn: &mut SqliteConnection,
    task_list_id: i64,
    parent_task_id: i64,
) -> DomainResult<()> {
    let parent = task::get_task(conn, parent_task_id).await?;
    match parent {
        Some(p) if p.is_active && p.task_list_id == task_list_id => Ok(()),
        _ => Err(DomainError::validation(
            "parent_task_id must reference an active task in the same list",
        )),
    }
}

fn task_payload(detail: &TaskDetail) -> serde_json::Value {
    json!({
        "task_id": detail.task.id,
        "task_list_id": detail.task.task_list_id,
        "title": detail.task.title,
        "status": detail.task.status,
        "priority": detail.task.priority,
        "is_completed": detail.task.is_completed,
        "is_active": detail.task.is_active,
        "assigned_user_ids": detail.assignee_ids(),
    })
}

impl TaskEngine {
    pub async fn create_task(
        &self,
        user_id: i64,
        input: CreateTaskInput,
    ) -> DomainResult<TaskDetail> {
        let title = clean_title(&input.title)?;
        let now = now_secs();

        let mut tx = self.pool.begin().await?;
        let (_, scope) = load_accessible_list(&mut tx, user_id, input.task_list_id).await?;
        if let Some(parent) = input.parent_task_id {
            check_parent(&mut tx, input.task_list_id, parent).await?;
        }

        let status = input.status.unwrap_or_default();
        let new = NewTask {
            task_list_id: input.task_list_id,
            parent_task_id: input.parent_task_id,
            title,
            description: input.description,
            priority: input.priority.unwrap_or_default(),
            status,
            is_completed: input
                .is_completed
                .unwrap_or(status == TaskStatus::Completed),
            due_datetime: input.due_datetime,
            recurrence_rule: input.recurrence_rule,
            recurrence_end_date: input.recurrence_end_date,
            position_order: input.position_order.unwrap_or(0),
            created_by_user_id: user_id,
        };
        let row = task::insert_task(&mut tx, &new, now).await?;
        attach_tags(&mut tx, row.id, scope, &input.tags, now).await?;
        replace_assignees(&mut tx, &row, scope, &input.assigned_user_ids, now).await?;
        let detail = load_detail(&mut tx, row).await?;
        tx.commit().await?;

        tracing::debug!(task_id = detail.task.id, user_id, "Task created");
        self.activity
            .record(
                ActivityEvent::new(user_id, "task_created")
                    .workspace(scope.workspace_id())
                    .task(detail.task.id)
                    .details(json!({"title": detail.task.title})),
            )
            .await;
        self.broadcaster
            .emit(
                ChangeEvent::TaskCreated {
                    workspace_id: scope.workspace_id(),
                    user_ids: detail.assignee_ids(),
                },
                task_payload(&detail),
            )
            .await;
        Ok(detail)
    }

    pub async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        input: UpdateTaskInput,
    ) -> DomainResult<UpdateOutcome> {
        let UpdateTaskInput {
            mut patch,
            tags,
            assigned_user_ids,
        } = input;
        if patch.is_empty() && tags.is_none() && assigned_user_ids.is_none() {
            return Err(DomainError::validation("No valid fields to update"));
        }
        if let Some(title) = &patch.title {
            patch.title = Some(clean_title(title)?);
        }
        sync_completion(&mut patch);
        let now = now_secs();

        let mut tx = self.pool.begin().await?;
        let TaskAccess { task: before, scope } =
            resolve_task_access(&mut tx, user_id, task_id).await?;

        if let Some(Some(parent)) = patch.parent_task_id {
            check_parent(&mut tx, before.task_list_id, parent).await?;
            let edges = task::edges_for_list(&mut tx, before.task_list_id).await?;
            if TaskForest::from_edges(&edges).is_in_subtree(task_id, parent)? {
                return Err(DomainError::validation(
                    "A task cannot be moved under itself or its descendants",
                ));
            }
        }

        let deactivating = patch.is_active == Some(false);
        let undo_id = if deactivating {
            Some(capture(&mut tx, user_id, "delete", &UndoSnapshot::Task(before.clone()), now).await?)
        } else {
            None
        };

        let row = task::update_task(&mut tx, task_id, &patch, now)
            .await?
            .ok_or_else(|| DomainError::not_found("Task not found or access denied"))?;
        if let Some(tags) = &tags {
            replace_tags(&mut tx, task_id, scope, tags, now).await?;
        }
        if let Some(requested) = &assigned_user_ids {
            replace_assignees(&mut tx, &row, scope, requested, now).await?;
        }
        let detail = load_detail(&mut tx, row).await?;
        tx.commit().await?;

        tracing::debug!(task_id, user_id, deactivating, "Task updated");
        self.after_task_update(user_id, scope, &detail, assigned_user_ids.is_some())
            .await;
        Ok(UpdateOutcome {
            task: detail,
            undo_id,
        })
    }

    /// Activity row plus events for one committed task update
    async fn after_task_update(
        &self,
        user_id: i64,
        scope: Scope,
        detail: &TaskDetail,
        assignees_changed: bool,
    ) {
        let workspace_id = scope.workspace_id();
        let action = if detail.task.is_active {
            "task_updated"
        } else {
            "task_deleted"
        };
        self.activity
            .record(
                ActivityEvent::new(user_id, action)
                    .workspace(workspace_id)
                    .task(detail.task.id),
            )
            .await;

        let payload = task_payload(detail);
        if !detail.task.is_active {
            self.broadcaster
                .emit(ChangeEvent::TaskDeleted { workspace_id }, payload)
                .await;
            return;
        }
        self.broadcaster
            .emit(
                ChangeEvent::TaskUpdated {
                    workspace_id,
                    assignee_ids: detail.assignee_ids(),
                },
                payload.clone(),
            )
            .await;
        if assignees_changed {
            self.broadcaster
                .emit(
                    ChangeEvent::TaskAssignmentChanged {
                        workspace_id,
                        assignee_ids: detail.assignee_ids(),
                    },
                    payload,
                )
                .await;
        }
    }

    /// Soft-delete a task and all of its descendants.
    ///
    /// Only the root's pre-image is kept for undo.
    pub async fn delete_task(&self, user_id: i64, task_id: i64) -> DomainResult<DeleteOutcome> {
        let now = now_secs();
        let mut tx = self.pool.begin().await?;
        let TaskAccess { task: root, scope } =
            resolve_task_access(&mut tx, user_id, task_id).await?;

        let edges = task::edges_for_list(&mut tx, root.task_list_id).await?;
        let ids = TaskForest::from_edges(&edges).subtree(task_id)?;
        let undo_id = capture(&mut tx, user_id, "delete", &UndoSnapshot::Task(root.clone()), now).await?;
        let deleted_count = task::deactivate_many(&mut tx, &ids, now).await?;
        tx.commit().await?;

        tracing::debug!(task_id, user_id, deleted_count, "Task deleted");
        let workspace_id = scope.workspace_id();
        self.activity
            .record(
                ActivityEvent::new(user_id, "task_deleted")
                    .workspace(workspace_id)
                    .task(task_id)
                    .details(json!({"title": root.title, "deleted_count": deleted_count})),
            )
            .await;
        self.broadcaster
            .emit(
                ChangeEvent::TaskDeleted { workspace_id },
                json!({
                    "task_id": task_id,
                    "task_list_id": root.task_list_id,
                    "deleted_count": deleted_count,
                }),
            )
            .await;
        Ok(DeleteOutcome {
            undo_id,
            deleted_count,
        })
    }

    /// Apply one change set to many tasks inside one transaction.
    ///
    /// Tasks the caller cannot reach are skipped. Any other failure rolls
    /// back the whole batch.
    pub async fn bulk_update(
        &self,
        user_id: i64,
        input: BulkUpdateInput,
    ) -> DomainResult<Vec<UpdateOutcome>> {
        if input.task_ids.is_empty() {
            return Err(DomainError::validation("task_ids must not be empty"));
        }
        if !input.has_changes() {
            return Err(DomainError::validation("No updates specified"));
        }
        let mut patch = TaskPatch {
            status: input.status,
            is_completed: input.is_completed,
            is_active: input.is_active,
            ..Default::default()
        };
        sync_completion(&mut patch);
        let now = now_secs();

        let mut seen = Vec::with_capacity(input.task_ids.len());
        let deactivating = patch.is_active == Some(false);
        let mut applied: Vec<(Scope, UpdateOutcome)> = Vec::new();
        let mut tx = self.pool.begin().await?;
        for &task_id in &input.task_ids {
            if seen.contains(&task_id) {
                continue;
            }
            seen.push(task_id);

            let access = match resolve_task_access(&mut tx, user_id, task_id).await {
                Ok(access) => access,
                Err(DomainError::NotFound(_) | DomainError::InvalidOwner(_)) => {
                    tracing::debug!(task_id, user_id, "Bulk update skipped task");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let scope = access.scope;
            // Each soft-deleted task gets its own undo entry, as with a single PUT
            let undo_id = if deactivating {
                Some(capture(&mut tx, user_id, "delete", &UndoSnapshot::Task(access.task), now).await?)
            } else {
                None
            };

            let row = task::update_task(&mut tx, task_id, &patch, now)
                .await?
                .ok_or_else(|| DomainError::not_found("Task not found or access denied"))?;
            for &tag_id in &input.add_tag_ids {
                if let Some(id) = resolve_tag(&mut tx, scope, &TagRef::Id(tag_id), now).await? {
                    tag::link(&mut tx, task_id, id).await?;
                }
            }
            for &tag_id in &input.remove_tag_ids {
                tag::unlink(&mut tx, task_id, tag_id).await?;
            }
            if !input.assign_user_ids.is_empty() {
                add_assignees(&mut tx, &row, scope, &input.assign_user_ids, now).await?;
            }
            for &unassign in &input.unassign_user_ids {
                if unassign != row.created_by_user_id {
                    assignment::delete_assignment(&mut tx, task_id, unassign).await?;
                }
            }
            let task = load_detail(&mut tx, row).await?;
            applied.push((scope, UpdateOutcome { task, undo_id }));
        }
        tx.commit().await?;

        tracing::debug!(
            user_id,
            requested = input.task_ids.len(),
            applied = applied.len(),
            deactivating,
            "Bulk update committed"
        );
        let assignees_changed =
            !input.assign_user_ids.is_empty() || !input.unassign_user_ids.is_empty();
        for (scope, outcome) in &applied {
            self.after_task_update(user_id, *scope, &outcome.task, assignees_changed)
                .await;
        }
        Ok(applied.into_iter().map(|(_, o)| o).collect())
    }

    // ------------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------------

    pub async fn list_assignees(&self, user_id: i64, task_id: i64) -> DomainResult<Vec<UserRef>> {
        Ok(self.get_task(user_id, task_id).await?.assigned_users)
    }

    /// Additive assignment. Users without access to the list are skipped.
    pub async fn assign_users(
        &self,
        user_id: i64,
        task_id: i64,
        user_ids: &[i64],
    ) -> DomainResult<TaskDetail> {
        let now = now_secs();
        let mut tx = self.pool.begin().await?;
        let TaskAccess { task: row, scope } =
            resolve_task_access(&mut tx, user_id, task_id).await?;
        let added = add_assignees(&mut tx, &row, scope, user_ids, now).await?;
        let detail = load_detail(&mut tx, row).await?;
        tx.commit().await?;

        if !added.is_empty() {
            self.emit_assignment_changed(scope, &detail).await;
        }
        Ok(detail)
    }

    pub async fn unassign_user(
        &self,
        user_id: i64,
        task_id: i64,
        assignee_id: i64,
    ) -> DomainResult<TaskDetail> {
        let mut tx = self.pool.begin().await?;
        let TaskAccess { task: row, scope } =
            resolve_task_access(&mut tx, user_id, task_id).await?;
        remove_assignee(&mut tx, &row, assignee_id).await?;
        let detail = load_detail(&mut tx, row).await?;
        tx.commit().await?;

        self.emit_assignment_changed(scope, &detail).await;
        Ok(detail)
    }

    async fn emit_assignment_changed(&self, scope: Scope, detail: &TaskDetail) {
        self.broadcaster
            .emit(
                ChangeEvent::TaskAssignmentChanged {
                    workspace_id: scope.workspace_id(),
                    assignee_ids: detail.assignee_ids(),
                },
                task_payload(detail),
            )
            .await;
    }

    // ------------------------------------------------------------------------
    // Task tags
    // ------------------------------------------------------------------------

    /// Attach one tag by id or name. A reference outside the list's scope is rejected.
    pub async fn attach_tag(
        &self,
        user_id: i64,
        task_id: i64,
        item: TagRef,
    ) -> DomainResult<TaskDetail> {
        let now = now_secs();
        let mut tx = self.pool.begin().await?;
        let TaskAccess { task: row, scope } =
            resolve_task_access(&mut tx, user_id, task_id).await?;
        let attached = attach_tags(&mut tx, task_id, scope, std::slice::from_ref(&item), now).await?;
        if attached.is_empty() {
            return Err(DomainError::validation("Tag not available for this list"));
        }
        let detail = load_detail(&mut tx, row).await?;
        tx.commit().await?;

        self.broadcast_task_updated(scope, &detail).await;
        Ok(detail)
    }

    pub async fn detach_tag(
        &self,
        user_id: i64,
        task_id: i64,
        tag_id: i64,
    ) -> DomainResult<TaskDetail> {
        let mut tx = self.pool.begin().await?;
        let TaskAccess { task: row, scope } =
            resolve_task_access(&mut tx, user_id, task_id).await?;
        if !tag::unlink(&mut tx, task_id, tag_id).await? {
            return Err(DomainError::not_found("Tag is not attached to this task"));
        }
        let detail = load_detail(&mut tx, row).await?;
        tx.commit().await?;

        self.broadcast_task_updated(scope, &detail).await;
        Ok(detail)
    }

    async fn broadcast_task_updated(&self, scope: Scope, detail: &TaskDetail) {
        self.broadcaster
            .emit(
                ChangeEvent::TaskUpdated {
                    workspace_id: scope.workspace_id(),
                    assignee_ids: detail.assignee_ids(),
                },
                task_payload(detail),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{SortOrder, TaskFilter, TaskSortBy};
    use crate::domain::access::tests::{list, team, user};
    use crate::domain::engine::testing::engine;
    use crate::domain::query::TaskQuery;

    fn create(list_id: i64, title: &str) -> CreateTaskInput {
        CreateTaskInput {
            task_list_id: list_id,
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_tags_and_creator_assigned() {
        let (engine, recorder) = engine().await;
        let (alice, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            (alice, list(&mut conn, Scope::User(alice), alice).await)
        };

        let mut input = create(l, "  Buy milk ");
        input.tags = vec![TagRef::Name("urgent".into())];
        let detail = engine.create_task(alice, input).await.unwrap();
        assert_eq!(detail.task.title, "Buy milk");
        assert_eq!(detail.task.priority, TaskPriority::Medium);
        assert_eq!(detail.task.status, TaskStatus::Pending);
        assert!(!detail.task.is_completed);
        assert_eq!(detail.tags.len(), 1);
        assert_eq!(detail.tags[0].tag_name, "urgent");
        assert_eq!(detail.assignee_ids(), vec![alice]);
        assert_eq!(
            recorder.routes(),
            vec![(format!("user:{alice}"), "task_created".to_string())]
        );

        let page = engine
            .list_tasks(
                alice,
                TaskQuery {
                    task_list_id: l,
                    filter: TaskFilter {
                        statuses: vec![TaskStatus::Pending],
                        ..Default::default()
                    },
                    sort_by: TaskSortBy::Custom,
                    sort_order: SortOrder::Asc,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.tasks[0].tags[0].tag_name, "urgent");
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (engine, _) = engine().await;
        let (alice, bob, l, other) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let bob = user(&mut conn, "b@example.com").await;
            let l = list(&mut conn, Scope::User(alice), alice).await;
            let other = list(&mut conn, Scope::User(alice), alice).await;
            (alice, bob, l, other)
        };

        assert!(matches!(
            engine.create_task(alice, create(l, "   ")).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            engine.create_task(bob, create(l, "x")).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            engine.create_task(alice, create(999, "x")).await,
            Err(DomainError::NotFound(_))
        ));

        let foreign_parent = engine.create_task(alice, create(other, "p")).await.unwrap();
        let mut input = create(l, "child");
        input.parent_task_id = Some(foreign_parent.task.id);
        assert!(matches!(
            engine.create_task(alice, input).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_undo_restores_root_only() {
        let (engine, _) = engine().await;
        let (alice, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            (alice, list(&mut conn, Scope::User(alice), alice).await)
        };

        let root = engine.create_task(alice, create(l, "root")).await.unwrap();
        let mut child = create(l, "child");
        child.parent_task_id = Some(root.task.id);
        let child = engine.create_task(alice, child).await.unwrap();
        let mut grandchild = create(l, "grandchild");
        grandchild.parent_task_id = Some(child.task.id);
        engine.create_task(alice, grandchild).await.unwrap();

        let outcome = engine.delete_task(alice, root.task.id).await.unwrap();
        assert_eq!(outcome.deleted_count, 3);

        let page = engine
            .list_tasks(
                alice,
                TaskQuery {
                    task_list_id: l,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);

        let mut conn = engine.pool().acquire().await.unwrap();
        let entry = crate::data::sqlite::repositories::undo::get_entry(&mut conn, outcome.undo_id)
            .await
            .unwrap()
            .unwrap();
        let snapshot: UndoSnapshot = serde_json::from_str(&entry.data_snapshot).unwrap();
        assert_eq!(snapshot, UndoSnapshot::Task(root.task.clone()));
        drop(conn);

        engine.restore(alice, outcome.undo_id).await.unwrap();
        let page = engine
            .list_tasks(
                alice,
                TaskQuery {
                    task_list_id: l,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert!(page.tasks[0].task.is_active);
    }

    #[tokio::test]
    async fn test_update_deactivate_does_not_cascade() {
        let (engine, recorder) = engine().await;
        let (alice, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            (alice, list(&mut conn, Scope::User(alice), alice).await)
        };
        let root = engine.create_task(alice, create(l, "root")).await.unwrap();
        let mut child = create(l, "child");
        child.parent_task_id = Some(root.task.id);
        let child = engine.create_task(alice, child).await.unwrap();
        recorder.clear();

        let outcome = engine
            .update_task(
                alice,
                root.task.id,
                UpdateTaskInput {
                    patch: TaskPatch {
                        is_active: Some(false),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(outcome.undo_id.is_some());
        assert!(!outcome.task.task.is_active);
        assert!(engine.get_task(alice, child.task.id).await.unwrap().task.is_active);
        // Personal list: task_deleted has no workspace topic to go to
        assert!(recorder.routes().is_empty());
    }

    #[tokio::test]
    async fn test_update_fields_and_status_sync() {
        let (engine, _) = engine().await;
        let (alice, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            (alice, list(&mut conn, Scope::User(alice), alice).await)
        };
        let t = engine.create_task(alice, create(l, "t")).await.unwrap();

        let outcome = engine
            .update_task(
                alice,
                t.task.id,
                UpdateTaskInput {
                    patch: TaskPatch {
                        status: Some(TaskStatus::Completed),
                        priority: Some(TaskPriority::High),
                        ..Default::default()
                    },
                    tags: Some(vec![TagRef::Name("a".into()), TagRef::Name("b".into())]),
                    assigned_user_ids: Some(vec![]),
                },
            )
            .await
            .unwrap();
        assert!(outcome.undo_id.is_none());
        assert!(outcome.task.task.is_completed);
        assert_eq!(outcome.task.task.priority, TaskPriority::High);
        assert_eq!(outcome.task.tags.len(), 2);
        assert_eq!(outcome.task.assignee_ids(), vec![alice]);

        assert!(matches!(
            engine
                .update_task(alice, t.task.id, UpdateTaskInput::default())
                .await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_reparent_under_descendant_rejected() {
        let (engine, _) = engine().await;
        let (alice, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            (alice, list(&mut conn, Scope::User(alice), alice).await)
        };
        let root = engine.create_task(alice, create(l, "root")).await.unwrap();
        let mut child = create(l, "child");
        child.parent_task_id = Some(root.task.id);
        let child = engine.create_task(alice, child).await.unwrap();

        let result = engine
            .update_task(
                alice,
                root.task.id,
                UpdateTaskInput {
                    patch: TaskPatch {
                        parent_task_id: Some(Some(child.task.id)),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bulk_update_skips_inaccessible() {
        let (engine, recorder) = engine().await;
        let (alice, bob, ws, l, bobs) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let bob = user(&mut conn, "b@example.com").await;
            let ws = team(&mut conn, &[alice, bob]).await;
            let l = list(&mut conn, Scope::Workspace(ws), alice).await;
            let bobs = list(&mut conn, Scope::User(bob), bob).await;
            (alice, bob, ws, l, bobs)
        };
        let a = engine.create_task(alice, create(l, "a")).await.unwrap();
        let b = engine.create_task(alice, create(l, "b")).await.unwrap();
        let hidden = engine.create_task(bob, create(bobs, "hidden")).await.unwrap();
        recorder.clear();

        let updated = engine
            .bulk_update(
                alice,
                BulkUpdateInput {
                    task_ids: vec![a.task.id, hidden.task.id, b.task.id, 9999],
                    status: Some(TaskStatus::InProgress),
                    assign_user_ids: vec![bob],
                    unassign_user_ids: vec![alice],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);
        for outcome in &updated {
            assert!(outcome.undo_id.is_none());
            let detail = &outcome.task;
            assert_eq!(detail.task.status, TaskStatus::InProgress);
            assert!(!detail.task.is_completed);
            assert_eq!(detail.assignee_ids(), vec![alice, bob]);
        }
        let hidden_now = engine.get_task(bob, hidden.task.id).await.unwrap();
        assert_eq!(hidden_now.task.status, TaskStatus::Pending);

        let routes = recorder.routes();
        assert!(routes.contains(&(format!("workspace:{ws}"), "task_updated".to_string())));
        assert!(routes.contains(&(format!("user:{bob}"), "task_assignment_changed".to_string())));

        assert!(matches!(
            engine
                .bulk_update(
                    alice,
                    BulkUpdateInput {
                        task_ids: vec![a.task.id],
                        ..Default::default()
                    }
                )
                .await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_deactivate_captures_undo_per_task() {
        let (engine, _) = engine().await;
        let (alice, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            (alice, list(&mut conn, Scope::User(alice), alice).await)
        };
        let a = engine.create_task(alice, create(l, "a")).await.unwrap();
        let b = engine.create_task(alice, create(l, "b")).await.unwrap();

        let outcomes = engine
            .bulk_update(
                alice,
                BulkUpdateInput {
                    task_ids: vec![a.task.id, b.task.id],
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        let undo_ids: Vec<i64> = outcomes.iter().filter_map(|o| o.undo_id).collect();
        assert_eq!(undo_ids.len(), 2);
        assert_ne!(undo_ids[0], undo_ids[1]);
        assert!(outcomes.iter().all(|o| !o.task.task.is_active));

        let mut conn = engine.pool().acquire().await.unwrap();
        let entry = crate::data::sqlite::repositories::undo::get_entry(&mut conn, undo_ids[0])
            .await
            .unwrap()
            .unwrap();
        let snapshot: UndoSnapshot = serde_json::from_str(&entry.data_snapshot).unwrap();
        assert_eq!(snapshot, UndoSnapshot::Task(a.task.clone()));
        drop(conn);

        engine.restore(alice, undo_ids[1]).await.unwrap();
        let page = engine
            .list_tasks(
                alice,
                TaskQuery {
                    task_list_id: l,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.tasks[0].task.id, b.task.id);
    }

    #[tokio::test]
    async fn test_assignment_endpoints() {
        let (engine, _) = engine().await;
        let (alice, bob, outsider, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let bob = user(&mut conn, "b@example.com").await;
            let outsider = user(&mut conn, "c@example.com").await;
            let ws = team(&mut conn, &[alice, bob]).await;
            (alice, bob, outsider, list(&mut conn, Scope::Workspace(ws), alice).await)
        };
        let t = engine.create_task(alice, create(l, "t")).await.unwrap();

        let detail = engine
            .assign_users(alice, t.task.id, &[bob, outsider])
            .await
            .unwrap();
        assert_eq!(detail.assignee_ids(), vec![alice, bob]);

        assert!(matches!(
            engine.unassign_user(alice, t.task.id, alice).await,
            Err(DomainError::Validation(_))
        ));
        engine.unassign_user(alice, t.task.id, bob).await.unwrap();
        assert!(matches!(
            engine.unassign_user(alice, t.task.id, bob).await,
            Err(DomainError::NotFound(_))
        ));
        let users = engine.list_assignees(bob, t.task.id).await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(matches!(
            engine.list_assignees(outsider, t.task.id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_attach_and_detach_tag() {
        let (engine, _) = engine().await;
        let (alice, ws, personal) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let ws = team(&mut conn, &[alice]).await;
            (alice, ws, list(&mut conn, Scope::User(alice), alice).await)
        };
        let ws_tag = engine
            .create_tag(
                alice,
                crate::domain::tags::NewTagInput {
                    tag_name: "team".into(),
                    workspace_id: Some(ws),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let t = engine.create_task(alice, create(personal, "t")).await.unwrap();

        assert!(matches!(
            engine.attach_tag(alice, t.task.id, TagRef::Id(ws_tag.id)).await,
            Err(DomainError::Validation(_))
        ));
        let detail = engine
            .attach_tag(alice, t.task.id, TagRef::Name("mine".into()))
            .await
            .unwrap();
        let tag_id = detail.tags[0].tag_id;
        let again = engine
            .attach_tag(alice, t.task.id, TagRef::Id(tag_id))
            .await
            .unwrap();
        assert_eq!(again.tags.len(), 1);

        engine.detach_tag(alice, t.task.id, tag_id).await.unwrap();
        assert!(matches!(
            engine.detach_tag(alice, t.task.id, tag_id).await,
            Err(DomainError::NotFound(_))
        ));
    }
}
