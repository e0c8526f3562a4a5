//! Threaded task comments

use serde_json::json;

use crate::core::constants::COMMENT_EDIT_WINDOW_SECS;
use crate::data::sqlite::repositories::{comment, user};
use crate::data::types::{CommentRow, CommentWithAuthorRow, Scope, UserRef};
use crate::utils::time::now_secs;

use super::access::resolve_task_access;
use super::activity::ActivityEvent;
use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};
use super::events::ChangeEvent;
use super::undo::{UndoSnapshot, capture};

/// A comment with its author
#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub comment: CommentRow,
    pub author: UserRef,
}

impl From<CommentWithAuthorRow> for CommentView {
    fn from(row: CommentWithAuthorRow) -> Self {
        Self {
            author: UserRef {
                user_id: row.comment.user_id,
                email: row.email,
                full_name: row.full_name,
            },
            comment: row.comment,
        }
    }
}

fn clean_content(raw: &str) -> DomainResult<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(DomainError::validation("content must not be empty"));
    }
    Ok(content.to_string())
}

fn comment_payload(view: &CommentView) -> serde_json::Value {
    json!({
        "comment_id": view.comment.id,
        "task_id": view.comment.task_id,
        "user_id": view.comment.user_id,
        "parent_comment_id": view.comment.parent_comment_id,
        "content": view.comment.content,
    })
}

impl TaskEngine {
    pub async fn list_comments(&self, user_id: i64, task_id: i64) -> DomainResult<Vec<CommentView>> {
        let mut conn = self.pool.acquire().await?;
        resolve_task_access(&mut conn, user_id, task_id).await?;
        let rows = comment::list_for_task(&mut conn, task_id).await?;
        Ok(rows.into_iter().map(CommentView::from).collect())
    }

    pub async fn add_comment(
        &self,
        user_id: i64,
        task_id: i64,
        content: &str,
        parent_comment_id: Option<i64>,
    ) -> DomainResult<CommentView> {
        let content = clean_content(content)?;
        let mut tx = self.pool.begin().await?;
        let access = resolve_task_access(&mut tx, user_id, task_id).await?;
        if let Some(parent) = parent_comment_id {
            let ok = comment::get_comment(&mut tx, parent)
                .await?
                .is_some_and(|p| !p.is_deleted && p.task_id == task_id);
            if !ok {
                return Err(DomainError::validation(
                    "parent_comment_id must reference a comment on the same task",
                ));
            }
        }
        let author = user::get_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("User not found".into()))?;
        let row =
            comment::insert_comment(&mut tx, task_id, user_id, parent_comment_id, &content, now_secs())
                .await?;
        tx.commit().await?;

        let view = CommentView {
            comment: row,
            author: UserRef {
                user_id,
                email: author.email,
                full_name: author.full_name,
            },
        };
        let workspace_id = access.workspace_id();
        self.activity
            .record(
                ActivityEvent::new(user_id, "comment_added")
                    .workspace(workspace_id)
                    .task(task_id)
                    .details(json!({"comment_id": view.comment.id})),
            )
            .await;
        self.broadcaster
            .emit(
                ChangeEvent::CommentAdded {
                    workspace_id,
                    author_id: user_id,
                },
                comment_payload(&view),
            )
            .await;
        Ok(view)
    }

    /// Load a live comment whose task the caller can reach, plus the task's scope
    async fn accessible_comment(
        &self,
        conn: &mut sqlx::SqliteConnection,
        user_id: i64,
        comment_id: i64,
    ) -> DomainResult<(CommentRow, Scope)> {
        let row = comment::get_comment(conn, comment_id)
            .await?
            .filter(|c| !c.is_deleted)
            .ok_or_else(|| DomainError::not_found("Comment not found"))?;
        let access = resolve_task_access(conn, user_id, row.task_id).await?;
        if row.user_id != user_id {
            return Err(DomainError::forbidden("Only the author can change this comment"));
        }
        Ok((row, access.scope))
    }

    pub async fn update_comment(
        &self,
        user_id: i64,
        comment_id: i64,
        content: &str,
    ) -> DomainResult<CommentView> {
        self.update_comment_at(user_id, comment_id, content, now_secs())
            .await
    }

    /// Edit as of `now`; only within the edit window
    pub async fn update_comment_at(
        &self,
        user_id: i64,
        comment_id: i64,
        content: &str,
        now: i64,
    ) -> DomainResult<CommentView> {
        let content = clean_content(content)?;
        let mut tx = self.pool.begin().await?;
        let (row, scope) = self.accessible_comment(&mut tx, user_id, comment_id).await?;
        if now - row.created_at > COMMENT_EDIT_WINDOW_SECS {
            return Err(DomainError::validation(
                "Comments can only be edited within 15 minutes of posting",
            ));
        }
        let updated = comment::update_content(&mut tx, comment_id, &content, now)
            .await?
            .ok_or_else(|| DomainError::not_found("Comment not found"))?;
        let author = user::get_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("User not found".into()))?;
        tx.commit().await?;

        let view = CommentView {
            comment: updated,
            author: UserRef {
                user_id,
                email: author.email,
                full_name: author.full_name,
            },
        };
        self.broadcaster
            .emit(
                ChangeEvent::CommentUpdated {
                    workspace_id: scope.workspace_id(),
                    author_id: user_id,
                },
                comment_payload(&view),
            )
            .await;
        Ok(view)
    }

    /// Mark a comment deleted. Returns the undo id.
    pub async fn delete_comment(&self, user_id: i64, comment_id: i64) -> DomainResult<i64> {
        let now = now_secs();
        let mut tx = self.pool.begin().await?;
        let (row, scope) = self.accessible_comment(&mut tx, user_id, comment_id).await?;
        let task_id = row.task_id;
        let undo_id = capture(&mut tx, user_id, "delete", &UndoSnapshot::Comment(row), now).await?;
        comment::mark_deleted(&mut tx, comment_id, now).await?;
        tx.commit().await?;

        self.broadcaster
            .emit(
                ChangeEvent::CommentDeleted {
                    workspace_id: scope.workspace_id(),
                },
                json!({"comment_id": comment_id, "task_id": task_id}),
            )
            .await;
        Ok(undo_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::tests::{list, team, user};
    use crate::domain::engine::testing::engine;
    use crate::domain::events::testing::RecordingPublisher;
    use crate::domain::tasks::CreateTaskInput;
    use std::sync::Arc;

    async fn setup() -> (TaskEngine, Arc<RecordingPublisher>, i64, i64, i64, i64) {
        let (engine, recorder) = engine().await;
        let (alice, bob, ws, l) = {
            let mut conn = engine.pool().acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let bob = user(&mut conn, "b@example.com").await;
            let ws = team(&mut conn, &[alice, bob]).await;
            (alice, bob, ws, list(&mut conn, Scope::Workspace(ws), alice).await)
        };
        let task = engine
            .create_task(
                alice,
                CreateTaskInput {
                    task_list_id: l,
                    title: "t".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        recorder.clear();
        (engine, recorder, alice, bob, ws, task.task.id)
    }

    #[tokio::test]
    async fn test_thread_and_routing() {
        let (engine, recorder, alice, bob, ws, task_id) = setup().await;

        let root = engine.add_comment(alice, task_id, "hello", None).await.unwrap();
        assert_eq!(root.author.email, "a@example.com");
        let reply = engine
            .add_comment(bob, task_id, "hi back", Some(root.comment.id))
            .await
            .unwrap();
        assert_eq!(reply.comment.parent_comment_id, Some(root.comment.id));
        assert!(matches!(
            engine.add_comment(bob, task_id, "x", Some(9999)).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            engine.add_comment(bob, task_id, "   ", None).await,
            Err(DomainError::Validation(_))
        ));

        assert_eq!(
            recorder.routes()[..2],
            [
                (format!("workspace:{ws}"), "comment_added".to_string()),
                (format!("user:{alice}"), "comment_added".to_string()),
            ]
        );
        assert_eq!(engine.list_comments(bob, task_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_edit_rules() {
        let (engine, _, alice, bob, _, task_id) = setup().await;
        let c = engine.add_comment(alice, task_id, "draft", None).await.unwrap();
        let created = c.comment.created_at;

        assert!(matches!(
            engine.update_comment_at(bob, c.comment.id, "hijack", created).await,
            Err(DomainError::Forbidden(_))
        ));
        let edited = engine
            .update_comment_at(alice, c.comment.id, "final", created + 899)
            .await
            .unwrap();
        assert_eq!(edited.comment.content, "final");
        assert!(matches!(
            engine
                .update_comment_at(alice, c.comment.id, "late", created + 901)
                .await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_author_only_and_undoable() {
        let (engine, _, alice, bob, _, task_id) = setup().await;
        let c = engine.add_comment(alice, task_id, "oops", None).await.unwrap();

        assert!(matches!(
            engine.delete_comment(bob, c.comment.id).await,
            Err(DomainError::Forbidden(_))
        ));
        let undo_id = engine.delete_comment(alice, c.comment.id).await.unwrap();
        assert!(engine.list_comments(alice, task_id).await.unwrap().is_empty());

        engine.restore(alice, undo_id).await.unwrap();
        assert_eq!(engine.list_comments(alice, task_id).await.unwrap().len(), 1);
    }
}
