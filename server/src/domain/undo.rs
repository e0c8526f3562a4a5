//! Undo ledger
//!
//! Every destructive action stores the full pre-image of the row it touched.
//! An entry can be replayed once, by the user who created it, within
//! `UNDO_WINDOW_SECS`. Restores are typed per entity with explicit columns.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::core::constants::UNDO_WINDOW_SECS;
use crate::data::sqlite::repositories::{comment, tag, task, task_list, undo};
use crate::data::types::{CommentRow, TagRow, TaskListRow, TaskRow};
use crate::utils::time::now_secs;

use super::activity::ActivityEvent;
use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};
use super::events::ChangeEvent;

/// Pre-image of one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "row", rename_all = "snake_case")]
pub enum UndoSnapshot {
    Task(TaskRow),
    TaskList(TaskListRow),
    Tag(TagRow),
    Comment(CommentRow),
}

impl UndoSnapshot {
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::TaskList(_) => "task_list",
            Self::Tag(_) => "tag",
            Self::Comment(_) => "comment",
        }
    }

    pub fn entity_id(&self) -> i64 {
        match self {
            Self::Task(row) => row.id,
            Self::TaskList(row) => row.id,
            Self::Tag(row) => row.id,
            Self::Comment(row) => row.id,
        }
    }

    /// Insert the row if it is gone, otherwise overwrite every non-key column
    async fn restore(&self, conn: &mut SqliteConnection) -> DomainResult<()> {
        match self {
            // parent_task_id is kept even when the parent is still deleted; the
            // child lists as a root until the parent's own entry is replayed
            Self::Task(row) => task::upsert_task(conn, row).await?,
            Self::TaskList(row) => task_list::upsert_task_list(conn, row).await?,
            Self::Tag(row) => {
                ensure_tag_name_free(conn, row).await?;
                tag::upsert_tag(conn, row).await?
            }
            Self::Comment(row) => comment::upsert_comment(conn, row).await?,
        }
        Ok(())
    }
}

/// A tag deleted and then re-created under the same name blocks its own undo
async fn ensure_tag_name_free(conn: &mut SqliteConnection, row: &TagRow) -> DomainResult<()> {
    if !row.is_active {
        return Ok(());
    }
    let Some(scope) = row.scope() else {
        return Ok(());
    };
    if let Some(existing) = tag::find_active_by_name(conn, scope, &row.tag_name).await?
        && existing.id != row.id
    {
        return Err(DomainError::validation(format!(
            "Tag '{}' already exists in this scope; rename it before undoing",
            row.tag_name
        )));
    }
    Ok(())
}

/// Store a snapshot and return the new undo id.
///
/// Also drops the user's entries that can no longer be restored.
pub async fn capture(
    conn: &mut SqliteConnection,
    user_id: i64,
    operation: &str,
    snapshot: &UndoSnapshot,
    now: i64,
) -> DomainResult<i64> {
    let purged = undo::purge_expired(conn, user_id, now - UNDO_WINDOW_SECS).await?;
    if purged > 0 {
        tracing::debug!(user_id, purged, "Purged expired undo entries");
    }
    let data = serde_json::to_string(snapshot)?;
    let id = undo::insert_entry(
        conn,
        user_id,
        snapshot.entity_type(),
        snapshot.entity_id(),
        operation,
        &data,
        now,
    )
    .await?;
    Ok(id)
}

/// What an undo brought back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoOutcome {
    pub undo_id: i64,
    pub entity_type: String,
    pub entity_id: i64,
}

impl TaskEngine {
    pub async fn restore(&self, user_id: i64, undo_id: i64) -> DomainResult<UndoOutcome> {
        self.restore_at(user_id, undo_id, now_secs()).await
    }

    /// Replay an undo entry as of `now`
    pub async fn restore_at(
        &self,
        user_id: i64,
        undo_id: i64,
        now: i64,
    ) -> DomainResult<UndoOutcome> {
        let mut tx = self.pool.begin().await?;

        let entry = undo::get_entry(&mut tx, undo_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Undo entry not found"))?;
        if entry.user_id != user_id {
            return Err(DomainError::forbidden("Undo entry belongs to another user"));
        }
        if now - entry.created_at > UNDO_WINDOW_SECS {
            // Rejected entries are consumed as well
            undo::delete_entry(&mut tx, undo_id).await?;
            tx.commit().await?;
            return Err(DomainError::Expired(format!(
                "Undo window of {UNDO_WINDOW_SECS} seconds has expired"
            )));
        }

        let snapshot: UndoSnapshot = serde_json::from_str(&entry.data_snapshot)?;
        snapshot.restore(&mut tx).await?;
        undo::delete_entry(&mut tx, undo_id).await?;
        tx.commit().await?;

        let outcome = UndoOutcome {
            undo_id,
            entity_type: snapshot.entity_type().to_string(),
            entity_id: snapshot.entity_id(),
        };
        tracing::debug!(
            user_id,
            undo_id,
            entity_type = %outcome.entity_type,
            entity_id = outcome.entity_id,
            "Undo applied"
        );

        let payload = serde_json::json!({
            "undo_id": undo_id,
            "entity_type": outcome.entity_type,
            "entity_id": outcome.entity_id,
        });
        let task_id = match &snapshot {
            UndoSnapshot::Task(row) => Some(row.id),
            UndoSnapshot::Comment(row) => Some(row.task_id),
            _ => None,
        };
        let mut event = ActivityEvent::new(user_id, "undo_performed").details(payload.clone());
        if let Some(task_id) = task_id {
            event = event.task(task_id);
        }
        if let UndoSnapshot::TaskList(row) = &snapshot {
            event = event.workspace(row.workspace_id);
        }
        self.activity.record(event).await;
        self.broadcaster
            .emit(ChangeEvent::UndoActionPerformed { user_id }, payload)
            .await;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::task::tests::new_task;
    use crate::data::types::Scope;
    use crate::domain::NewTagInput;
    use crate::domain::access::tests::{list, team, user};
    use crate::domain::engine::testing::engine;

    async fn seed_task(engine: &TaskEngine) -> (i64, TaskRow) {
        let mut conn = engine.pool.acquire().await.unwrap();
        let uid = user(&mut conn, "u@example.com").await;
        let l = list(&mut conn, Scope::User(uid), uid).await;
        let t = task::insert_task(&mut conn, &new_task(l, uid, "Buy milk"), 1)
            .await
            .unwrap();
        (uid, t)
    }

    async fn delete_with_undo(engine: &TaskEngine, uid: i64, t: &TaskRow, now: i64) -> i64 {
        let mut tx = engine.pool.begin().await.unwrap();
        let id = capture(&mut tx, uid, "delete", &UndoSnapshot::Task(t.clone()), now)
            .await
            .unwrap();
        task::deactivate_many(&mut tx, &[t.id], now).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    #[test]
    fn test_snapshot_json_is_tagged() {
        let row = TagRow {
            id: 3,
            tag_name: "urgent".into(),
            color: None,
            workspace_id: None,
            user_id: Some(1),
            is_active: true,
            created_at: 1,
            updated_at: 1,
        };
        let json = serde_json::to_value(UndoSnapshot::Tag(row.clone())).unwrap();
        assert_eq!(json["entity_type"], "tag");
        assert_eq!(json["row"]["tag_name"], "urgent");
        let back: UndoSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, UndoSnapshot::Tag(row));
    }

    #[tokio::test]
    async fn test_restore_within_window_then_consumed() {
        let (engine, recorder) = engine().await;
        let (uid, t) = seed_task(&engine).await;
        let undo_id = delete_with_undo(&engine, uid, &t, 100).await;

        let outcome = engine.restore_at(uid, undo_id, 109).await.unwrap();
        assert_eq!(outcome.entity_type, "task");
        assert_eq!(outcome.entity_id, t.id);

        let mut conn = engine.pool.acquire().await.unwrap();
        let restored = task::get_task(&mut conn, t.id).await.unwrap().unwrap();
        assert_eq!(restored, t);
        drop(conn);

        assert_eq!(
            recorder.routes(),
            vec![(format!("user:{uid}"), "undo_action_performed".to_string())]
        );

        assert!(matches!(
            engine.restore_at(uid, undo_id, 110).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_after_window_expires() {
        let (engine, _) = engine().await;
        let (uid, t) = seed_task(&engine).await;
        let undo_id = delete_with_undo(&engine, uid, &t, 100).await;

        assert!(matches!(
            engine.restore_at(uid, undo_id, 111).await,
            Err(DomainError::Expired(_))
        ));
        let mut conn = engine.pool.acquire().await.unwrap();
        assert!(!task::get_task(&mut conn, t.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_restore_rejects_other_user() {
        let (engine, _) = engine().await;
        let (uid, t) = seed_task(&engine).await;
        let undo_id = delete_with_undo(&engine, uid, &t, 100).await;
        let other = {
            let mut conn = engine.pool.acquire().await.unwrap();
            user(&mut conn, "other@example.com").await
        };

        assert!(matches!(
            engine.restore_at(other, undo_id, 101).await,
            Err(DomainError::Forbidden(_))
        ));
        // Still restorable by the owner
        engine.restore_at(uid, undo_id, 102).await.unwrap();
    }

    #[tokio::test]
    async fn test_capture_purges_expired_entries() {
        let (engine, _) = engine().await;
        let (uid, t) = seed_task(&engine).await;
        let stale = delete_with_undo(&engine, uid, &t, 100).await;
        let _fresh = delete_with_undo(&engine, uid, &t, 200).await;

        let mut conn = engine.pool.acquire().await.unwrap();
        assert!(undo::get_entry(&mut conn, stale).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tag_restore_blocked_by_recreated_name() {
        let (engine, _) = engine().await;
        let (alice, ws) = {
            let mut conn = engine.pool.acquire().await.unwrap();
            let alice = user(&mut conn, "a@example.com").await;
            let ws = team(&mut conn, &[alice]).await;
            (alice, ws)
        };
        let input = NewTagInput {
            tag_name: "urgent".into(),
            workspace_id: Some(ws),
            ..Default::default()
        };

        let original = engine.create_tag(alice, input.clone()).await.unwrap();
        let undo_id = engine.delete_tag(alice, original.id).await.unwrap();
        let replacement = engine.create_tag(alice, input).await.unwrap();

        assert!(matches!(
            engine.restore(alice, undo_id).await,
            Err(DomainError::Validation(_))
        ));
        let names: Vec<(i64, String)> = engine
            .list_tags(alice, Some(ws))
            .await
            .unwrap()
            .into_iter()
            .map(|t| (t.id, t.tag_name))
            .collect();
        assert_eq!(names, vec![(replacement.id, "urgent".to_string())]);

        // Once the name is free again the entry still restores
        engine.delete_tag(alice, replacement.id).await.unwrap();
        let outcome = engine.restore(alice, undo_id).await.unwrap();
        assert_eq!(outcome.entity_id, original.id);
        let active = engine.list_tags(alice, Some(ws)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, original.id);
    }

    #[tokio::test]
    async fn test_child_restored_under_deleted_parent_keeps_link() {
        let (engine, _) = engine().await;
        let (uid, parent) = seed_task(&engine).await;
        let child = {
            let mut conn = engine.pool.acquire().await.unwrap();
            let mut input = new_task(parent.task_list_id, uid, "Find wallet");
            input.parent_task_id = Some(parent.id);
            task::insert_task(&mut conn, &input, 1).await.unwrap()
        };

        let child_undo = delete_with_undo(&engine, uid, &child, 100).await;
        let parent_undo = delete_with_undo(&engine, uid, &parent, 101).await;

        engine.restore_at(uid, child_undo, 102).await.unwrap();
        let mut conn = engine.pool.acquire().await.unwrap();
        let restored = task::get_task(&mut conn, child.id).await.unwrap().unwrap();
        assert!(restored.is_active);
        assert_eq!(restored.parent_task_id, Some(parent.id));
        assert!(!task::get_task(&mut conn, parent.id).await.unwrap().unwrap().is_active);
        drop(conn);

        engine.restore_at(uid, parent_undo, 103).await.unwrap();
        let mut conn = engine.pool.acquire().await.unwrap();
        assert!(task::get_task(&mut conn, parent.id).await.unwrap().unwrap().is_active);
    }
}
