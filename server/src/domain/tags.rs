//! Tag resolution and standalone tag management
//!
//! Tags belong to exactly one scope and are unique by name among the active
//! tags of that scope. Resolution against a list never fails: references that
//! do not fit the list's scope are skipped.

use serde::Deserialize;
use sqlx::SqliteConnection;

use crate::data::sqlite::repositories::tag;
use crate::data::types::{Scope, TagRow};
use crate::utils::time::now_secs;

use super::access::can_access_scope;
use super::engine::TaskEngine;
use super::error::{DomainError, DomainResult};
use super::undo::{UndoSnapshot, capture};

/// A tag given either by id or by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Id(i64),
    Name(String),
}

impl TagRef {
    /// Numeric strings are ids, anything else is a name
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Name(raw.to_string()),
        }
    }
}

/// Resolve one reference against a list scope, creating named tags on demand
pub async fn resolve_tag(
    conn: &mut SqliteConnection,
    scope: Scope,
    item: &TagRef,
    now: i64,
) -> DomainResult<Option<i64>> {
    match item {
        TagRef::Id(id) => {
            let tag = tag::get_tag(conn, *id).await?;
            Ok(tag
                .filter(|t| t.is_active && t.scope() == Some(scope))
                .map(|t| t.id))
        }
        TagRef::Name(name) => {
            let name = name.trim();
            if name.is_empty() {
                return Ok(None);
            }
            if let Some(existing) = tag::find_active_by_name(conn, scope, name).await? {
                return Ok(Some(existing.id));
            }
            let created = tag::insert_tag(conn, name, None, scope, now).await?;
            tracing::debug!(tag_id = created.id, ?scope, "Created tag during resolution");
            Ok(Some(created.id))
        }
    }
}

/// Resolve every reference and link the results to the task.
///
/// Returns the ids that were attached.
pub async fn attach_tags(
    conn: &mut SqliteConnection,
    task_id: i64,
    scope: Scope,
    items: &[TagRef],
    now: i64,
) -> DomainResult<Vec<i64>> {
    let mut attached = Vec::with_capacity(items.len());
    for item in items {
        match resolve_tag(conn, scope, item, now).await? {
            Some(tag_id) => {
                tag::link(conn, task_id, tag_id).await?;
                if !attached.contains(&tag_id) {
                    attached.push(tag_id);
                }
            }
            None => tracing::debug!(task_id, ?item, "Skipped tag outside list scope"),
        }
    }
    Ok(attached)
}

/// Full replace of a task's tag set
pub async fn replace_tags(
    conn: &mut SqliteConnection,
    task_id: i64,
    scope: Scope,
    items: &[TagRef],
    now: i64,
) -> DomainResult<Vec<i64>> {
    tag::clear_links(conn, task_id).await?;
    attach_tags(conn, task_id, scope, items, now).await
}

/// Resolve the owning scope for a new list or tag from its two optional columns
pub fn scope_from_request(
    workspace_id: Option<i64>,
    user_id: Option<i64>,
    what: &str,
) -> DomainResult<Scope> {
    Scope::from_columns(workspace_id, user_id).ok_or_else(|| {
        DomainError::validation(format!(
            "{what} must belong to exactly one of workspace_id or user_id"
        ))
    })
}

/// Check a requested scope is one the user may create things in
pub async fn ensure_scope_writable(
    conn: &mut SqliteConnection,
    user_id: i64,
    scope: Scope,
) -> DomainResult<()> {
    match scope {
        Scope::User(owner) if owner != user_id => Err(DomainError::forbidden(
            "Cannot create items for another user",
        )),
        Scope::User(_) => Ok(()),
        Scope::Workspace(_) => {
            if can_access_scope(conn, user_id, scope).await? {
                Ok(())
            } else {
                Err(DomainError::forbidden("Not a member of this workspace"))
            }
        }
    }
}

/// Fields for a new tag
#[derive(Debug, Clone, Default)]
pub struct NewTagInput {
    pub tag_name: String,
    pub color: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// Rename and/or recolor. `color: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TagUpdateInput {
    pub tag_name: Option<String>,
    pub color: Option<Option<String>>,
}

async fn load_accessible_tag(
    conn: &mut SqliteConnection,
    user_id: i64,
    tag_id: i64,
) -> DomainResult<(TagRow, Scope)> {
    let row = tag::get_tag(conn, tag_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| DomainError::not_found("Tag not found"))?;
    let scope = row.scope().ok_or_else(|| {
        DomainError::InvalidOwner(
            "Tag must belong to exactly one of a workspace or a user".to_string(),
        )
    })?;
    if !can_access_scope(conn, user_id, scope).await? {
        return Err(DomainError::forbidden("Access denied to this tag"));
    }
    Ok((row, scope))
}

fn clean_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("tag_name must not be empty"));
    }
    Ok(name.to_string())
}

impl TaskEngine {
    /// Active tags of a workspace, or the caller's personal tags
    pub async fn list_tags(
        &self,
        user_id: i64,
        workspace_id: Option<i64>,
    ) -> DomainResult<Vec<TagRow>> {
        let mut conn = self.pool.acquire().await?;
        let scope = match workspace_id {
            Some(ws) => {
                if !can_access_scope(&mut conn, user_id, Scope::Workspace(ws)).await? {
                    return Err(DomainError::forbidden("Not a member of this workspace"));
                }
                Scope::Workspace(ws)
            }
            None => Scope::User(user_id),
        };
        Ok(tag::list_active(&mut conn, scope).await?)
    }

    pub async fn create_tag(&self, user_id: i64, input: NewTagInput) -> DomainResult<TagRow> {
        let scope = scope_from_request(input.workspace_id, input.user_id, "Tag")?;
        let name = clean_name(&input.tag_name)?;

        let mut tx = self.pool.begin().await?;
        ensure_scope_writable(&mut tx, user_id, scope).await?;
        if tag::find_active_by_name(&mut tx, scope, &name).await?.is_some() {
            return Err(DomainError::validation(format!(
                "Tag '{name}' already exists in this scope"
            )));
        }
        let row = tag::insert_tag(&mut tx, &name, input.color.as_deref(), scope, now_secs()).await?;
        tx.commit().await?;

        tracing::debug!(tag_id = row.id, user_id, "Tag created");
        Ok(row)
    }

    pub async fn update_tag(
        &self,
        user_id: i64,
        tag_id: i64,
        input: TagUpdateInput,
    ) -> DomainResult<TagRow> {
        if input.tag_name.is_none() && input.color.is_none() {
            return Err(DomainError::validation("No fields to update"));
        }
        let name = input.tag_name.as_deref().map(clean_name).transpose()?;

        let mut tx = self.pool.begin().await?;
        let (_, scope) = load_accessible_tag(&mut tx, user_id, tag_id).await?;
        if let Some(name) = &name
            && let Some(other) = tag::find_active_by_name(&mut tx, scope, name).await?
            && other.id != tag_id
        {
            return Err(DomainError::validation(format!(
                "Tag '{name}' already exists in this scope"
            )));
        }
        let color = input.color.as_ref().map(|c| c.as_deref());
        let row = tag::update_tag(&mut tx, tag_id, name.as_deref(), color, now_secs())
            .await?
            .ok_or_else(|| DomainError::not_found("Tag not found"))?;
        tx.commit().await?;
        Ok(row)
    }

    /// Soft-delete a tag and drop its task links. Returns the undo id.
    pub async fn delete_tag(&self, user_id: i64, tag_id: i64) -> DomainResult<i64> {
        let now = now_secs();
        let mut tx = self.pool.begin().await?;
        let (row, _) = load_accessible_tag(&mut tx, user_id, tag_id).await?;
        let undo_id = capture(&mut tx, user_id, "delete", &UndoSnapshot::Tag(row), now).await?;
        tag::deactivate_tag(&mut tx, tag_id, now).await?;
        let unlinked = tag::unlink_all_for_tag(&mut tx, tag_id).await?;
        tx.commit().await?;

        tracing::debug!(tag_id, user_id, unlinked, "Tag deleted");
        Ok(undo_id)
    }
}
