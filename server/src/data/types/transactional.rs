//! Row types for the transactional store
//!
//! Rows map 1:1 onto SQLite tables. Task, list, tag and comment rows are also
//! the undo snapshot format, so they serialize every column.

use serde::{Deserialize, Serialize};

use super::enums::{TaskPriority, TaskStatus};

// ============================================================================
// User types
// ============================================================================

/// User row from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-user preferences created at signup
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSettingsRow {
    pub user_id: i64,
    pub theme: String,
    pub timezone: String,
    pub notifications_enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Public identity of a user attached to tasks and comments
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRef {
    pub user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
}

// ============================================================================
// Workspace types
// ============================================================================

/// Workspace row from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkspaceRow {
    pub id: i64,
    pub name: String,
    pub is_personal: bool,
    pub created_by_user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Workspace with the caller's role (for listing memberships)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkspaceWithRole {
    pub id: i64,
    pub name: String,
    pub is_personal: bool,
    pub role: String,
    pub joined_at: i64,
}

/// Active membership of one user
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MembershipRow {
    pub workspace_id: i64,
    pub role: String,
}

// ============================================================================
// Task list types
// ============================================================================

/// Task list row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskListRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
    pub position_order: i64,
    pub is_active: bool,
    pub created_by_user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Task list with its read-time incomplete counter
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskListSummaryRow {
    #[sqlx(flatten)]
    pub list: TaskListRow,
    pub incomplete_task_count: i64,
}

// ============================================================================
// Task types
// ============================================================================

/// Task row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub task_list_id: i64,
    pub parent_task_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub is_completed: bool,
    pub due_datetime: Option<i64>,
    pub recurrence_rule: Option<String>,
    pub recurrence_end_date: Option<i64>,
    pub position_order: i64,
    pub is_active: bool,
    pub created_by_user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Minimal parent/child edge used by the hierarchy walk
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct TaskEdgeRow {
    pub id: i64,
    pub parent_task_id: Option<i64>,
}

/// Tag attached to a task
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TaskTagRow {
    pub task_id: i64,
    pub tag_id: i64,
    pub tag_name: String,
    pub color: Option<String>,
}

/// User assigned to a task
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AssigneeRow {
    pub task_id: i64,
    #[sqlx(flatten)]
    pub user: UserRef,
}

// ============================================================================
// Tag types
// ============================================================================

/// Tag row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagRow {
    pub id: i64,
    pub tag_name: String,
    pub color: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Comment types
// ============================================================================

/// Comment row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Comment joined with its author
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentWithAuthorRow {
    #[sqlx(flatten)]
    pub comment: CommentRow,
    pub email: String,
    pub full_name: Option<String>,
}

// ============================================================================
// Undo / activity types
// ============================================================================

/// Undo log entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UndoRow {
    pub id: i64,
    pub user_id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub operation: String,
    pub data_snapshot: String,
    pub created_at: i64,
}

/// Activity log entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub user_id: i64,
    pub workspace_id: Option<i64>,
    pub task_id: Option<i64>,
    pub action: String,
    pub details: String,
    pub created_at: i64,
}
