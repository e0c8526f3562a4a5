//! Task API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{ApiError, double_option, parse_timestamp_param};
use crate::data::sqlite::repositories::task::TaskPatch;
use crate::data::types::{TaskPriority, TaskStatus, TaskTagRow, UserRef};
use crate::domain::{
    BulkUpdateInput, CommentView, CreateTaskInput, TagRef, TaskDetail, TaskPage, UpdateOutcome,
    UpdateTaskInput,
};
use crate::utils::time::secs_to_datetime;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserRefDto {
    pub user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<UserRef> for UserRefDto {
    fn from(u: UserRef) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            full_name: u.full_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskTagDto {
    pub tag_id: i64,
    pub tag_name: String,
    pub color: Option<String>,
}

impl From<TaskTagRow> for TaskTagDto {
    fn from(t: TaskTagRow) -> Self {
        Self {
            tag_id: t.tag_id,
            tag_name: t.tag_name,
            color: t.color,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskDto {
    pub task_id: i64,
    pub task_list_id: i64,
    pub parent_task_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub is_completed: bool,
    pub due_datetime: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<String>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub position_order: i64,
    pub is_active: bool,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<TaskTagDto>,
    pub assigned_users: Vec<UserRefDto>,
}

impl From<TaskDetail> for TaskDto {
    fn from(d: TaskDetail) -> Self {
        let t = d.task;
        Self {
            task_id: t.id,
            task_list_id: t.task_list_id,
            parent_task_id: t.parent_task_id,
            title: t.title,
            description: t.description,
            priority: t.priority,
            status: t.status,
            is_completed: t.is_completed,
            due_datetime: t.due_datetime.map(secs_to_datetime),
            recurrence_rule: t.recurrence_rule,
            recurrence_end_date: t.recurrence_end_date.map(secs_to_datetime),
            position_order: t.position_order,
            is_active: t.is_active,
            created_by_user_id: t.created_by_user_id,
            created_at: secs_to_datetime(t.created_at),
            updated_at: secs_to_datetime(t.updated_at),
            tags: d.tags.into_iter().map(Into::into).collect(),
            assigned_users: d.assigned_users.into_iter().map(Into::into).collect(),
        }
    }
}

/// Paginated task listing
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskPageResponse {
    pub tasks: Vec<TaskDto>,
    /// Active tasks of the list (search: matches), ignoring filters
    pub total_count: i64,
    pub filtered_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<TaskPage> for TaskPageResponse {
    fn from(p: TaskPage) -> Self {
        Self {
            tasks: p.tasks.into_iter().map(Into::into).collect(),
            total_count: p.total_count,
            filtered_count: p.filtered_count,
            page: p.page,
            page_size: p.page_size,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub task_list_id: i64,
    pub parent_task_id: Option<i64>,
    #[validate(length(min = 1, max = 500, message = "title must be 1-500 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub is_completed: Option<bool>,
    /// ISO 8601
    pub due_datetime: Option<String>,
    pub recurrence_rule: Option<String>,
    /// ISO 8601
    pub recurrence_end_date: Option<String>,
    pub position_order: Option<i64>,
    /// Tag ids or names
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub tags: Vec<TagRef>,
    #[serde(default)]
    pub assigned_user_ids: Vec<i64>,
}

impl CreateTaskRequest {
    pub fn into_input(self) -> Result<CreateTaskInput, ApiError> {
        Ok(CreateTaskInput {
            due_datetime: parse_timestamp_param("due_datetime", self.due_datetime.as_deref())?,
            recurrence_end_date: parse_timestamp_param(
                "recurrence_end_date",
                self.recurrence_end_date.as_deref(),
            )?,
            task_list_id: self.task_list_id,
            parent_task_id: self.parent_task_id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
            is_completed: self.is_completed,
            recurrence_rule: self.recurrence_rule,
            position_order: self.position_order,
            tags: self.tags,
            assigned_user_ids: self.assigned_user_ids,
        })
    }
}

/// Partial update. Explicit `null` clears a nullable field.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 500, message = "title must be 1-500 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_task_id: Option<Option<i64>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub is_completed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_datetime: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurrence_rule: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurrence_end_date: Option<Option<String>>,
    pub position_order: Option<i64>,
    pub is_active: Option<bool>,
    /// Replaces every tag when present
    #[schema(value_type = Option<Vec<Object>>)]
    pub tags: Option<Vec<TagRef>>,
    /// Replaces every assignee when present; the creator always stays
    pub assigned_user_ids: Option<Vec<i64>>,
}

fn nullable_timestamp(
    field: &str,
    value: Option<Option<String>>,
) -> Result<Option<Option<i64>>, ApiError> {
    match value {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(raw)) => Ok(Some(parse_timestamp_param(field, Some(&raw))?)),
    }
}

impl UpdateTaskRequest {
    pub fn into_input(self) -> Result<UpdateTaskInput, ApiError> {
        let patch = TaskPatch {
            due_datetime: nullable_timestamp("due_datetime", self.due_datetime)?,
            recurrence_end_date: nullable_timestamp(
                "recurrence_end_date",
                self.recurrence_end_date,
            )?,
            title: self.title,
            description: self.description,
            parent_task_id: self.parent_task_id,
            priority: self.priority,
            status: self.status,
            is_completed: self.is_completed,
            recurrence_rule: self.recurrence_rule,
            position_order: self.position_order,
            is_active: self.is_active,
        };
        Ok(UpdateTaskInput {
            patch,
            tags: self.tags,
            assigned_user_ids: self.assigned_user_ids,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateTaskResponse {
    #[serde(flatten)]
    pub task: TaskDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteTaskResponse {
    pub message: String,
    pub undo_id: i64,
    pub deleted_count: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, max = 500, message = "task_ids must hold 1-500 ids"))]
    pub task_ids: Vec<i64>,
    pub status: Option<TaskStatus>,
    pub is_completed: Option<bool>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub add_tag_ids: Vec<i64>,
    #[serde(default)]
    pub remove_tag_ids: Vec<i64>,
    #[serde(default)]
    pub assign_user_ids: Vec<i64>,
    #[serde(default)]
    pub unassign_user_ids: Vec<i64>,
}

impl From<BulkUpdateRequest> for BulkUpdateInput {
    fn from(r: BulkUpdateRequest) -> Self {
        Self {
            task_ids: r.task_ids,
            status: r.status,
            is_completed: r.is_completed,
            is_active: r.is_active,
            add_tag_ids: r.add_tag_ids,
            remove_tag_ids: r.remove_tag_ids,
            assign_user_ids: r.assign_user_ids,
            unassign_user_ids: r.unassign_user_ids,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub updated_tasks: Vec<TaskDto>,
    /// One entry per task soft-deleted by `is_active: false`
    pub undo_ids: Vec<i64>,
}

impl From<Vec<UpdateOutcome>> for BulkUpdateResponse {
    fn from(outcomes: Vec<UpdateOutcome>) -> Self {
        let undo_ids = outcomes.iter().filter_map(|o| o.undo_id).collect();
        Self {
            updated_tasks: outcomes.into_iter().map(|o| o.task.into()).collect(),
            undo_ids,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AssignUsersRequest {
    #[validate(length(min = 1, message = "user_ids must not be empty"))]
    pub user_ids: Vec<i64>,
}

/// Exactly one of `tag_id` or `tag_name`
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AttachTagRequest {
    pub tag_id: Option<i64>,
    pub tag_name: Option<String>,
}

impl AttachTagRequest {
    pub fn into_ref(self) -> Result<TagRef, ApiError> {
        match (self.tag_id, self.tag_name) {
            (Some(id), None) => Ok(TagRef::Id(id)),
            (None, Some(name)) if !name.trim().is_empty() => {
                Ok(TagRef::Name(name.trim().to_string()))
            }
            _ => Err(ApiError::bad_request(
                "Provide exactly one of tag_id or tag_name",
            )),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentDto {
    pub comment_id: i64,
    pub task_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub author: UserRefDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentView> for CommentDto {
    fn from(v: CommentView) -> Self {
        Self {
            comment_id: v.comment.id,
            task_id: v.comment.task_id,
            parent_comment_id: v.comment.parent_comment_id,
            content: v.comment.content,
            author: v.author.into(),
            created_at: secs_to_datetime(v.comment.created_at),
            updated_at: secs_to_datetime(v.comment.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 10000, message = "content must be 1-10000 characters"))]
    pub content: String,
    pub parent_comment_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 10000, message = "content must be 1-10000 characters"))]
    pub content: String,
}
