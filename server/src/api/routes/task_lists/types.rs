//! Task list API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::double_option;
use crate::data::sqlite::repositories::task_list::TaskListPatch;
use crate::data::types::TaskListSummaryRow;
use crate::domain::CreateTaskListInput;
use crate::utils::time::secs_to_datetime;

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListDto {
    pub task_list_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
    pub position_order: i64,
    pub is_active: bool,
    pub created_by_user_id: i64,
    pub incomplete_task_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskListSummaryRow> for TaskListDto {
    fn from(row: TaskListSummaryRow) -> Self {
        let list = row.list;
        Self {
            task_list_id: list.id,
            name: list.name,
            description: list.description,
            workspace_id: list.workspace_id,
            user_id: list.user_id,
            position_order: list.position_order,
            is_active: list.is_active,
            created_by_user_id: list.created_by_user_id,
            incomplete_task_count: row.incomplete_task_count,
            created_at: secs_to_datetime(list.created_at),
            updated_at: secs_to_datetime(list.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ListTaskListsQuery {
    pub workspace_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskListRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
    pub position_order: Option<i64>,
}

impl From<CreateTaskListRequest> for CreateTaskListInput {
    fn from(r: CreateTaskListRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            workspace_id: r.workspace_id,
            user_id: r.user_id,
            position_order: r.position_order,
        }
    }
}

/// Scope fields are not accepted; unknown fields are rejected
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskListRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub position_order: Option<i64>,
    pub is_active: Option<bool>,
}

impl From<UpdateTaskListRequest> for TaskListPatch {
    fn from(r: UpdateTaskListRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            position_order: r.position_order,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateTaskListResponse {
    #[serde(flatten)]
    pub list: TaskListDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_id: Option<i64>,
}
