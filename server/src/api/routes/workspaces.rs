//! Workspace and membership endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::AuthUser;
use crate::api::extractors::{ApiPath, ValidatedJson};
use crate::api::types::{ApiError, MessageResponse};
use crate::data::types::{WorkspaceRow, WorkspaceWithRole};
use crate::domain::TaskEngine;
use crate::utils::time::secs_to_datetime;

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkspaceDto {
    pub workspace_id: i64,
    pub name: String,
    pub is_personal: bool,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl From<WorkspaceWithRole> for WorkspaceDto {
    fn from(row: WorkspaceWithRole) -> Self {
        Self {
            workspace_id: row.id,
            name: row.name,
            is_personal: row.is_personal,
            role: row.role,
            joined_at: secs_to_datetime(row.joined_at),
        }
    }
}

impl From<WorkspaceRow> for WorkspaceDto {
    /// A workspace the caller just created, as its owner
    fn from(row: WorkspaceRow) -> Self {
        Self {
            workspace_id: row.id,
            name: row.name,
            is_personal: row.is_personal,
            role: "owner".to_string(),
            joined_at: secs_to_datetime(row.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub user_id: i64,
    #[validate(length(min = 1, max = 50, message = "role must be 1-50 characters"))]
    pub role: Option<String>,
}

pub fn routes(engine: TaskEngine) -> Router {
    Router::new()
        .route("/", get(list_workspaces).post(create_workspace))
        .route("/{workspace_id}/members", post(add_member))
        .with_state(engine)
}

#[utoipa::path(
    get,
    path = "/api/v1/workspaces",
    tag = "workspaces",
    responses((status = 200, description = "Caller's active memberships", body = [WorkspaceDto]))
)]
pub async fn list_workspaces(
    State(engine): State<TaskEngine>,
    user: AuthUser,
) -> Result<Json<Vec<WorkspaceDto>>, ApiError> {
    let rows = engine.list_workspaces(user.user_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/workspaces",
    tag = "workspaces",
    request_body = CreateWorkspaceRequest,
    responses((status = 201, description = "Workspace created", body = WorkspaceDto))
)]
pub async fn create_workspace(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceDto>), ApiError> {
    let ws = engine.create_workspace(user.user_id, &request.name).await?;
    Ok((StatusCode::CREATED, Json(ws.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/workspaces/{workspace_id}/members",
    tag = "workspaces",
    params(("workspace_id" = i64, Path, description = "Workspace id")),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Member added", body = MessageResponse),
        (status = 403, description = "Caller is not a member"),
        (status = 404, description = "Workspace or user not found")
    )
)]
pub async fn add_member(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(workspace_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<AddMemberRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    engine
        .add_workspace_member(
            user.user_id,
            workspace_id,
            request.user_id,
            request.role.as_deref(),
        )
        .await?;
    Ok(Json(MessageResponse {
        message: "Member added".to_string(),
    }))
}
