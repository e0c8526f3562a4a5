//! Task list endpoints

pub mod types;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::AuthUser;
use crate::api::extractors::{ApiPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, UndoableResponse};
use crate::domain::TaskEngine;

use types::{
    CreateTaskListRequest, ListTaskListsQuery, TaskListDto, UpdateTaskListRequest,
    UpdateTaskListResponse,
};

pub fn routes(engine: TaskEngine) -> Router {
    Router::new()
        .route("/", get(list_task_lists).post(create_task_list))
        .route(
            "/{task_list_id}",
            get(get_task_list)
                .put(update_task_list)
                .delete(delete_task_list),
        )
        .with_state(engine)
}

/// Lists of one workspace, or every list the caller can see
#[utoipa::path(
    get,
    path = "/api/v1/task_lists",
    tag = "task_lists",
    params(("workspace_id" = Option<i64>, Query, description = "Restrict to one workspace")),
    responses(
        (status = 200, description = "Active lists", body = [TaskListDto]),
        (status = 403, description = "Not a member of the workspace")
    )
)]
pub async fn list_task_lists(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedQuery(query): ValidatedQuery<ListTaskListsQuery>,
) -> Result<Json<Vec<TaskListDto>>, ApiError> {
    let lists = engine
        .list_task_lists(user.user_id, query.workspace_id)
        .await?;
    Ok(Json(lists.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/task_lists",
    tag = "task_lists",
    request_body = CreateTaskListRequest,
    responses(
        (status = 201, description = "List created", body = TaskListDto),
        (status = 400, description = "Invalid scope or name"),
        (status = 403, description = "Scope not writable by caller")
    )
)]
pub async fn create_task_list(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateTaskListRequest>,
) -> Result<(StatusCode, Json<TaskListDto>), ApiError> {
    let list = engine
        .create_task_list(user.user_id, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(list.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/task_lists/{task_list_id}",
    tag = "task_lists",
    params(("task_list_id" = i64, Path, description = "Task list id")),
    responses(
        (status = 200, description = "List", body = TaskListDto),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_task_list(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_list_id): ApiPath<i64>,
) -> Result<Json<TaskListDto>, ApiError> {
    let list = engine.get_task_list(user.user_id, task_list_id).await?;
    Ok(Json(list.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/task_lists/{task_list_id}",
    tag = "task_lists",
    params(("task_list_id" = i64, Path, description = "Task list id")),
    request_body = UpdateTaskListRequest,
    responses(
        (status = 200, description = "Updated list", body = UpdateTaskListResponse),
        (status = 400, description = "Empty or invalid update")
    )
)]
pub async fn update_task_list(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_list_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<UpdateTaskListRequest>,
) -> Result<Json<UpdateTaskListResponse>, ApiError> {
    let outcome = engine
        .update_task_list(user.user_id, task_list_id, request.into())
        .await?;
    Ok(Json(UpdateTaskListResponse {
        list: outcome.list.into(),
        undo_id: outcome.undo_id,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/task_lists/{task_list_id}",
    tag = "task_lists",
    params(("task_list_id" = i64, Path, description = "Task list id")),
    responses(
        (status = 200, description = "List soft-deleted", body = UndoableResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_task_list(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_list_id): ApiPath<i64>,
) -> Result<Json<UndoableResponse>, ApiError> {
    let undo_id = engine.delete_task_list(user.user_id, task_list_id).await?;
    Ok(Json(UndoableResponse {
        message: "Task list deleted".to_string(),
        undo_id,
    }))
}
