//! Task endpoints: CRUD, bulk update, assignments, task tags and comments

pub mod types;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::api::auth::AuthUser;
use crate::api::extractors::{ApiPath, ListParams, ValidatedJson};
use crate::api::types::{ApiError, UndoableResponse};
use crate::data::types::{SortOrder, TaskFilter, TaskSortBy, TaskStatus};
use crate::domain::{TagRef, TaskEngine, TaskQuery};
use crate::utils::time::{parse_range_end, parse_timestamp};

use types::{
    AssignUsersRequest, AttachTagRequest, BulkUpdateRequest, BulkUpdateResponse, CommentDto,
    CreateCommentRequest, CreateTaskRequest, DeleteTaskResponse, TaskDto, TaskPageResponse,
    UpdateCommentRequest, UpdateTaskRequest, UpdateTaskResponse, UserRefDto,
};

pub fn routes(engine: TaskEngine) -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/bulk_update", post(bulk_update))
        .route(
            "/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/{task_id}/assignments",
            get(list_assignments).post(assign_users),
        )
        .route("/{task_id}/assignments/{user_id}", delete(unassign_user))
        .route("/{task_id}/tags", post(attach_tag))
        .route("/{task_id}/tags/{tag_id}", delete(detach_tag))
        .route("/{task_id}/comments", get(list_comments).post(add_comment))
        .route(
            "/comments/{comment_id}",
            put(update_comment).delete(delete_comment),
        )
        .with_state(engine)
}

fn parse_bound(
    params: &ListParams,
    key: &str,
    parse: fn(&str) -> Option<i64>,
) -> Result<Option<i64>, ApiError> {
    params
        .single(key)
        .map(|raw| {
            parse(raw).ok_or_else(|| {
                ApiError::bad_request(format!("Invalid {key} '{raw}'. Use ISO 8601 format."))
            })
        })
        .transpose()
}

/// Build a listing request from query parameters
fn task_query(params: &ListParams) -> Result<TaskQuery, ApiError> {
    let task_list_id = params
        .parse::<i64>("task_list_id")?
        .ok_or_else(|| ApiError::bad_request("task_list_id is required"))?;

    let mut filter = TaskFilter {
        statuses: params.parse_list::<TaskStatus>("status")?,
        assigned_user_ids: params.parse_list::<i64>("assigned_user_ids")?,
        due_start: parse_bound(params, "due_date_start", parse_timestamp)?,
        due_end: parse_bound(params, "due_date_end", parse_range_end)?,
        ..Default::default()
    };
    for raw in params.list("tags") {
        match TagRef::parse(raw) {
            TagRef::Id(id) => filter.tag_ids.push(id),
            TagRef::Name(name) => filter.tag_names.push(name),
        }
    }

    Ok(TaskQuery {
        task_list_id,
        filter,
        sort_by: params.parse::<TaskSortBy>("sort_by")?.unwrap_or_default(),
        sort_order: params.parse::<SortOrder>("sort_order")?.unwrap_or_default(),
        page: params.parse::<i64>("page")?,
        page_size: params.parse::<i64>("page_size")?,
    })
}

/// Active tasks of one list, filtered, sorted and paginated
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "tasks",
    params(
        ("task_list_id" = i64, Query, description = "List to read"),
        ("status" = Option<String>, Query, description = "Comma-joined or repeated statuses"),
        ("tags" = Option<String>, Query, description = "Tag ids or names"),
        ("assigned_user_ids" = Option<String>, Query, description = "Assignee ids"),
        ("due_date_start" = Option<String>, Query, description = "Inclusive lower due bound"),
        ("due_date_end" = Option<String>, Query, description = "Inclusive upper due bound"),
        ("sort_by" = Option<String>, Query, description = "custom, deadline, priority, created_at"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<i64>, Query, description = "Page, clamped to >= 1"),
        ("page_size" = Option<i64>, Query, description = "Page size, clamped to 1-100")
    ),
    responses(
        (status = 200, description = "One page of tasks", body = TaskPageResponse),
        (status = 400, description = "Invalid parameter"),
        (status = 403, description = "List not accessible")
    )
)]
pub async fn list_tasks(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    params: ListParams,
) -> Result<Json<TaskPageResponse>, ApiError> {
    let query = task_query(&params)?;
    let page = engine.list_tasks(user.user_id, query).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskDto),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "List not accessible")
    )
)]
pub async fn create_task(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskDto>), ApiError> {
    let task = engine
        .create_task(user.user_id, request.into_input()?)
        .await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task with tags and assignees", body = TaskDto),
        (status = 404, description = "Task not found or access denied")
    )
)]
pub async fn get_task(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
) -> Result<Json<TaskDto>, ApiError> {
    Ok(Json(engine.get_task(user.user_id, task_id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = i64, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = UpdateTaskResponse),
        (status = 400, description = "Empty or invalid update"),
        (status = 404, description = "Task not found or access denied")
    )
)]
pub async fn update_task(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<UpdateTaskRequest>,
) -> Result<Json<UpdateTaskResponse>, ApiError> {
    let outcome = engine
        .update_task(user.user_id, task_id, request.into_input()?)
        .await?;
    Ok(Json(UpdateTaskResponse {
        task: outcome.task.into(),
        undo_id: outcome.undo_id,
    }))
}

/// Soft-delete a task and all of its descendants
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{task_id}",
    tag = "tasks",
    params(("task_id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Deleted", body = DeleteTaskResponse),
        (status = 404, description = "Task not found or access denied")
    )
)]
pub async fn delete_task(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
) -> Result<Json<DeleteTaskResponse>, ApiError> {
    let outcome = engine.delete_task(user.user_id, task_id).await?;
    Ok(Json(DeleteTaskResponse {
        message: "Task deleted".to_string(),
        undo_id: outcome.undo_id,
        deleted_count: outcome.deleted_count,
    }))
}

/// Best-effort per item: inaccessible ids are skipped
#[utoipa::path(
    post,
    path = "/api/v1/tasks/bulk_update",
    tag = "tasks",
    request_body = BulkUpdateRequest,
    responses(
        (status = 200, description = "Tasks that were updated, with undo ids for soft-deleted ones", body = BulkUpdateResponse),
        (status = 400, description = "No ids or no changes")
    )
)]
pub async fn bulk_update(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<BulkUpdateRequest>,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let outcomes = engine.bulk_update(user.user_id, request.into()).await?;
    Ok(Json(outcomes.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{task_id}/assignments",
    tag = "assignments",
    params(("task_id" = i64, Path, description = "Task id")),
    responses((status = 200, description = "Assigned users", body = [UserRefDto]))
)]
pub async fn list_assignments(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
) -> Result<Json<Vec<UserRefDto>>, ApiError> {
    let users = engine.list_assignees(user.user_id, task_id).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Additive; users without access to the list are skipped
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{task_id}/assignments",
    tag = "assignments",
    params(("task_id" = i64, Path, description = "Task id")),
    request_body = AssignUsersRequest,
    responses((status = 200, description = "Task after assignment", body = TaskDto))
)]
pub async fn assign_users(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<AssignUsersRequest>,
) -> Result<Json<TaskDto>, ApiError> {
    let task = engine
        .assign_users(user.user_id, task_id, &request.user_ids)
        .await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{task_id}/assignments/{user_id}",
    tag = "assignments",
    params(
        ("task_id" = i64, Path, description = "Task id"),
        ("user_id" = i64, Path, description = "Assignee to remove")
    ),
    responses(
        (status = 200, description = "Task after removal", body = TaskDto),
        (status = 400, description = "The creator cannot be unassigned"),
        (status = 404, description = "User is not assigned")
    )
)]
pub async fn unassign_user(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath((task_id, assignee_id)): ApiPath<(i64, i64)>,
) -> Result<Json<TaskDto>, ApiError> {
    let task = engine
        .unassign_user(user.user_id, task_id, assignee_id)
        .await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks/{task_id}/tags",
    tag = "tags",
    params(("task_id" = i64, Path, description = "Task id")),
    request_body = AttachTagRequest,
    responses(
        (status = 200, description = "Task after attach", body = TaskDto),
        (status = 400, description = "Tag not available for this list")
    )
)]
pub async fn attach_tag(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<AttachTagRequest>,
) -> Result<Json<TaskDto>, ApiError> {
    let task = engine
        .attach_tag(user.user_id, task_id, request.into_ref()?)
        .await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{task_id}/tags/{tag_id}",
    tag = "tags",
    params(
        ("task_id" = i64, Path, description = "Task id"),
        ("tag_id" = i64, Path, description = "Tag id")
    ),
    responses(
        (status = 200, description = "Task after detach", body = TaskDto),
        (status = 404, description = "Tag is not attached")
    )
)]
pub async fn detach_tag(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath((task_id, tag_id)): ApiPath<(i64, i64)>,
) -> Result<Json<TaskDto>, ApiError> {
    let task = engine.detach_tag(user.user_id, task_id, tag_id).await?;
    Ok(Json(task.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{task_id}/comments",
    tag = "comments",
    params(("task_id" = i64, Path, description = "Task id")),
    responses((status = 200, description = "Comments, oldest first", body = [CommentDto]))
)]
pub async fn list_comments(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
) -> Result<Json<Vec<CommentDto>>, ApiError> {
    let comments = engine.list_comments(user.user_id, task_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks/{task_id}/comments",
    tag = "comments",
    params(("task_id" = i64, Path, description = "Task id")),
    request_body = CreateCommentRequest,
    responses((status = 201, description = "Comment added", body = CommentDto))
)]
pub async fn add_comment(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(task_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentDto>), ApiError> {
    let comment = engine
        .add_comment(
            user.user_id,
            task_id,
            &request.content,
            request.parent_comment_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// Author only, within 15 minutes of creation
#[utoipa::path(
    put,
    path = "/api/v1/tasks/comments/{comment_id}",
    tag = "comments",
    params(("comment_id" = i64, Path, description = "Comment id")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentDto),
        (status = 400, description = "Edit window has passed"),
        (status = 403, description = "Not the author")
    )
)]
pub async fn update_comment(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(comment_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<UpdateCommentRequest>,
) -> Result<Json<CommentDto>, ApiError> {
    let comment = engine
        .update_comment(user.user_id, comment_id, &request.content)
        .await?;
    Ok(Json(comment.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tasks/comments/{comment_id}",
    tag = "comments",
    params(("comment_id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = UndoableResponse),
        (status = 403, description = "Not the author")
    )
)]
pub async fn delete_comment(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(comment_id): ApiPath<i64>,
) -> Result<Json<UndoableResponse>, ApiError> {
    let undo_id = engine.delete_comment(user.user_id, comment_id).await?;
    Ok(Json(UndoableResponse {
        message: "Comment deleted".to_string(),
        undo_id,
    }))
}
