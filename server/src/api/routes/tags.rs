//! Tag endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::AuthUser;
use crate::api::extractors::{ApiPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, UndoableResponse, double_option};
use crate::data::types::TagRow;
use crate::domain::{NewTagInput, TagUpdateInput, TaskEngine};
use crate::utils::time::secs_to_datetime;

#[derive(Debug, Serialize, ToSchema)]
pub struct TagDto {
    pub tag_id: i64,
    pub tag_name: String,
    pub color: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TagRow> for TagDto {
    fn from(row: TagRow) -> Self {
        Self {
            tag_id: row.id,
            tag_name: row.tag_name,
            color: row.color,
            workspace_id: row.workspace_id,
            user_id: row.user_id,
            is_active: row.is_active,
            created_at: secs_to_datetime(row.created_at),
            updated_at: secs_to_datetime(row.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ListTagsQuery {
    pub workspace_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 100, message = "tag_name must be 1-100 characters"))]
    pub tag_name: String,
    #[validate(length(max = 32, message = "color must be at most 32 characters"))]
    pub color: Option<String>,
    pub workspace_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateTagRequest {
    #[validate(length(min = 1, max = 100, message = "tag_name must be 1-100 characters"))]
    pub tag_name: Option<String>,
    /// `null` clears the color
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
}

pub fn routes(engine: TaskEngine) -> Router {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/{tag_id}", put(update_tag).delete(delete_tag))
        .with_state(engine)
}

#[utoipa::path(
    get,
    path = "/api/v1/tags",
    tag = "tags",
    params(("workspace_id" = Option<i64>, Query, description = "Workspace tags instead of personal ones")),
    responses(
        (status = 200, description = "Active tags", body = [TagDto]),
        (status = 403, description = "Not a member of the workspace")
    )
)]
pub async fn list_tags(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedQuery(query): ValidatedQuery<ListTagsQuery>,
) -> Result<Json<Vec<TagDto>>, ApiError> {
    let tags = engine.list_tags(user.user_id, query.workspace_id).await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/tags",
    tag = "tags",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = TagDto),
        (status = 400, description = "Invalid scope or duplicate name")
    )
)]
pub async fn create_tag(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagDto>), ApiError> {
    let tag = engine
        .create_tag(
            user.user_id,
            NewTagInput {
                tag_name: request.tag_name,
                color: request.color,
                workspace_id: request.workspace_id,
                user_id: request.user_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/tags/{tag_id}",
    tag = "tags",
    params(("tag_id" = i64, Path, description = "Tag id")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag updated", body = TagDto),
        (status = 400, description = "Name collision or empty update"),
        (status = 403, description = "Tag not accessible")
    )
)]
pub async fn update_tag(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(tag_id): ApiPath<i64>,
    ValidatedJson(request): ValidatedJson<UpdateTagRequest>,
) -> Result<Json<TagDto>, ApiError> {
    let tag = engine
        .update_tag(
            user.user_id,
            tag_id,
            TagUpdateInput {
                tag_name: request.tag_name,
                color: request.color,
            },
        )
        .await?;
    Ok(Json(tag.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tags/{tag_id}",
    tag = "tags",
    params(("tag_id" = i64, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag deleted", body = UndoableResponse),
        (status = 403, description = "Tag not accessible")
    )
)]
pub async fn delete_tag(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ApiPath(tag_id): ApiPath<i64>,
) -> Result<Json<UndoableResponse>, ApiError> {
    let undo_id = engine.delete_tag(user.user_id, tag_id).await?;
    Ok(Json(UndoableResponse {
        message: "Tag deleted".to_string(),
        undo_id,
    }))
}
