//! Task search

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::api::auth::AuthUser;
use crate::api::extractors::ValidatedQuery;
use crate::api::routes::tasks::types::TaskPageResponse;
use crate::api::types::ApiError;
use crate::domain::TaskEngine;

#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring of title or description
    #[validate(length(min = 1, max = 200, message = "q must be 1-200 characters"))]
    pub q: String,
    pub workspace_id: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub fn routes(engine: TaskEngine) -> Router {
    Router::new()
        .route("/tasks", get(search_tasks))
        .with_state(engine)
}

/// Search one workspace, or the caller's personal lists
#[utoipa::path(
    get,
    path = "/api/v1/search/tasks",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching tasks, most recently updated first", body = TaskPageResponse),
        (status = 400, description = "Empty keyword"),
        (status = 403, description = "Not a member of the workspace")
    )
)]
pub async fn search_tasks(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedQuery(query): ValidatedQuery<SearchQuery>,
) -> Result<Json<TaskPageResponse>, ApiError> {
    let page = engine
        .search_tasks(
            user.user_id,
            &query.q,
            query.workspace_id,
            query.page,
            query.page_size,
        )
        .await?;
    Ok(Json(page.into()))
}
