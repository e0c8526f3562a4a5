//! Activity log listing

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::auth::AuthUser;
use crate::api::extractors::ValidatedQuery;
use crate::api::types::ApiError;
use crate::data::types::ActivityRow;
use crate::domain::{ActivityPage, TaskEngine};
use crate::utils::time::secs_to_datetime;

#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct ActivityQuery {
    pub workspace_id: Option<i64>,
    pub task_id: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityDto {
    pub log_id: i64,
    pub user_id: i64,
    pub workspace_id: Option<i64>,
    pub task_id: Option<i64>,
    pub action: String,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityRow> for ActivityDto {
    fn from(row: ActivityRow) -> Self {
        let details = serde_json::from_str(&row.details).unwrap_or_else(|e| {
            tracing::warn!(error = %e, log_id = row.id, "Stored activity details are not JSON");
            serde_json::Value::String(row.details.clone())
        });
        Self {
            log_id: row.id,
            user_id: row.user_id,
            workspace_id: row.workspace_id,
            task_id: row.task_id,
            action: row.action,
            details,
            created_at: secs_to_datetime(row.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityPageResponse {
    pub logs: Vec<ActivityDto>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<ActivityPage> for ActivityPageResponse {
    fn from(p: ActivityPage) -> Self {
        Self {
            logs: p.logs.into_iter().map(Into::into).collect(),
            total_count: p.total_count,
            page: p.page,
            page_size: p.page_size,
        }
    }
}

pub fn routes(engine: TaskEngine) -> Router {
    Router::new()
        .route("/", get(list_activity))
        .with_state(engine)
}

#[utoipa::path(
    get,
    path = "/api/v1/activity_logs",
    tag = "activity",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity, newest first", body = ActivityPageResponse),
        (status = 403, description = "Not a member of the workspace"),
        (status = 404, description = "Task not found or access denied")
    )
)]
pub async fn list_activity(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedQuery(query): ValidatedQuery<ActivityQuery>,
) -> Result<Json<ActivityPageResponse>, ApiError> {
    let page = engine
        .list_activity(
            user.user_id,
            query.workspace_id,
            query.task_id,
            query.page,
            query.page_size,
        )
        .await?;
    Ok(Json(page.into()))
}
