//! Undo endpoint

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::AuthUser;
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::domain::TaskEngine;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UndoRequest {
    pub undo_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UndoResponse {
    pub message: String,
    pub entity_type: String,
    pub entity_id: i64,
}

pub fn routes(engine: TaskEngine) -> Router {
    Router::new().route("/", post(undo)).with_state(engine)
}

/// Restore a soft-deleted entity within 10 seconds of the delete
#[utoipa::path(
    post,
    path = "/api/v1/undo",
    tag = "undo",
    request_body = UndoRequest,
    responses(
        (status = 200, description = "Entity restored", body = UndoResponse),
        (status = 400, description = "Undo window has passed"),
        (status = 403, description = "Entry belongs to another user"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn undo(
    State(engine): State<TaskEngine>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<UndoRequest>,
) -> Result<Json<UndoResponse>, ApiError> {
    let outcome = engine.restore(user.user_id, request.undo_id).await?;
    Ok(Json(UndoResponse {
        message: format!("Restored {}", outcome.entity_type),
        entity_type: outcome.entity_type,
        entity_id: outcome.entity_id,
    }))
}
