//! OpenAPI document

use axum::http::header;
use axum::response::{IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{
    activity, auth, events, health, search, tags, task_lists, tasks, undo, workspaces,
};
use crate::api::types::{ErrorBody, MessageResponse, UndoableResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TaskSync API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Multi-tenant task tracking"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Signup, login and sessions"),
        (name = "workspaces", description = "Workspaces and memberships"),
        (name = "task_lists", description = "Task lists"),
        (name = "tasks", description = "Tasks"),
        (name = "assignments", description = "Task assignees"),
        (name = "tags", description = "Tags"),
        (name = "comments", description = "Task comments"),
        (name = "search", description = "Task search"),
        (name = "undo", description = "Undo of soft deletes"),
        (name = "activity", description = "Activity log"),
        (name = "events", description = "Realtime event stream")
    ),
    paths(
        health::health,
        auth::signup,
        auth::login,
        auth::logout,
        workspaces::list_workspaces,
        workspaces::create_workspace,
        workspaces::add_member,
        task_lists::list_task_lists,
        task_lists::create_task_list,
        task_lists::get_task_list,
        task_lists::update_task_list,
        task_lists::delete_task_list,
        tasks::list_tasks,
        tasks::create_task,
        tasks::get_task,
        tasks::update_task,
        tasks::delete_task,
        tasks::bulk_update,
        tasks::list_assignments,
        tasks::assign_users,
        tasks::unassign_user,
        tasks::attach_tag,
        tasks::detach_tag,
        tasks::list_comments,
        tasks::add_comment,
        tasks::update_comment,
        tasks::delete_comment,
        tags::list_tags,
        tags::create_tag,
        tags::update_tag,
        tags::delete_tag,
        search::search_tasks,
        undo::undo,
        activity::list_activity,
        events::events,
    ),
    components(schemas(ErrorBody, MessageResponse, UndoableResponse))
)]
pub struct ApiDoc;

/// Serve the OpenAPI JSON document
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/tasks",
            "/api/v1/tasks/{task_id}",
            "/api/v1/tasks/bulk_update",
            "/api/v1/undo",
            "/api/v1/events",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
