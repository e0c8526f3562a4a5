//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthManager, AuthState, require_auth};
use super::middleware;
use super::openapi::openapi_json;
use super::routes::events::EventsState;
use super::routes::{
    activity, auth, events, health, search, tags, task_lists, tasks, undo, workspaces,
};
use crate::core::CoreApp;
use crate::core::constants::API_BODY_LIMIT_BYTES;
use crate::data::{SqliteService, TopicService};
use crate::domain::TaskEngine;

/// Everything the router needs, detached from process lifecycle
#[derive(Clone)]
pub struct ApiContext {
    pub database: Arc<SqliteService>,
    pub engine: TaskEngine,
    pub auth_manager: Arc<AuthManager>,
    pub topics: Arc<TopicService>,
    pub shutdown_rx: watch::Receiver<bool>,
    pub trace_requests: bool,
}

/// Build the full `/api/v1` router
pub fn router(ctx: ApiContext) -> Router {
    let auth_state = AuthState {
        auth_manager: ctx.auth_manager.clone(),
        engine: ctx.engine.clone(),
    };
    let protected = |routes: Router| {
        routes.route_layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ))
    };

    let events_state = EventsState {
        auth: auth_state.clone(),
        topics: ctx.topics.clone(),
        shutdown_rx: ctx.shutdown_rx.clone(),
    };

    let health_routes = Router::new()
        .route("/", get(health::health))
        .with_state(ctx.database.clone());

    let router = Router::new()
        .route("/api/v1/openapi.json", get(openapi_json))
        .nest("/api/v1/health", health_routes)
        .nest("/api/v1/auth", auth::routes(auth_state.clone()))
        .nest("/api/v1/events", events::routes(events_state))
        .nest(
            "/api/v1/workspaces",
            protected(workspaces::routes(ctx.engine.clone())),
        )
        .nest(
            "/api/v1/task_lists",
            protected(task_lists::routes(ctx.engine.clone())),
        )
        .nest("/api/v1/tasks", protected(tasks::routes(ctx.engine.clone())))
        .nest("/api/v1/tags", protected(tags::routes(ctx.engine.clone())))
        .nest("/api/v1/search", protected(search::routes(ctx.engine.clone())))
        .nest("/api/v1/undo", protected(undo::routes(ctx.engine.clone())))
        .nest(
            "/api/v1/activity_logs",
            protected(activity::routes(ctx.engine)),
        )
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(middleware::cors())
        .layer(DefaultBodyLimit::max(API_BODY_LIMIT_BYTES));

    if ctx.trace_requests {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered. Returns CoreApp for graceful shutdown.
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = router(ApiContext {
            database: app.database.clone(),
            engine: app.engine.clone(),
            auth_manager: app.auth.clone(),
            topics: app.topics.clone(),
            shutdown_rx: shutdown.subscribe(),
            trace_requests: app.config.debug,
        });

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(address = %addr, "Listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
