//! Authentication API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::{AuthManager, AuthState, AuthUser, require_auth};
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::core::constants::MIN_PASSWORD_LEN;
use crate::data::types::{UserRow, UserSettingsRow};
use crate::domain::{Account, TaskEngine};
use crate::utils::time::secs_to_datetime;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = MIN_PASSWORD_LEN, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 200, message = "full_name must be at most 200 characters"))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfileDto {
    pub user_id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfileDto {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.id,
            email: row.email,
            full_name: row.full_name,
            is_active: row.is_active,
            created_at: secs_to_datetime(row.created_at),
            updated_at: secs_to_datetime(row.updated_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSettingDto {
    pub theme: String,
    pub timezone: String,
    pub notifications_enabled: bool,
}

impl From<UserSettingsRow> for UserSettingDto {
    fn from(row: UserSettingsRow) -> Self {
        Self {
            theme: row.theme,
            timezone: row.timezone,
            notifications_enabled: row.notifications_enabled,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user_profile: UserProfileDto,
    pub user_setting: UserSettingDto,
}

#[derive(Clone)]
pub struct AuthRoutesState {
    pub auth_manager: Arc<AuthManager>,
    pub engine: TaskEngine,
}

/// Signup and login are public; logout needs a session
pub fn routes(auth: AuthState) -> Router {
    let state = AuthRoutesState {
        auth_manager: auth.auth_manager.clone(),
        engine: auth.engine.clone(),
    };

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .with_state(state)
        .merge(
            Router::new()
                .route("/logout", post(logout))
                .route_layer(axum::middleware::from_fn_with_state(auth, require_auth)),
        )
}

fn session(state: &AuthRoutesState, account: Account) -> Result<SessionResponse, ApiError> {
    let token = state.auth_manager.issue(account.user.id).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue session token");
        ApiError::internal("Internal server error")
    })?;
    Ok(SessionResponse {
        token,
        user_profile: account.user.into(),
        user_setting: account.settings.into(),
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Invalid input or email already registered")
    )
)]
pub async fn signup(
    State(state): State<AuthRoutesState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let account = state
        .engine
        .signup(&request.email, &request.password, request.full_name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(session(&state, account)?)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthRoutesState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let account = state.engine.login(&request.email, &request.password).await?;
    Ok(Json(session(&state, account)?))
}

/// Tokens are stateless; the client drops its copy
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses((status = 204, description = "Logged out"))
)]
pub async fn logout(user: AuthUser) -> StatusCode {
    tracing::debug!(user_id = user.user_id, "User logged out");
    StatusCode::NO_CONTENT
}
