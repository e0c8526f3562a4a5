//! Bearer-token authentication middleware

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::{HeaderMap, header};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use super::jwt::JwtError;
use super::manager::AuthManager;
use crate::api::types::ApiError;
use crate::domain::TaskEngine;

/// The authenticated caller, injected into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub auth_manager: Arc<AuthManager>,
    pub engine: TaskEngine,
}

impl AuthState {
    /// Validate a token and load its active user
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, ApiError> {
        let claims = self.auth_manager.validate(token).map_err(|e| match e {
            JwtError::Expired => ApiError::unauthorized("Session has expired"),
            _ => ApiError::unauthorized("Invalid session token"),
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::unauthorized("Invalid session token"))?;
        let user = self.engine.active_user(user_id).await?;
        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
        })
    }
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let user = state.authenticate(token).await?;
    tracing::trace!(user_id = user.user_id, "Request authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::internal("Auth context not available"))
    }
}
