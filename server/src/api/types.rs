//! Shared API types
//!
//! Error mapping and the small response shapes reused across endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainError;
use crate::utils::time::parse_timestamp;

/// Error body: always a single `error` string
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(m) | DomainError::InvalidOwner(m) | DomainError::Expired(m) => {
                Self::BadRequest(m)
            }
            DomainError::Unauthorized(m) => Self::Unauthorized(m),
            DomainError::Forbidden(m) => Self::Forbidden(m),
            DomainError::NotFound(m) => Self::NotFound(m),
            DomainError::Internal(m) => {
                tracing::error!(error = %m, "Internal error");
                Self::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Internal(m) => m,
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// `{message}` acknowledgement
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// `{message, undo_id}` for soft deletes
#[derive(Debug, Serialize, ToSchema)]
pub struct UndoableResponse {
    pub message: String,
    pub undo_id: i64,
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Pair with `#[serde(default)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parse an optional timestamp parameter or body field into unix seconds
pub fn parse_timestamp_param(field: &str, value: Option<&str>) -> Result<Option<i64>, ApiError> {
    match value {
        Some(raw) => parse_timestamp(raw).map(Some).ok_or_else(|| {
            ApiError::bad_request(format!(
                "Invalid {field} '{raw}'. Use ISO 8601 format."
            ))
        }),
        None => Ok(None),
    }
}
