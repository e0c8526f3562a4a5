//! Domain error taxonomy

use thiserror::Error;

use crate::data::sqlite::SqliteError;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed, missing or out-of-enum input
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but outside the entity's scope
    #[error("{0}")]
    Forbidden(String),

    /// Missing or inactive entity
    #[error("{0}")]
    NotFound(String),

    /// Undo window elapsed
    #[error("{0}")]
    Expired(String),

    /// List or tag with neither or both scope columns set
    #[error("{0}")]
    InvalidOwner(String),

    #[error("{0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

impl From<SqliteError> for DomainError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Conflict(msg) => Self::Validation(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("snapshot encoding failed: {err}"))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_validation() {
        let err: DomainError = SqliteError::Conflict("Email already registered".into()).into();
        assert!(matches!(err, DomainError::Validation(ref m) if m == "Email already registered"));
    }

    #[test]
    fn test_database_error_is_internal() {
        let err: DomainError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
