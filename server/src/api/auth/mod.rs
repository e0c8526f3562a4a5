//! Authentication module

pub mod jwt;
mod manager;
pub mod middleware;

pub use jwt::SessionClaims;
pub use manager::AuthManager;
pub use middleware::{AuthState, AuthUser, bearer_token, require_auth};
