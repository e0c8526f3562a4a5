//! Authentication manager

use anyhow::Result;

use super::jwt::{JwtError, SessionClaims, create_session_token, validate_session_token};
use crate::core::config::AuthConfig;
use crate::core::constants::MIN_JWT_SECRET_BYTES;
use crate::utils::crypto;

/// Issues and validates session tokens
#[derive(Debug)]
pub struct AuthManager {
    signing_key: Vec<u8>,
    ttl_hours: u64,
}

impl AuthManager {
    /// Use the configured secret, or a per-process random key
    pub fn init(config: &AuthConfig) -> Result<Self> {
        let signing_key = match &config.jwt_secret {
            Some(secret) => {
                if secret.len() < MIN_JWT_SECRET_BYTES {
                    anyhow::bail!(
                        "JWT secret must be at least {} bytes",
                        MIN_JWT_SECRET_BYTES
                    );
                }
                secret.as_bytes().to_vec()
            }
            None => {
                tracing::warn!(
                    "No JWT secret configured, using a random key: sessions will not survive restarts"
                );
                crypto::generate_signing_key()
            }
        };

        Ok(Self::new(signing_key, config.session_ttl_hours))
    }

    pub fn new(signing_key: Vec<u8>, ttl_hours: u64) -> Self {
        Self {
            signing_key,
            ttl_hours,
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String> {
        create_session_token(&self.signing_key, user_id, self.ttl_hours)
    }

    pub fn validate(&self, jwt: &str) -> Result<SessionClaims, JwtError> {
        validate_session_token(jwt, &self.signing_key)
    }
}
