//! Admin credential check for the review endpoints.
//!
//! Credentials arrive as HTTP Basic auth and are verified against an argon2
//! PHC hash from configuration. Plaintext passwords are never stored or
//! compared.

use crate::config::AuthConfig;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("admin password hash is not a valid PHC string: {0}")]
    InvalidHash(String),

    #[error("missing or malformed credentials")]
    MissingCredentials,

    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Verifies admin credentials against the configured hash
#[derive(Debug, Clone)]
pub struct AdminAuth {
    username: String,
    password_hash: String,
}

impl AdminAuth {
    /// Fails at startup when the configured hash cannot be parsed
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        PasswordHash::new(&config.admin_password_hash)
            .map_err(|e| AuthError::InvalidHash(e.to_string()))?;

        Ok(Self {
            username: config.admin_username.clone(),
            password_hash: config.admin_password_hash.clone(),
        })
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|e| AuthError::InvalidHash(e.to_string()))?;
        let password_ok = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();

        if username == self.username && password_ok {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Check an `Authorization: Basic ...` header value
    pub fn verify_header(&self, value: &str) -> Result<(), AuthError> {
        let encoded = value
            .strip_prefix("Basic ")
            .ok_or(AuthError::MissingCredentials)?;
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::MissingCredentials)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MissingCredentials)?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MissingCredentials)?;

        self.verify(username, password)
    }
}

/// Hash a password into an argon2id PHC string for `auth.admin_password_hash`
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InvalidHash(e.to_string()))
}

/// Middleware rejecting requests without valid admin credentials
pub async fn require_admin(
    State(auth): State<Arc<AdminAuth>>,
    request: Request,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let result = match header_value {
        Some(value) => auth.verify_header(value),
        None => Err(AuthError::MissingCredentials),
    };

    match result {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "Rejected admin request");
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"submissions\"")],
                Json(serde_json::json!({
                    "error": "Authentication required",
                    "code": "UNAUTHORIZED"
                })),
            )
                .into_response()
        }
    }
}
