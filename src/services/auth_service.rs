//! Domain service for authentication.
//!
//! Handles login with transparent password-hash migration, access token
//! issuing and verification, and password changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::User;
use crate::domain::{Identity, Role};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Access token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: Role,
    pub unit_id: Option<i32>,
    pub iat: i64,
    pub exp: i64,
}

/// Login result containing the access token and the user it belongs to.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    /// RFC 3339 expiry of `token`.
    pub expires_at: String,
    pub user: User,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Decodes a bearer token into the caller's identity.
    fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;

    /// Gets the current record of the authenticated user.
    async fn current_user(&self, identity: &Identity) -> Result<User, AuthError>;

    /// Changes the caller's password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if current password is incorrect or new password invalid.
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Sets another user's password without knowing the old one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] if `username` does not exist.
    async fn reset_password(&self, username: &str, new_password: &str) -> Result<(), AuthError>;

    /// Hashes a password under the current scheme.
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
}
