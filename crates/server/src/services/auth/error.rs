//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;
use crate::services::email::NotificationError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Email or phone already registered.
    #[error("user already exists")]
    Conflict,

    /// No account for this email.
    #[error("user not found")]
    NotFound,

    /// Password does not match.
    #[error("invalid credentials")]
    InvalidCredential,

    /// Reset code wrong, expired or never issued.
    #[error("invalid or expired reset code")]
    InvalidOrExpired,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Reset code could not be delivered.
    #[error("notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Session token could not be issued.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
