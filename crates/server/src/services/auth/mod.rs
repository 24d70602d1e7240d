//! Authentication service.
//!
//! Password accounts, session tokens and the email reset-code flow.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, SessionTokens, TokenError};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};

use parlour_core::{Email, Phone};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};
use crate::services::email::{self, Notifier};

/// How long a reset code is accepted after it is issued.
pub const RESET_CODE_TTL_MINUTES: i64 = 15;

/// A successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

/// Authentication service.
///
/// Handles registration, login and password reset.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    notifier: &'a dyn Notifier,
    tokens: &'a SessionTokens,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        notifier: &'a dyn Notifier,
        tokens: &'a SessionTokens,
    ) -> Self {
        Self {
            users,
            notifier,
            tokens,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if a field is missing or malformed.
    /// Returns `AuthError::Conflict` if the email or phone is already registered.
    pub async fn register(
        &self,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = parse_email(email)?;
        let phone = Phone::parse(phone).map_err(|e| AuthError::InvalidInput(e.to_string()))?;
        validate_password(password)?;

        if self
            .users
            .find_user_by_email_or_phone(&email, &phone)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password(password).await?;

        // The unique constraints still decide a race between two registrations
        let user = self
            .users
            .insert_user(NewUser {
                email,
                phone,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::Conflict,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Log in and issue a session token valid for one hour.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if no account uses this email.
    /// Returns `AuthError::InvalidCredential` if the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = parse_email(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is required".to_string()));
        }

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        verify_password(password, &user.password_hash).await?;

        let token = self.tokens.issue(user.id, &user.email, Utc::now())?;
        Ok(LoginOutcome { user, token })
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a 6-digit reset code valid for 15 minutes and email it.
    ///
    /// A new request replaces any outstanding code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if no account uses this email.
    /// Returns `AuthError::Notification` if the code could not be sent.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = parse_email(email)?;
        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let code = generate_reset_code();
        let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);
        self.users.set_reset_code(user.id, &code, expires_at).await?;

        self.notifier
            .send(email::reset_code(&user.email, &code)?)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset code sent");
        Ok(())
    }

    /// Check a reset code without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOrExpired` if the code does not match, has
    /// expired, or was never issued (including for unknown emails).
    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<(), AuthError> {
        self.user_with_valid_code(email, code).await.map(|_| ())
    }

    /// Replace the password and clear the reset code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOrExpired` under the same conditions as
    /// [`Self::verify_reset_code`], so a used code cannot be replayed.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let user = self.user_with_valid_code(email, code).await?;

        let password_hash = hash_password(new_password).await?;
        self.users.replace_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    async fn user_with_valid_code(&self, email: &str, code: &str) -> Result<User, AuthError> {
        let email = parse_email(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidInput("code is required".to_string()));
        }

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidOrExpired)?;

        if !reset_code_matches(&user, code, Utc::now()) {
            return Err(AuthError::InvalidOrExpired);
        }
        Ok(user)
    }
}

/// Whether `code` is the user's outstanding code and still inside its window.
fn reset_code_matches(user: &User, code: &str, now: DateTime<Utc>) -> bool {
    match (&user.reset_code, user.reset_code_expires_at) {
        (Some(stored), Some(expires_at)) => stored == code && now < expires_at,
        _ => false,
    }
}

fn parse_email(email: &str) -> Result<Email, AuthError> {
    Email::parse(email).map_err(|e| AuthError::InvalidInput(e.to_string()))
}

/// Generate a 6-digit reset code, uniform over 100000..=999999.
#[must_use]
pub fn generate_reset_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password is required".to_string()));
    }
    Ok(())
}

/// Hash a password using Argon2id on the blocking pool.
async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    })
    .await
    .map_err(|_| AuthError::PasswordHash)?
}

/// Verify a password against a hash on the blocking pool.
async fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash).map_err(|_| AuthError::InvalidCredential)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredential)
    })
    .await
    .map_err(|_| AuthError::PasswordHash)?
}
