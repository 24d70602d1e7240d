//! User domain types.

use chrono::{DateTime, Utc};

use parlour_core::{Email, Phone, UserId};

/// A registered customer account.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalised (trimmed, lower-cased) email address.
    pub email: Email,
    /// Trimmed phone number.
    pub phone: Phone,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Outstanding password reset code, if one was requested.
    pub reset_code: Option<String>,
    /// When `reset_code` stops being accepted.
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password_hash", &"[REDACTED]")
            .field("reset_code", &self.reset_code.as_ref().map(|_| "[REDACTED]"))
            .field("reset_code_expires_at", &self.reset_code_expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Fields needed to create a user.
#[derive(Clone)]
pub struct NewUser {
    pub email: Email,
    pub phone: Phone,
    pub password_hash: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_credentials() {
        let user = User {
            id: UserId::new(7),
            email: Email::parse("a@x.com").unwrap(),
            phone: Phone::parse("555").unwrap(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            reset_code: Some("123456".to_string()),
            reset_code_expires_at: None,
            created_at: Utc::now(),
        };

        let debug = format!("{user:?}");
        assert!(debug.contains("a@x.com"));
        assert!(!debug.contains("argon2id"));
        assert!(!debug.contains("123456"));
    }
}
