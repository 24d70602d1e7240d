//! Signed session tokens.
//!
//! Tokens use the compact JWT form `header.claims.signature` with HS256
//! (HMAC-SHA256) and unpadded base64url segments, so any JWT library can
//! read them. Claims carry the user id and email and expire one hour after
//! issue.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use parlour_core::{Email, UserId};

type HmacSha256 = Hmac<Sha256>;

/// How long an issued token stays valid, in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Errors from issuing or verifying tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    Key,
}

/// What a token asserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues and verifies session tokens with one HMAC key.
#[derive(Clone)]
pub struct SessionTokens {
    secret: SecretString,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SessionTokens {
    /// Create a token service signing with `secret`.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)
    }

    /// Issue a token for a user, valid for [`TOKEN_TTL_SECS`] from `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the key cannot be used for HMAC.
    pub fn issue(
        &self,
        user_id: UserId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            id: user_id.as_i32(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };
        let claims = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(claims)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Check a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` for anything that is not a three-part HS256 token,
    /// `BadSignature` if the signature does not match and `Expired` once
    /// `now` is at or past the expiry.
    ///
    /// No route requires a session yet; this is the check such a route uses.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| TokenError::Malformed)?;
        if header != HEADER.as_bytes() {
            return Err(TokenError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let signing_input_len = token.len() - signature_segment_len(token);
        let mut mac = self.mac()?;
        mac.update(&token.as_bytes()[..signing_input_len]);
        // Constant-time comparison
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&claims).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

/// Length of the final `.signature` segment, dot included.
fn signature_segment_len(token: &str) -> usize {
    token.rfind('.').map_or(0, |dot| token.len() - dot)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens::new(SecretString::from("k3Jd9!sQ0pLz7@wX2vB5nM8#rT4yU6eA"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn email() -> Email {
        Email::parse("a@x.com").unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let token = tokens().issue(UserId::new(7), &email(), now()).unwrap();

        let claims = tokens().verify(&token, now()).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_has_jwt_shape() {
        let token = tokens().issue(UserId::new(7), &email(), now()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| !p.contains('=')));
        assert_eq!(
            URL_SAFE_NO_PAD.decode(parts[0]).unwrap(),
            br#"{"alg":"HS256","typ":"JWT"}"#
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = tokens().issue(UserId::new(7), &email(), now()).unwrap();

        let later = now() + Duration::minutes(59);
        assert!(tokens().verify(&token, later).is_ok());

        let expired = now() + Duration::hours(1);
        assert_eq!(tokens().verify(&token, expired), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let token = tokens().issue(UserId::new(7), &email(), now()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = URL_SAFE_NO_PAD.encode(
            br#"{"id":1,"email":"admin@x.com","iat":1714557600,"exp":4102444800}"#,
        );
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert_eq!(
            tokens().verify(&forged, now()),
            Err(TokenError::BadSignature)
        );

        let other_key = SessionTokens::new(SecretString::from("zZ9$yY8^xX7&wW6*vV5(uU4)tT3!sS2@"));
        assert_eq!(
            other_key.verify(&token, now()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let t = tokens();
        assert_eq!(t.verify("", now()), Err(TokenError::Malformed));
        assert_eq!(t.verify("a.b", now()), Err(TokenError::Malformed));
        assert_eq!(t.verify("a.b.c.d", now()), Err(TokenError::Malformed));
        assert_eq!(t.verify("!!.??.##", now()), Err(TokenError::Malformed));
    }
}
