//! Account route handlers.
//!
//! Registration, token login and the email reset-code flow. Every answer is
//! JSON with a `message`.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use parlour_core::UserId;

use super::ApiJson;
use crate::error::{Result, set_sentry_user};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Forgot-password request.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Reset code check.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

/// Password replacement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub new_password: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub phone: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserSummary,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/auth/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    state
        .auth()
        .register(&body.email, &body.phone, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let outcome = state.auth().login(&body.email, &body.password).await?;
    set_sentry_user(&outcome.user.id, Some(outcome.user.email.as_str()));

    Ok(Json(LoginResponse {
        message: "Login successful",
        token: outcome.token,
        user: UserSummary {
            id: outcome.user.id,
            email: outcome.user.email.into_inner(),
            phone: outcome.user.phone.to_string(),
        },
    }))
}

/// POST /api/auth/forgot-password
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<Value>> {
    state.auth().request_password_reset(&body.email).await?;
    Ok(Json(
        json!({ "message": "Verification code sent to your email." }),
    ))
}

/// POST /api/auth/verify-code
#[instrument(skip_all)]
pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyCodeRequest>,
) -> Result<Json<Value>> {
    state
        .auth()
        .verify_reset_code(&body.email, &body.code)
        .await?;
    Ok(Json(json!({ "message": "Code verified successfully" })))
}

/// POST /api/auth/reset-password
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<Json<Value>> {
    state
        .auth()
        .reset_password(&body.email, &body.code, &body.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password reset successful" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::routes::test_support::TestApp;

    async fn register(app: &TestApp, email: &str, phone: &str) -> StatusCode {
        app.post(
            "/api/auth/register",
            json!({ "email": email, "phone": phone, "password": "pw1" }),
        )
        .await
        .status
    }

    /// Pull the six-digit code out of the last reset email.
    async fn last_reset_code(app: &TestApp) -> String {
        let sent = app.notifier.sent().await;
        let body = &sent.last().unwrap().text_body;
        body.split(|c: char| !c.is_ascii_digit())
            .find(|part| part.len() == 6)
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let app = TestApp::new();

        assert_eq!(register(&app, "a@x.com", "555").await, StatusCode::CREATED);

        let response = app
            .post(
                "/api/auth/register",
                json!({ "email": "A@X.com", "phone": "999", "password": "pw2" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["message"], "User already exists");

        assert_eq!(register(&app, "b@x.com", "555").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_returns_token_and_user() {
        let app = TestApp::new();
        register(&app, "a@x.com", "555").await;

        let response = app
            .post(
                "/api/auth/login",
                json!({ "email": " A@x.com ", "password": "pw1" }),
            )
            .await;

        assert_eq!(response.status, StatusCode::OK);
        let body = response.json();
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["phone"], "555");
        assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let app = TestApp::new();
        register(&app, "a@x.com", "555").await;

        let unknown = app
            .post(
                "/api/auth/login",
                json!({ "email": "nobody@x.com", "password": "pw1" }),
            )
            .await;
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);

        let wrong = app
            .post(
                "/api/auth/login",
                json!({ "email": "a@x.com", "password": "nope" }),
            )
            .await;
        assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
        assert!(wrong.json().get("token").is_none());
    }

    #[tokio::test]
    async fn test_reset_flow_consumes_code() {
        let app = TestApp::new();
        register(&app, "a@x.com", "555").await;

        let forgot = app
            .post("/api/auth/forgot-password", json!({ "email": "a@x.com" }))
            .await;
        assert_eq!(forgot.status, StatusCode::OK);
        let code = last_reset_code(&app).await;

        let verify = app
            .post(
                "/api/auth/verify-code",
                json!({ "email": "a@x.com", "code": code }),
            )
            .await;
        assert_eq!(verify.status, StatusCode::OK);

        let reset = app
            .post(
                "/api/auth/reset-password",
                json!({ "email": "a@x.com", "code": code, "newPassword": "pw9" }),
            )
            .await;
        assert_eq!(reset.status, StatusCode::OK);

        let replay = app
            .post(
                "/api/auth/reset-password",
                json!({ "email": "a@x.com", "code": code, "newPassword": "pw10" }),
            )
            .await;
        assert_eq!(replay.status, StatusCode::BAD_REQUEST);
        assert_eq!(replay.json()["message"], "Invalid or expired code");

        let login = app
            .post(
                "/api/auth/login",
                json!({ "email": "a@x.com", "password": "pw9" }),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email_is_404() {
        let app = TestApp::new();
        let response = app
            .post("/api/auth/forgot-password", json!({ "email": "ghost@x.com" }))
            .await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(app.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_forgot_password_mail_failure_is_500() {
        let app = TestApp::new();
        register(&app, "a@x.com", "555").await;
        app.notifier.set_failing(true);

        let response = app
            .post("/api/auth/forgot-password", json!({ "email": "a@x.com" }))
            .await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_fields_are_400() {
        let app = TestApp::new();
        let response = app
            .post("/api/auth/register", json!({ "email": "a@x.com" }))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
}
