//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                 - Liveness check
//!
//! # Accounts (rate limited)
//! POST /api/auth/register                      - Create an account
//! POST /api/auth/login                         - Issue a session token
//! POST /api/auth/forgot-password               - Email a reset code
//! POST /api/auth/verify-code                   - Check a reset code
//! POST /api/auth/reset-password                - Replace the password
//!
//! # Appointments
//! POST /api/appointments                       - Book a slot
//! GET  /api/appointments?date=YYYY-MM-DD       - Booked slots on a date
//!
//! # Orders
//! POST /api/orders/create                      - Record a single-item order
//! POST /api/orders/complete-cart               - Record a cart order
//! GET  /api/orders/history/{email}             - Orders for an email, newest first
//! GET  /api/orders/invoices/download/{id}      - Stored grouped invoice PDF
//! POST /api/send-confirmation-email            - Re-send a single-item confirmation
//!
//! # Payments
//! POST /api/payment                            - Gateway order for one product
//! POST /api/payment/create-order               - Gateway order for a cart
//!
//! # Misc
//! POST /api/chatbot                            - Relay to the chatbot
//! GET  /api/health                             - Status with database check
//! ```

pub mod appointments;
pub mod auth;
pub mod chat;
pub mod health;
pub mod orders;
pub mod payment;

use axum::{
    Router,
    body::Body,
    extract::{FromRequest, FromRequestParts},
    http::{HeaderValue, Method, Request, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// JSON body extractor whose rejections answer like every other error,
/// as `400 {"message": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with the same rejection shape as [`ApiJson`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Create the account routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/verify-code", post(auth::verify_code))
        .route("/reset-password", post(auth::reset_password))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(orders::create_single))
        .route("/complete-cart", post(orders::complete_cart))
        .route("/history/{email}", get(orders::history))
        .route(
            "/invoices/download/{invoice_id}",
            get(orders::download_invoice),
        )
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(payment::create_single))
        .route("/create-order", post(payment::create_cart))
}

/// Create everything mounted under `/api`.
///
/// With `rate_limit`, account routes are limited per client IP; the limiter
/// needs the peer address, so the server must be served with connect info.
pub fn api_routes(rate_limit: bool) -> Router<AppState> {
    let mut auth = auth_routes();
    if rate_limit {
        match auth_rate_limiter() {
            Some(limiter) => auth = auth.layer(limiter),
            None => tracing::warn!("Auth rate limiter could not be configured"),
        }
    }

    Router::new()
        .nest("/auth", auth)
        .route(
            "/appointments",
            post(appointments::book).get(appointments::booked_slots),
        )
        .nest("/orders", order_routes())
        .route(
            "/send-confirmation-email",
            post(orders::send_confirmation_email),
        )
        .nest("/payment", payment_routes())
        .route("/chatbot", post(chat::relay))
        .route("/health", get(health::status))
}

/// The whole application with its middleware stack.
pub fn app(state: AppState, rate_limit: bool) -> Router {
    let cors = cors_layer(&state.config().allowed_origins);

    Router::new()
        .route("/health", get(health::liveness))
        .nest("/api", api_routes(rate_limit))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::test_support::TestApp;

    #[tokio::test]
    async fn test_liveness() {
        let app = TestApp::new();
        let response = app.get("/health").await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, b"ok");
        assert!(response.headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_json_400() {
        let app = TestApp::new();
        let response = app
            .post("/api/appointments", json!({ "name": 42 }))
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.json()["message"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = TestApp::new();
        assert_eq!(app.get("/api/nope").await.status, StatusCode::NOT_FOUND);
    }
}
