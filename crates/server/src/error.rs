//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors answer with a JSON
//! body `{"message": "..."}`; server-side failures are captured to Sentry
//! first and their detail never reaches the client.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use parlour_core::OrderId;

use crate::db::RepositoryError;
use crate::services::appointments::BookingError;
use crate::services::auth::AuthError;
use crate::services::orders::{ConfirmationError, OrderError};
use crate::services::payment::PaymentError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed outside a service.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Booking failed.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Gateway order could not be created.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// The order is stored but its confirmation did not go out.
    #[error("Order {order_id} stored but confirmation failed: {source}")]
    ConfirmationFailed {
        order_id: OrderId,
        source: ConfirmationError,
    },

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidInput(_)
                | AuthError::Conflict
                | AuthError::InvalidCredential
                | AuthError::InvalidOrExpired => StatusCode::BAD_REQUEST,
                AuthError::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Booking(err) => match err {
                BookingError::InvalidInput(_) | BookingError::SlotTaken => StatusCode::BAD_REQUEST,
                BookingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Order(err) => match err {
                OrderError::InvalidInput(_) | OrderError::DuplicatePayment => {
                    StatusCode::BAD_REQUEST
                }
                OrderError::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(PaymentError::InvalidInput(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Payment(_) | Self::Database(_) | Self::ConfirmationFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidInput(msg) => msg.clone(),
                AuthError::Conflict => "User already exists".to_string(),
                AuthError::NotFound => "User not found".to_string(),
                AuthError::InvalidCredential => "Incorrect password".to_string(),
                AuthError::InvalidOrExpired => "Invalid or expired code".to_string(),
                AuthError::Notification(_) => {
                    "Failed to send verification code. Please try again later.".to_string()
                }
                _ => "Internal server error".to_string(),
            },
            Self::Booking(err) => match err {
                BookingError::InvalidInput(msg) => msg.clone(),
                BookingError::SlotTaken => "Time slot already booked".to_string(),
                BookingError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Order(err) => match err {
                OrderError::InvalidInput(msg) => msg.clone(),
                OrderError::NotFound => "Invoice not found".to_string(),
                OrderError::DuplicatePayment => {
                    "Order already placed for this payment".to_string()
                }
                OrderError::Notification(_) => "Failed to send confirmation email".to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::Payment(PaymentError::InvalidInput(msg)) | Self::BadRequest(msg) => msg.clone(),
            Self::Payment(_) => "Failed to create payment order".to_string(),
            Self::ConfirmationFailed { .. } => {
                "Payment succeeded but failed to send confirmation email or save invoice."
                    .to_string()
            }
            Self::Database(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let message = self.public_message();
        let body = match &self {
            Self::ConfirmationFailed { order_id, .. } => {
                json!({ "message": message, "orderId": order_id })
            }
            _ => json!({ "message": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let response = AppError::Booking(BookingError::InvalidInput("date is required".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "date is required");
    }

    #[tokio::test]
    async fn test_taxonomy_status_codes() {
        assert_eq!(
            AppError::Auth(AuthError::Conflict).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidOrExpired).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Booking(BookingError::SlotTaken).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Order(OrderError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Order(OrderError::DuplicatePayment).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Payment(PaymentError::Request("timeout".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response =
            AppError::Database(RepositoryError::DataCorruption("bad row 7".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_confirmation_failure_names_the_order() {
        let response = AppError::ConfirmationFailed {
            order_id: OrderId::new(12),
            source: ConfirmationError::Notification(
                crate::services::email::NotificationError::Delivery("down".into()),
            ),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["orderId"], 12);
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Payment succeeded")
        );
    }
}
