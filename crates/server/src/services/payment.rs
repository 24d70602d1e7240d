//! Payment gateway orders.
//!
//! Before the storefront can open the Razorpay checkout it needs a gateway
//! order for the exact amount in paise. [`Payments`] computes that amount
//! (from a single price or a cart) and asks the [`PaymentGateway`] for the
//! order, whose JSON is handed back to the client untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use parlour_core::Price;

use super::orders::{CartItem, OrderError, price_cart};
use crate::config::PaymentConfig;

/// Errors from creating gateway orders.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Bad amount, name or cart.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request failed.
    #[error("gateway request failed: {0}")]
    Request(String),

    /// The gateway answered with something unreadable.
    #[error("gateway response error: {0}")]
    Response(String),

    /// The gateway refused the order.
    #[error("gateway error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<OrderError> for PaymentError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

/// Body of a gateway order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayOrderRequest {
    /// Amount in paise.
    pub amount: i64,
    pub currency: &'static str,
    pub receipt: String,
    /// Capture automatically once authorised.
    pub payment_capture: u8,
}

impl GatewayOrderRequest {
    /// An auto-captured rupee order with a timestamped receipt.
    #[must_use]
    pub fn inr(amount_paise: i64, now: DateTime<Utc>) -> Self {
        Self {
            amount: amount_paise,
            currency: "INR",
            receipt: format!("receipt_{}", now.timestamp_millis()),
            payment_capture: 1,
        }
    }
}

/// Creates payable orders with a payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order and return the provider's descriptor as-is.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the provider cannot be reached or refuses.
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<serde_json::Value, PaymentError>;
}

/// Razorpay Orders API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    /// Create a client from the payment config.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self), fields(amount = request.amount, receipt = %request.receipt))]
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<serde_json::Value, PaymentError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(request)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %message, "Razorpay refused order");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PaymentError::Response(e.to_string()))?;

        tracing::info!(
            order_id = order.get("id").and_then(serde_json::Value::as_str).unwrap_or("?"),
            "Razorpay order created"
        );
        Ok(order)
    }
}

/// Computes payable amounts and opens gateway orders for them.
pub struct Payments<'a> {
    gateway: &'a dyn PaymentGateway,
}

impl<'a> Payments<'a> {
    /// Create the service over a gateway.
    #[must_use]
    pub const fn new(gateway: &'a dyn PaymentGateway) -> Self {
        Self { gateway }
    }

    /// Open an order for one product priced in rupees.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidInput` for a non-positive amount or an
    /// empty name, otherwise whatever the gateway reports.
    pub async fn create_single_payment(
        &self,
        amount: Decimal,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<serde_json::Value, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidInput("Invalid amount.".to_string()));
        }
        if name.trim().is_empty() {
            return Err(PaymentError::InvalidInput(
                "Invalid product name.".to_string(),
            ));
        }
        let paise = to_paise(amount)?;
        self.gateway
            .create_order(&GatewayOrderRequest::inr(paise, now))
            .await
    }

    /// Open an order for a whole cart, priced the same way the cart order
    /// will be recorded.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidInput` for an empty or invalid cart or a
    /// total that rounds to zero paise.
    pub async fn create_cart_payment(
        &self,
        items: &[CartItem],
        now: DateTime<Utc>,
    ) -> Result<serde_json::Value, PaymentError> {
        let cart = price_cart(items)?;
        let paise = to_paise(cart.total)?;
        if paise <= 0 {
            return Err(PaymentError::InvalidInput(
                "Total amount must be > 0.".to_string(),
            ));
        }
        self.gateway
            .create_order(&GatewayOrderRequest::inr(paise, now))
            .await
    }
}

fn to_paise(amount: Decimal) -> Result<i64, PaymentError> {
    Price::inr(amount)
        .to_minor_units()
        .ok_or_else(|| PaymentError::InvalidInput("amount too large".to_string()))
}

// =============================================================================
// Test Support
// =============================================================================

/// Answers every order request locally and remembers it.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeGateway {
    requests: tokio::sync::Mutex<Vec<GatewayOrderRequest>>,
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeGateway {
    /// Create a gateway that accepts every order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every subsequent order (or accept again).
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<GatewayOrderRequest> {
        self.requests.lock().await.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<serde_json::Value, PaymentError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 502,
                message: "gateway unavailable".to_string(),
            });
        }
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        Ok(serde_json::json!({
            "id": format!("order_test_{}", requests.len()),
            "entity": "order",
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "status": "created",
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GatewayOrderRequest::inr(32_000, now())).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "amount": 32_000,
                "currency": "INR",
                "receipt": "receipt_1714557600000",
                "payment_capture": 1,
            })
        );
    }

    #[tokio::test]
    async fn test_single_payment_converts_rupees_to_paise() {
        let gateway = FakeGateway::new();

        let order = Payments::new(&gateway)
            .create_single_payment(Decimal::new(19_999, 2), "Hair Serum", now())
            .await
            .unwrap();

        assert_eq!(order["amount"], 19_999);
        assert_eq!(order["id"], "order_test_1");
        assert_eq!(gateway.requests().await[0].amount, 19_999);
    }

    #[tokio::test]
    async fn test_half_paise_rounds_away_from_zero() {
        let gateway = FakeGateway::new();

        Payments::new(&gateway)
            .create_single_payment(Decimal::new(10_005, 3), "Kajal", now())
            .await
            .unwrap();

        assert_eq!(gateway.requests().await[0].amount, 1_001);
    }

    #[tokio::test]
    async fn test_single_payment_validation() {
        let gateway = FakeGateway::new();
        let payments = Payments::new(&gateway);

        assert!(matches!(
            payments.create_single_payment(Decimal::ZERO, "Serum", now()).await,
            Err(PaymentError::InvalidInput(_))
        ));
        assert!(matches!(
            payments
                .create_single_payment(Decimal::from(10), "  ", now())
                .await,
            Err(PaymentError::InvalidInput(_))
        ));
        assert!(gateway.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_cart_payment_uses_cart_pricing() {
        let gateway = FakeGateway::new();
        let items: Vec<CartItem> = serde_json::from_str(
            r#"[{"name": "Shampoo", "price": 120, "quantity": 2}, {"name": "Oil", "price": 80}]"#,
        )
        .unwrap();

        Payments::new(&gateway)
            .create_cart_payment(&items, now())
            .await
            .unwrap();

        assert_eq!(gateway.requests().await[0].amount, 32_000);
    }

    #[tokio::test]
    async fn test_cart_payment_rejects_empty_and_free_carts() {
        let gateway = FakeGateway::new();
        let payments = Payments::new(&gateway);

        assert!(matches!(
            payments.create_cart_payment(&[], now()).await,
            Err(PaymentError::InvalidInput(_))
        ));

        let free: Vec<CartItem> =
            serde_json::from_str(r#"[{"name": "Sample", "price": 0}]"#).unwrap();
        assert!(matches!(
            payments.create_cart_payment(&free, now()).await,
            Err(PaymentError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_cart_payment_total_overflow_is_invalid_input() {
        let gateway = FakeGateway::new();
        let items: Vec<CartItem> = serde_json::from_str(
            r#"[
                {"name": "Gold Facial", "price": "50000000000000000000000000000"},
                {"name": "Gold Facial", "price": "50000000000000000000000000000"}
            ]"#,
        )
        .unwrap();

        assert!(matches!(
            Payments::new(&gateway).create_cart_payment(&items, now()).await,
            Err(PaymentError::InvalidInput(_))
        ));
        assert!(gateway.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_is_reported() {
        let gateway = FakeGateway::new();
        gateway.set_failing(true);

        assert!(matches!(
            Payments::new(&gateway)
                .create_single_payment(Decimal::from(10), "Serum", now())
                .await,
            Err(PaymentError::Api { status: 502, .. })
        ));
    }
}
