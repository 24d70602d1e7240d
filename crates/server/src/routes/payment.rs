//! Payment route handlers.
//!
//! Both endpoints answer `{success: true, order}` with the gateway's order
//! descriptor passed through unchanged.

use axum::{Json, extract::State};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::services::orders::CartItem;
use crate::services::payment::PaymentError;
use crate::state::AppState;

/// Single-product payment body. `amount` is in rupees.
#[derive(Debug, Deserialize)]
pub struct SinglePaymentRequest {
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub name: String,
}

/// Cart payment body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPaymentRequest {
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
}

/// A created gateway order.
#[derive(Debug, Serialize)]
pub struct PaymentOrderResponse {
    pub success: bool,
    pub order: serde_json::Value,
}

/// POST /api/payment
#[instrument(skip_all)]
pub async fn create_single(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SinglePaymentRequest>,
) -> Result<Json<PaymentOrderResponse>> {
    let amount = body
        .amount
        .ok_or_else(|| AppError::Payment(PaymentError::InvalidInput("Invalid amount.".into())))?;

    let order = state
        .payments()
        .create_single_payment(amount, &body.name, Utc::now())
        .await?;

    Ok(Json(PaymentOrderResponse {
        success: true,
        order,
    }))
}

/// POST /api/payment/create-order
#[instrument(skip_all)]
pub async fn create_cart(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CartPaymentRequest>,
) -> Result<Json<PaymentOrderResponse>> {
    let order = state
        .payments()
        .create_cart_payment(&body.cart_items, Utc::now())
        .await?;

    Ok(Json(PaymentOrderResponse {
        success: true,
        order,
    }))
}
