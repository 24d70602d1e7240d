//! Order route handlers.
//!
//! Checkout completion (single item and cart), order history, stored invoice
//! download and the confirmation re-send used after a failed confirmation.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use parlour_core::OrderId;

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::models::Order;
use crate::services::Delivery;
use crate::services::orders::{
    CartCheckout, CartItem, ConfirmationError, ConfirmationRequest, CustomerDetails, OrderError,
    SingleItemOrder,
};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Single-item checkout body. `amount` is the line total in rupees.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub quantity: Option<i64>,
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
}

/// Cart checkout body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCartRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
}

/// Confirmation re-send body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendConfirmationRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub booking_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub total_amount: Option<Decimal>,
}

// =============================================================================
// Response Types
// =============================================================================

/// A stored order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedResponse {
    pub message: &'static str,
    pub order_id: OrderId,
}

/// Order history.
#[derive(Debug, Serialize)]
pub struct OrderHistoryResponse {
    pub orders: Vec<Order>,
}

fn all_fields_required() -> AppError {
    AppError::Order(OrderError::InvalidInput("All fields are required".to_string()))
}

/// Turn a reconciliation outcome into the checkout response.
///
/// A stored order whose confirmation failed is still an error for the
/// caller, but one that names the order.
fn placed(outcome: Delivery<Order, ConfirmationError>) -> Result<Json<OrderPlacedResponse>> {
    match outcome {
        Delivery::Delivered(order) => Ok(Json(OrderPlacedResponse {
            message: "Order placed successfully",
            order_id: order.id,
        })),
        Delivery::Undelivered { record, error } => Err(AppError::ConfirmationFailed {
            order_id: record.id,
            source: error,
        }),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/orders/create
#[instrument(skip_all)]
pub async fn create_single(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> Result<Json<OrderPlacedResponse>> {
    let (Some(quantity), Some(amount)) = (body.quantity, body.amount) else {
        return Err(all_fields_required());
    };

    let outcome = state
        .reconciler()
        .create_single_item_order(SingleItemOrder {
            product_id: &body.product_id,
            product_name: &body.product_name,
            quantity,
            amount,
            payment_id: &body.payment_id,
            customer: CustomerDetails {
                name: &body.customer_name,
                email: &body.customer_email,
                phone: &body.customer_phone,
            },
        })
        .await?;

    placed(outcome)
}

/// POST /api/orders/complete-cart
#[instrument(skip_all, fields(items = body.0.cart_items.len()))]
pub async fn complete_cart(
    State(state): State<AppState>,
    body: ApiJson<CompleteCartRequest>,
) -> Result<Json<OrderPlacedResponse>> {
    let ApiJson(body) = body;

    let outcome = state
        .reconciler()
        .create_cart_order(CartCheckout {
            customer: CustomerDetails {
                name: &body.name,
                email: &body.email,
                phone: &body.phone,
            },
            payment_id: &body.payment_id,
            items: &body.cart_items,
        })
        .await?;

    placed(outcome)
}

/// GET /api/orders/history/{email}
#[instrument(skip_all)]
pub async fn history(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<OrderHistoryResponse>> {
    let orders = state.reconciler().fetch_order_history(&email).await?;
    Ok(Json(OrderHistoryResponse { orders }))
}

/// GET /api/orders/invoices/download/{invoice_id}
#[instrument(skip_all)]
pub async fn download_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Response> {
    let pdf = state.reconciler().fetch_stored_invoice(&invoice_id).await?;

    // The id was validated by the store, so it is safe inside the header
    let disposition = format!("attachment; filename=\"grouped_invoice_{invoice_id}.pdf\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

/// POST /api/send-confirmation-email
#[instrument(skip_all)]
pub async fn send_confirmation_email(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SendConfirmationRequest>,
) -> Result<Json<Value>> {
    let (Some(quantity), Some(unit_price), Some(total_amount)) =
        (body.quantity, body.unit_price, body.total_amount)
    else {
        return Err(all_fields_required());
    };

    state
        .reconciler()
        .send_confirmation(ConfirmationRequest {
            invoice_id: &body.booking_id,
            email: &body.email,
            customer_name: &body.customer_name,
            customer_phone: &body.customer_phone,
            product_name: &body.product_name,
            quantity,
            unit_price,
            total_amount,
        })
        .await?;

    Ok(Json(
        json!({ "message": "Confirmation email sent successfully" }),
    ))
}
