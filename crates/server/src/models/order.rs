//! Order domain types.
//!
//! An order is written once per confirmed payment and never modified. Its
//! `amount` is always the sum of the line totals, and every line total is
//! `unit_price * quantity` (single-item orders derive the unit price from the
//! line total instead, see [`crate::services::orders`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use parlour_core::{Email, OrderId, OrderSource, Phone};

/// Who paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub name: String,
    pub email: Email,
    pub phone: Phone,
}

/// One product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Catalogue id, when the client sent one.
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// A persisted order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub products: Vec<OrderLine>,
    pub amount: Decimal,
    pub payment_id: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: Phone,
    pub source: OrderSource,
    /// Creation time; history is sorted on this, newest first.
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
}

/// An order ready to persist.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub products: Vec<OrderLine>,
    /// Sum of the line totals, checked for overflow when the lines are priced.
    pub amount: Decimal,
    pub payment_id: String,
    pub customer: Customer,
    pub source: OrderSource,
}
