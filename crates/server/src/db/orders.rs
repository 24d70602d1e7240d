//! Order queries.
//!
//! Line items live in `order_items`, keyed by `(order_id, position)` so the
//! checkout order of products survives a round trip.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use parlour_core::{Email, OrderId, OrderSource};

use super::{
    OrderStore, PgStore, RepositoryError, map_unique_violation, parse_email_column,
    parse_phone_column,
};
use crate::models::{NewOrder, Order, OrderLine};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    amount: Decimal,
    payment_id: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    source: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: Option<String>,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
}

impl From<OrderItemRow> for OrderLine {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

impl OrderRow {
    fn into_order(self, products: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let source = self
            .source
            .parse::<OrderSource>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Order {
            id: OrderId::new(self.id),
            products,
            amount: self.amount,
            payment_id: self.payment_id,
            customer_name: self.customer_name,
            customer_email: parse_email_column(&self.customer_email)?,
            customer_phone: parse_phone_column(&self.customer_phone)?,
            source,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let amount = order.amount;
        let mut tx = self.pool().begin().await?;

        let row: OrderRow = sqlx::query_as(
            r"
            INSERT INTO orders (amount, payment_id, customer_name, customer_email, customer_phone, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, amount, payment_id, customer_name, customer_email, customer_phone,
                      source, created_at
            ",
        )
        .bind(amount)
        .bind(&order.payment_id)
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.customer.phone)
        .bind(order.source.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        for (position, line) in order.products.iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| {
                RepositoryError::DataCorruption("order has too many lines".to_owned())
            })?;

            sqlx::query(
                r"
                INSERT INTO order_items
                    (order_id, position, product_id, product_name, quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(row.id)
            .bind(position)
            .bind(line.product_id.as_deref())
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.into_order(order.products)
    }

    async fn list_orders_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, amount, payment_id, customer_name, customer_email, customer_phone,
                   source, created_at
            FROM orders
            WHERE customer_email = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(email)
        .fetch_all(self.pool())
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let items: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT order_id, product_id, product_name, quantity, unit_price, total_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut lines: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for item in items {
            lines.entry(item.order_id).or_default().push(item.into());
        }

        rows.into_iter()
            .map(|row| {
                let products = lines.remove(&row.id).unwrap_or_default();
                row.into_order(products)
            })
            .collect()
    }
}
