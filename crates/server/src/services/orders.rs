//! Order reconciliation.
//!
//! Both checkout flows (a single "buy now" item, or a whole cart) end in the
//! same two phases:
//!
//! 1. Persist the order. If this fails nothing else happens.
//! 2. Render the invoice, keep it on disk for cart orders, and email it.
//!    Failures here never undo phase 1; they come back as
//!    [`Delivery::Undelivered`] so the caller can report the degraded outcome
//!    and retry the confirmation out of band.
//!
//! The invoice id of an order is its payment id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use parlour_core::{Email, OrderSource, Phone, Price};

use super::Delivery;
use super::invoice::{self, InvoiceDocument, InvoiceStore, InvoiceStoreError, store::is_valid_invoice_id};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{Customer, NewOrder, Order, OrderLine};
use crate::services::email::{self, NotificationError, Notifier, OrderConfirmation};

/// Errors from placing or reading orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No such order or invoice.
    #[error("not found")]
    NotFound,

    /// An order was already recorded for this payment.
    #[error("order already recorded for this payment")]
    DuplicatePayment,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invoice directory error.
    #[error("invoice storage error: {0}")]
    InvoiceStorage(InvoiceStoreError),

    /// Confirmation could not be sent.
    #[error("notification error: {0}")]
    Notification(#[from] NotificationError),
}

impl From<InvoiceStoreError> for OrderError {
    fn from(e: InvoiceStoreError) -> Self {
        match e {
            InvoiceStoreError::NotFound => Self::NotFound,
            InvoiceStoreError::InvalidId => Self::InvalidInput("invalid invoice id".to_string()),
            other => Self::InvoiceStorage(other),
        }
    }
}

/// Why a stored order's confirmation did not go out.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// The grouped invoice could not be written.
    #[error("invoice not saved: {0}")]
    InvoiceStorage(#[from] InvoiceStoreError),

    /// The confirmation email failed.
    #[error("confirmation not sent: {0}")]
    Notification(#[from] NotificationError),
}

/// Contact details as submitted at checkout.
#[derive(Debug, Clone, Copy)]
pub struct CustomerDetails<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
}

impl CustomerDetails<'_> {
    fn validate(self) -> Result<Customer, OrderError> {
        Ok(Customer {
            name: required(self.name, "customer name")?.to_string(),
            email: Email::parse(self.email).map_err(|e| OrderError::InvalidInput(e.to_string()))?,
            phone: Phone::parse(self.phone).map_err(|e| OrderError::InvalidInput(e.to_string()))?,
        })
    }
}

/// A "buy now" checkout of one product.
///
/// `amount` is the line total that was charged, not the unit price.
#[derive(Debug, Clone, Copy)]
pub struct SingleItemOrder<'a> {
    pub product_id: &'a str,
    pub product_name: &'a str,
    pub quantity: i64,
    pub amount: Decimal,
    pub payment_id: &'a str,
    pub customer: CustomerDetails<'a>,
}

/// One entry of a cart as sent by the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    #[serde(default, deserialize_with = "deserialize_item_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    /// Absent means one.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Cart ids arrive as strings or numbers depending on the catalogue.
fn deserialize_item_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.and_then(|raw| {
        let id = match raw {
            RawId::Text(s) => s.trim().to_string(),
            RawId::Number(n) => n.to_string(),
        };
        (!id.is_empty()).then_some(id)
    }))
}

/// A whole-cart checkout.
#[derive(Debug, Clone, Copy)]
pub struct CartCheckout<'a> {
    pub customer: CustomerDetails<'a>,
    pub payment_id: &'a str,
    pub items: &'a [CartItem],
}

/// An out-of-band request to (re)send a single-item confirmation.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationRequest<'a> {
    /// Invoice id printed on the document; the payment or booking id.
    pub invoice_id: &'a str,
    pub email: &'a str,
    pub customer_name: &'a str,
    pub customer_phone: &'a str,
    pub product_name: &'a str,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
}

/// Turns confirmed payments into orders, invoices and confirmation emails.
pub struct Reconciler<'a> {
    orders: &'a dyn OrderStore,
    notifier: &'a dyn Notifier,
    invoices: &'a InvoiceStore,
    business_name: &'a str,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler.
    #[must_use]
    pub const fn new(
        orders: &'a dyn OrderStore,
        notifier: &'a dyn Notifier,
        invoices: &'a InvoiceStore,
        business_name: &'a str,
    ) -> Self {
        Self {
            orders,
            notifier,
            invoices,
            business_name,
        }
    }

    /// Record a single-item order and email its invoice.
    ///
    /// The unit price is derived as `amount / quantity`; the order amount is
    /// exactly `amount`. The invoice is not kept on disk.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidInput` for missing fields, a quantity below
    /// one or a non-positive amount, and `OrderError::Repository` if the order
    /// cannot be stored.
    pub async fn create_single_item_order(
        &self,
        order: SingleItemOrder<'_>,
    ) -> Result<Delivery<Order, ConfirmationError>, OrderError> {
        let product_id = required(order.product_id, "productId")?;
        let product_name = required(order.product_name, "productName")?;
        let quantity = quantity(Some(order.quantity))?;
        if order.amount <= Decimal::ZERO {
            return Err(OrderError::InvalidInput("amount must be positive".to_string()));
        }
        let payment_id = payment_id(order.payment_id)?;
        let customer = order.customer.validate()?;

        let line = OrderLine {
            product_id: Some(product_id.to_string()),
            product_name: product_name.to_string(),
            quantity,
            unit_price: order.amount / Decimal::from(quantity),
            total_price: order.amount,
        };

        self.place(
            NewOrder {
                products: vec![line],
                amount: order.amount,
                payment_id: payment_id.to_string(),
                customer,
                source: OrderSource::Single,
            },
            false,
        )
        .await
    }

    /// Record a cart order, keep its grouped invoice and email it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidInput` for an empty cart, a bad item or
    /// missing customer fields, and `OrderError::Repository` if the order
    /// cannot be stored.
    pub async fn create_cart_order(
        &self,
        checkout: CartCheckout<'_>,
    ) -> Result<Delivery<Order, ConfirmationError>, OrderError> {
        let customer = checkout.customer.validate()?;
        let payment_id = payment_id(checkout.payment_id)?;
        let cart = price_cart(checkout.items)?;

        self.place(
            NewOrder {
                products: cart.lines,
                amount: cart.total,
                payment_id: payment_id.to_string(),
                customer,
                source: OrderSource::Cart,
            },
            true,
        )
        .await
    }

    async fn place(
        &self,
        new: NewOrder,
        keep_invoice: bool,
    ) -> Result<Delivery<Order, ConfirmationError>, OrderError> {
        let order = self
            .orders
            .insert_order(new)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::DuplicatePayment,
                other => OrderError::Repository(other),
            })?;
        tracing::info!(
            order_id = %order.id,
            payment_id = %order.payment_id,
            source = %order.source,
            amount = %order.amount,
            "Order stored"
        );

        Ok(match self.confirm(&order, keep_invoice).await {
            Ok(()) => Delivery::Delivered(order),
            Err(error) => {
                tracing::error!(
                    order_id = %order.id,
                    to = %order.customer_email,
                    error = %error,
                    "Payment succeeded but confirmation failed"
                );
                Delivery::Undelivered {
                    record: order,
                    error,
                }
            }
        })
    }

    async fn confirm(&self, order: &Order, keep_invoice: bool) -> Result<(), ConfirmationError> {
        let customer = Customer {
            name: order.customer_name.clone(),
            email: order.customer_email.clone(),
            phone: order.customer_phone.clone(),
        };
        let pdf = self.render(
            &order.payment_id,
            order.created_at,
            &customer,
            &order.products,
            order.amount,
        );

        if keep_invoice {
            self.invoices.save(&order.payment_id, &pdf).await?;
        }

        self.send_invoice(&customer, &order.payment_id, order.amount, pdf)
            .await?;
        Ok(())
    }

    fn render(
        &self,
        invoice_id: &str,
        issued_at: DateTime<Utc>,
        customer: &Customer,
        products: &[OrderLine],
        total_amount: Decimal,
    ) -> Vec<u8> {
        invoice::render(&InvoiceDocument {
            business_name: self.business_name,
            invoice_id,
            issued_at,
            customer,
            products,
            total_amount,
        })
    }

    async fn send_invoice(
        &self,
        customer: &Customer,
        invoice_id: &str,
        total: Decimal,
        pdf: Vec<u8>,
    ) -> Result<(), NotificationError> {
        let message = email::order_confirmation(
            &OrderConfirmation {
                business_name: self.business_name,
                to: &customer.email,
                customer_name: &customer.name,
                customer_phone: customer.phone.as_str(),
                invoice_id,
                total: Price::inr(total),
            },
            pdf,
        )?;
        self.notifier.send(message).await
    }

    /// Re-send a single-item confirmation with a freshly rendered invoice.
    ///
    /// The line total is recomputed as `unit_price * quantity`; the invoice
    /// total is `total_amount` as given.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidInput` for missing or non-positive fields
    /// and `OrderError::Notification` if the email fails.
    pub async fn send_confirmation(&self, request: ConfirmationRequest<'_>) -> Result<(), OrderError> {
        let invoice_id = payment_id(request.invoice_id)?;
        let product_name = required(request.product_name, "productName")?;
        let quantity = quantity(Some(request.quantity))?;
        if request.unit_price <= Decimal::ZERO || request.total_amount <= Decimal::ZERO {
            return Err(OrderError::InvalidInput(
                "unitPrice and totalAmount must be positive".to_string(),
            ));
        }
        let customer = CustomerDetails {
            name: request.customer_name,
            email: request.email,
            phone: request.customer_phone,
        }
        .validate()?;

        let line = OrderLine {
            product_id: None,
            product_name: product_name.to_string(),
            quantity,
            unit_price: request.unit_price,
            total_price: line_total(request.unit_price, quantity)?,
        };
        let pdf = self.render(
            invoice_id,
            Utc::now(),
            &customer,
            std::slice::from_ref(&line),
            request.total_amount,
        );

        self.send_invoice(&customer, invoice_id, request.total_amount, pdf)
            .await?;
        tracing::info!(invoice_id = %invoice_id, "Confirmation re-sent");
        Ok(())
    }

    /// Orders placed with an email, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidInput` if the email is empty or malformed.
    pub async fn fetch_order_history(&self, email: &str) -> Result<Vec<Order>, OrderError> {
        let email = Email::parse(email).map_err(|e| OrderError::InvalidInput(e.to_string()))?;
        Ok(self.orders.list_orders_by_email(&email).await?)
    }

    /// Bytes of a stored grouped invoice.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no invoice is stored under this id.
    pub async fn fetch_stored_invoice(&self, invoice_id: &str) -> Result<Vec<u8>, OrderError> {
        Ok(self.invoices.load(invoice_id).await?)
    }
}

/// A priced cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<OrderLine>,
    /// Sum of the line totals.
    pub total: Decimal,
}

/// Price every cart line: quantity defaults to one, line total is
/// `price * quantity`, and the cart total is the sum of the line totals.
///
/// # Errors
///
/// Returns `OrderError::InvalidInput` for an empty cart, an unnamed item, a
/// negative price, an explicit quantity below one, or a line or cart total
/// too large to represent.
pub fn price_cart(items: &[CartItem]) -> Result<PricedCart, OrderError> {
    if items.is_empty() {
        return Err(OrderError::InvalidInput("cart is empty".to_string()));
    }

    let lines = items
        .iter()
        .map(|item| {
            let name = required(&item.name, "item name")?;
            if item.price < Decimal::ZERO {
                return Err(OrderError::InvalidInput(format!(
                    "price of {name} cannot be negative"
                )));
            }
            let quantity = quantity(item.quantity)?;
            Ok(OrderLine {
                product_id: item.id.clone(),
                product_name: name.to_string(),
                quantity,
                unit_price: item.price,
                total_price: line_total(item.price, quantity)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total = lines
        .iter()
        .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.total_price))
        .ok_or_else(|| OrderError::InvalidInput("cart total too large".to_string()))?;

    Ok(PricedCart { lines, total })
}

fn line_total(price: Decimal, quantity: i32) -> Result<Decimal, OrderError> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| OrderError::InvalidInput("line total too large".to_string()))
}

fn quantity(quantity: Option<i64>) -> Result<i32, OrderError> {
    match quantity {
        None => Ok(1),
        Some(q) if q >= 1 => i32::try_from(q)
            .map_err(|_| OrderError::InvalidInput("quantity too large".to_string())),
        Some(_) => Err(OrderError::InvalidInput(
            "quantity must be at least 1".to_string(),
        )),
    }
}

fn required<'s>(value: &'s str, field: &str) -> Result<&'s str, OrderError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(OrderError::InvalidInput(format!("{field} is required")));
    }
    Ok(value)
}

fn payment_id(value: &str) -> Result<&str, OrderError> {
    let value = required(value, "paymentId")?;
    if !is_valid_invoice_id(value) {
        return Err(OrderError::InvalidInput(
            "paymentId may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::services::email::RecordingNotifier;

    struct Fixture {
        store: MemoryStore,
        notifier: RecordingNotifier,
        invoices: InvoiceStore,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                store: MemoryStore::new(),
                notifier: RecordingNotifier::new(),
                invoices: InvoiceStore::new(dir.path().join("invoices")),
                _dir: dir,
            }
        }

        fn reconciler(&self) -> Reconciler<'_> {
            Reconciler::new(&self.store, &self.notifier, &self.invoices, "Rohini Beauty Parlour")
        }
    }

    fn customer() -> CustomerDetails<'static> {
        CustomerDetails {
            name: "Priya",
            email: " Priya@Example.com ",
            phone: "9876543210",
        }
    }

    fn cart() -> Vec<CartItem> {
        serde_json::from_str(
            r#"[
                {"id": 1, "name": "Shampoo", "price": 120, "quantity": 2},
                {"name": "Oil", "price": 80}
            ]"#,
        )
        .unwrap()
    }

    fn single(quantity: i64, amount: i64) -> SingleItemOrder<'static> {
        SingleItemOrder {
            product_id: "p-1",
            product_name: "Hair Serum",
            quantity,
            amount: Decimal::from(amount),
            payment_id: "pay_single",
            customer: customer(),
        }
    }

    #[test]
    fn test_cart_items_accept_numeric_and_string_ids() {
        let items = cart();
        assert_eq!(items[0].id.as_deref(), Some("1"));
        assert_eq!(items[1].id, None);
        assert_eq!(items[1].quantity, None);

        let items: Vec<CartItem> =
            serde_json::from_str(r#"[{"id": "sku-9", "name": "Kajal", "price": "45.50"}]"#).unwrap();
        assert_eq!(items[0].id.as_deref(), Some("sku-9"));
        assert_eq!(items[0].price, Decimal::new(4550, 2));
    }

    #[test]
    fn test_price_cart_defaults_quantity_to_one() {
        let priced = price_cart(&cart()).unwrap();

        assert_eq!(priced.lines[0].total_price, Decimal::from(240));
        assert_eq!(priced.lines[1].quantity, 1);
        assert_eq!(priced.lines[1].total_price, Decimal::from(80));
        assert_eq!(priced.total, Decimal::from(320));
    }

    fn huge_cart() -> Vec<CartItem> {
        serde_json::from_str(
            r#"[
                {"name": "Gold Facial", "price": "50000000000000000000000000000"},
                {"name": "Gold Facial", "price": "50000000000000000000000000000"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_price_cart_rejects_total_overflow() {
        let items = huge_cart();
        assert!(price_cart(&items[..1]).is_ok());
        assert!(matches!(price_cart(&items), Err(OrderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_cart_order_total_overflow_is_invalid_input() {
        let f = Fixture::new();
        let items = huge_cart();

        let result = f
            .reconciler()
            .create_cart_order(CartCheckout {
                customer: customer(),
                payment_id: "pay_huge",
                items: &items,
            })
            .await;

        assert!(matches!(result, Err(OrderError::InvalidInput(_))));
        assert_eq!(f.store.order_count().await, 0);
    }

    #[test]
    fn test_price_cart_rejects_bad_items() {
        assert!(matches!(price_cart(&[]), Err(OrderError::InvalidInput(_))));

        let zero_qty: Vec<CartItem> =
            serde_json::from_str(r#"[{"name": "Oil", "price": 80, "quantity": 0}]"#).unwrap();
        assert!(matches!(price_cart(&zero_qty), Err(OrderError::InvalidInput(_))));

        let negative: Vec<CartItem> =
            serde_json::from_str(r#"[{"name": "Oil", "price": -1}]"#).unwrap();
        assert!(matches!(price_cart(&negative), Err(OrderError::InvalidInput(_))));

        let unnamed: Vec<CartItem> = serde_json::from_str(r#"[{"price": 10}]"#).unwrap();
        assert!(matches!(price_cart(&unnamed), Err(OrderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_cart_order_totals_and_invoice() {
        let f = Fixture::new();
        let items = cart();

        let outcome = f
            .reconciler()
            .create_cart_order(CartCheckout {
                customer: customer(),
                payment_id: "pay_cart1",
                items: &items,
            })
            .await
            .unwrap();

        assert!(outcome.is_delivered());
        let order = outcome.record();
        assert_eq!(order.amount, Decimal::from(320));
        assert_eq!(order.products[1].quantity, 1);
        assert_eq!(order.source, OrderSource::Cart);
        assert_eq!(order.customer_email.as_str(), "priya@example.com");

        let stored = f.reconciler().fetch_stored_invoice("pay_cart1").await.unwrap();
        assert!(stored.starts_with(b"%PDF-1.4"));

        let sent = f.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "Invoice_pay_cart1.pdf");
        assert_eq!(attachment.bytes, stored);
    }

    #[tokio::test]
    async fn test_second_order_for_a_payment_is_rejected() {
        let f = Fixture::new();
        let items = cart();
        let checkout = || CartCheckout {
            customer: customer(),
            payment_id: "pay_dup",
            items: &items,
        };

        f.reconciler().create_cart_order(checkout()).await.unwrap();
        let first_invoice = f.reconciler().fetch_stored_invoice("pay_dup").await.unwrap();

        let again = f.reconciler().create_cart_order(checkout()).await;
        assert!(matches!(again, Err(OrderError::DuplicatePayment)));
        assert_eq!(f.store.order_count().await, 1);
        assert_eq!(f.notifier.sent().await.len(), 1);
        assert_eq!(
            f.reconciler().fetch_stored_invoice("pay_dup").await.unwrap(),
            first_invoice
        );
    }

    #[tokio::test]
    async fn test_single_item_order_derives_unit_price() {
        let f = Fixture::new();

        let outcome = f
            .reconciler()
            .create_single_item_order(single(3, 100))
            .await
            .unwrap();

        let order = outcome.record();
        assert_eq!(order.amount, Decimal::from(100));
        let line = &order.products[0];
        assert_eq!(line.total_price, Decimal::from(100));
        assert_eq!(line.quantity, 3);
        let recomputed = line.unit_price * Decimal::from(3);
        assert!((recomputed - Decimal::from(100)).abs() < Decimal::new(1, 20));
        assert_eq!(order.source, OrderSource::Single);

        // Single-item invoices are emailed but not kept
        assert!(matches!(
            f.reconciler().fetch_stored_invoice("pay_single").await,
            Err(OrderError::NotFound)
        ));
        assert_eq!(f.notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_single_item_order_validation() {
        let f = Fixture::new();
        let r = f.reconciler();

        assert!(matches!(
            r.create_single_item_order(single(0, 100)).await,
            Err(OrderError::InvalidInput(_))
        ));
        assert!(matches!(
            r.create_single_item_order(single(1, 0)).await,
            Err(OrderError::InvalidInput(_))
        ));
        let mut missing = single(1, 100);
        missing.product_id = "";
        assert!(matches!(
            r.create_single_item_order(missing).await,
            Err(OrderError::InvalidInput(_))
        ));
        let mut bad_payment = single(1, 100);
        bad_payment.payment_id = "../pay";
        assert!(matches!(
            r.create_single_item_order(bad_payment).await,
            Err(OrderError::InvalidInput(_))
        ));
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_sends_nothing() {
        let f = Fixture::new();
        f.store.set_unavailable(true);
        let items = cart();

        let result = f
            .reconciler()
            .create_cart_order(CartCheckout {
                customer: customer(),
                payment_id: "pay_cart1",
                items: &items,
            })
            .await;

        assert!(matches!(result, Err(OrderError::Repository(_))));
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_order() {
        let f = Fixture::new();
        f.notifier.set_failing(true);
        let items = cart();

        let outcome = f
            .reconciler()
            .create_cart_order(CartCheckout {
                customer: customer(),
                payment_id: "pay_cart1",
                items: &items,
            })
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Delivery::Undelivered {
                error: ConfirmationError::Notification(_),
                ..
            }
        ));
        assert_eq!(f.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_order_history_is_newest_first() {
        let f = Fixture::new();
        let r = f.reconciler();
        r.create_single_item_order(single(1, 50)).await.unwrap();
        let items = cart();
        r.create_cart_order(CartCheckout {
            customer: customer(),
            payment_id: "pay_cart1",
            items: &items,
        })
        .await
        .unwrap();

        let history = r.fetch_order_history("PRIYA@example.com").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source, OrderSource::Cart);
        assert_eq!(history[1].source, OrderSource::Single);

        assert!(r.fetch_order_history("other@example.com").await.unwrap().is_empty());
        assert!(matches!(
            r.fetch_order_history("").await,
            Err(OrderError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_send_confirmation_recomputes_line_total() {
        let f = Fixture::new();

        f.reconciler()
            .send_confirmation(ConfirmationRequest {
                invoice_id: "pay_retry",
                email: "priya@example.com",
                customer_name: "Priya",
                customer_phone: "9876543210",
                product_name: "Hair Serum",
                quantity: 2,
                unit_price: Decimal::from(150),
                total_amount: Decimal::from(300),
            })
            .await
            .unwrap();

        let sent = f.notifier.sent().await;
        let pdf = &sent[0].attachment.as_ref().unwrap().bytes;
        let needle = b"(Rs.300.00) Tj";
        assert!(pdf.windows(needle.len()).any(|w| w == needle));
    }

    #[tokio::test]
    async fn test_fetch_stored_invoice_rejects_unsafe_ids() {
        let f = Fixture::new();
        assert!(matches!(
            f.reconciler().fetch_stored_invoice("../../etc/passwd").await,
            Err(OrderError::InvalidInput(_))
        ));
    }
}
