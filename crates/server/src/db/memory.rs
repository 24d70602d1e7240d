//! In-memory implementation of the store traits for tests.
//!
//! Enforces the same unique constraints as the SQL schema and reports them
//! with the same constraint names, so services behave identically on top of
//! it.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use parlour_core::{AppointmentId, Email, OrderId, Phone, UserId};

use super::{AppointmentStore, HealthCheck, OrderStore, RepositoryError, UserStore};
use crate::models::{Appointment, NewAppointment, NewOrder, NewUser, Order, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    appointments: Vec<Appointment>,
    orders: Vec<Order>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store. Every write fails while [`MemoryStore::set_unavailable`]
/// is on, which is how tests simulate a database outage.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of orders stored so far.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Number of appointments stored so far.
    pub async fn appointment_count(&self) -> usize {
        self.tables.lock().await.appointments.len()
    }

    /// Force a user's reset code expiry, for exercising the expiry path.
    pub async fn expire_reset_code(&self, email: &Email, at: DateTime<Utc>) {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter_mut().find(|u| &u.email == email) {
            user.reset_code_expires_at = Some(at);
        }
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("users_email_key".to_owned()));
        }
        if tables.users.iter().any(|u| u.phone == user.phone) {
            return Err(RepositoryError::Conflict("users_phone_key".to_owned()));
        }

        let stored = User {
            id: UserId::new(tables.next_id()),
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            reset_code: None,
            reset_code_expires_at: None,
            created_at: Utc::now(),
        };
        tables.users.push(stored.clone());
        Ok(stored)
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn find_user_by_email_or_phone(
        &self,
        email: &Email,
        phone: &Phone,
    ) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| &u.email == email || &u.phone == phone)
            .cloned())
    }

    async fn set_reset_code(
        &self,
        id: UserId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        user.reset_code = Some(code.to_owned());
        user.reset_code_expires_at = Some(expires_at);
        Ok(())
    }

    async fn replace_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut user.password_hash);
        user.reset_code = None;
        user.reset_code_expires_at = None;
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn find_appointment_by_slot(
        &self,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Option<Appointment>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .appointments
            .iter()
            .find(|a| a.date == date && a.time_slot == time_slot)
            .cloned())
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;

        if tables
            .appointments
            .iter()
            .any(|a| a.date == appointment.date && a.time_slot == appointment.time_slot)
        {
            return Err(RepositoryError::Conflict("appointments_slot_key".to_owned()));
        }

        let stored = Appointment {
            id: AppointmentId::new(tables.next_id()),
            name: appointment.name,
            phone: appointment.phone,
            email: appointment.email,
            date: appointment.date,
            service: appointment.service,
            time_slot: appointment.time_slot,
            created_at: Utc::now(),
        };
        tables.appointments.push(stored.clone());
        Ok(stored)
    }

    async fn list_appointments_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .appointments
            .iter()
            .filter(|a| a.date == date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.check_available()?;
        let amount = order.amount;
        let mut tables = self.tables.lock().await;
        if tables.orders.iter().any(|o| o.payment_id == order.payment_id) {
            return Err(RepositoryError::Conflict("orders_payment_id_key".to_owned()));
        }

        let stored = Order {
            id: OrderId::new(tables.next_id()),
            products: order.products,
            amount,
            payment_id: order.payment_id,
            customer_name: order.customer.name,
            customer_email: order.customer.email,
            customer_phone: order.customer.phone,
            source: order.source,
            created_at: Utc::now(),
        };
        tables.orders.push(stored.clone());
        Ok(stored)
    }

    async fn list_orders_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| &o.customer_email == email)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i32().cmp(&a.id.as_i32()))
        });
        Ok(orders)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            phone: Phone::parse(phone).unwrap(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_user_enforces_unique_email_and_phone() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@x.com", "555")).await.unwrap();

        let err = store.insert_user(new_user("A@X.com", "999")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref c) if c == "users_email_key"));

        let err = store.insert_user(new_user("b@x.com", "555")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref c) if c == "users_phone_key"));
    }

    fn new_order(payment_id: &str) -> NewOrder {
        NewOrder {
            products: Vec::new(),
            amount: rust_decimal::Decimal::from(320),
            payment_id: payment_id.to_string(),
            customer: crate::models::Customer {
                name: "Priya".to_string(),
                email: Email::parse("priya@example.com").unwrap(),
                phone: Phone::parse("9876543210").unwrap(),
            },
            source: parlour_core::OrderSource::Cart,
        }
    }

    #[tokio::test]
    async fn test_insert_order_enforces_unique_payment_id() {
        let store = MemoryStore::new();
        store.insert_order(new_order("pay_1")).await.unwrap();

        let err = store.insert_order(new_order("pay_1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref c) if c == "orders_payment_id_key"));

        store.insert_order(new_order("pay_2")).await.unwrap();
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_replace_password_clears_reset_code() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("a@x.com", "555")).await.unwrap();
        store
            .set_reset_code(user.id, "123456", Utc::now())
            .await
            .unwrap();

        store.replace_password(user.id, "new-hash").await.unwrap();

        let user = store.find_user_by_email(&user.email).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new-hash");
        assert!(user.reset_code.is_none());
        assert!(user.reset_code_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_writes() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(!store.ping().await);
        assert!(matches!(
            store.insert_user(new_user("a@x.com", "555")).await,
            Err(RepositoryError::Database(_))
        ));
    }
}
