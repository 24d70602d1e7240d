//! Database access for the parlour backend.
//!
//! # Tables
//!
//! - `users` - Customer accounts and outstanding password reset codes
//! - `appointments` - Booked slots, unique on `(date, time_slot)`
//! - `orders` - One row per confirmed payment
//! - `order_items` - Product lines of an order, in checkout order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p parlour-cli -- migrate
//! ```
//!
//! Services never see a `PgPool`; they talk to the store traits below so the
//! same code runs against [`PgStore`] in production and an in-memory store in
//! tests.

mod appointments;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
mod orders;
mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use parlour_core::{Email, Phone, UserId};

use crate::models::{Appointment, NewAppointment, NewOrder, NewUser, Order, User};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Store Traits
// =============================================================================

/// Persistence for customer accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or phone is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Find a user by (normalised) email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Find any user holding either the email or the phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_user_by_email_or_phone(
        &self,
        email: &Email,
        phone: &Phone,
    ) -> Result<Option<User>, RepositoryError>;

    /// Store a password reset code and its expiry, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn set_reset_code(
        &self,
        id: UserId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Replace the password hash and clear the reset code and its expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn replace_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;
}

/// Persistence for booked slots.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Find the appointment occupying a slot, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_appointment_by_slot(
        &self,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Option<Appointment>, RepositoryError>;

    /// Insert an appointment. The slot uniqueness is enforced here, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slot is already booked.
    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError>;

    /// All appointments on a date, earliest created first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn list_appointments_on(&self, date: NaiveDate)
    -> Result<Vec<Appointment>, RepositoryError>;
}

/// Persistence for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order and all of its lines as one unit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an order already exists for the
    /// payment id, and `RepositoryError::Database` if any write fails; nothing
    /// is kept in either case.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Orders placed with an email, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn list_orders_by_email(&self, email: &Email) -> Result<Vec<Order>, RepositoryError>;
}

/// Liveness check for the backing store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Returns `true` when the store answers a trivial query.
    async fn ping(&self) -> bool;
}

/// The set of stores handed to services.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub orders: Arc<dyn OrderStore>,
    pub health: Arc<dyn HealthCheck>,
}

impl Stores {
    /// Use one backend for every store.
    #[must_use]
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + AppointmentStore + OrderStore + HealthCheck + 'static,
    {
        Self {
            users: backend.clone(),
            appointments: backend.clone(),
            orders: backend.clone(),
            health: backend,
        }
    }
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// `PostgreSQL`-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Map a unique violation to `Conflict`, naming the constraint that fired.
fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or("unique").to_owned();
        return RepositoryError::Conflict(constraint);
    }
    RepositoryError::Database(e)
}

fn parse_email_column(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

fn parse_phone_column(raw: &str) -> Result<Phone, RepositoryError> {
    Phone::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid phone in database: {e}")))
}
