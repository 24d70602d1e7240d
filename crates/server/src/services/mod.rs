//! Business logic services.
//!
//! # Services
//!
//! - `appointments` - Slot booking and availability
//! - `orders` - Checkout reconciliation, order history, invoice retrieval
//! - `invoice` - PDF invoice rendering and the grouped invoice directory
//! - `auth` - Registration, login tokens, password reset codes
//! - `email` - Outbound mail (booking, order confirmation, reset code)
//! - `payment` - Razorpay order creation
//! - `chatbot` - Relay to the chatbot service
//!
//! Services borrow their collaborators (stores, notifier, gateway) from
//! [`crate::state::AppState`] for the duration of one request.

pub mod appointments;
pub mod auth;
pub mod chatbot;
pub mod email;
pub mod invoice;
pub mod orders;
pub mod payment;

use email::NotificationError;

/// Outcome of a write followed by a best-effort notification.
///
/// The record is durable in both variants. `Undelivered` means the follow-up
/// (email, invoice file) failed and can be retried out of band.
#[derive(Debug)]
pub enum Delivery<T, E = NotificationError> {
    /// Stored and confirmed.
    Delivered(T),
    /// Stored, but the confirmation did not go out.
    Undelivered { record: T, error: E },
}

impl<T, E> Delivery<T, E> {
    /// The stored record.
    pub const fn record(&self) -> &T {
        match self {
            Self::Delivered(record) | Self::Undelivered { record, .. } => record,
        }
    }

    /// Whether the confirmation went out.
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}
