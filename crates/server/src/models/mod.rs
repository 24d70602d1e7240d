//! Domain models for the parlour backend.
//!
//! These are validated domain objects; database row types live next to the
//! queries in [`crate::db`].

pub mod appointment;
pub mod order;
pub mod user;

pub use appointment::{Appointment, NewAppointment};
pub use order::{Customer, NewOrder, Order, OrderLine};
pub use user::{NewUser, User};
