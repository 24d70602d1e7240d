//! Parlour server library.
//!
//! Booking, checkout and account backend: appointment slots, order
//! reconciliation with PDF invoices, password accounts with session tokens,
//! and the payment gateway and chatbot relays. Exposed as a library so the
//! router can be driven in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
