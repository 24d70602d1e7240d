//! Parlour Core - Shared types library.
//!
//! This crate provides common types used across all Parlour components:
//! - `server` - Booking, checkout and account HTTP backend
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phones and order sources

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
