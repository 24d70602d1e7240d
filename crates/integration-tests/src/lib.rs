//! Integration tests for Parlour.
//!
//! These run against a live `parlour-server` backed by a migrated database,
//! so every test is `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! parlour-cli migrate
//! cargo run -p parlour-server &
//! cargo test -p parlour-integration-tests -- --ignored
//! ```
//!
//! `PARLOUR_BASE_URL` overrides the default `http://localhost:5000`.

use chrono::{Days, NaiveDate};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("PARLOUR_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Absolute URL for an `/api` path.
#[must_use]
pub fn api(path: &str) -> String {
    format!("{}/api{path}", base_url())
}

/// Values that will not collide with earlier runs against the same database.
#[derive(Debug, Clone)]
pub struct Unique {
    pub email: String,
    pub phone: String,
    pub date: String,
    pub payment_id: String,
}

impl Unique {
    #[must_use]
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        let n = id.as_u128();
        let day = u64::try_from(n % 36_500).unwrap_or_default();
        let date = NaiveDate::from_ymd_opt(2100, 1, 1)
            .and_then(|start| start.checked_add_days(Days::new(day)))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "2100-01-01".to_string());

        Self {
            email: format!("it-{}@example.com", id.simple()),
            phone: format!("9{:09}", n % 1_000_000_000),
            date,
            payment_id: format!("pay_it_{}", id.simple()),
        }
    }
}

impl Default for Unique {
    fn default() -> Self {
        Self::new()
    }
}
