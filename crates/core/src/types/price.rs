//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are held in the currency's main unit (rupees) as a [`Decimal`] so
//! line totals and order sums stay exact. The payment gateway wants integer
//! minor units (paise); [`Price::to_minor_units`] is the single place that
//! conversion happens.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a rupee price.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Convert to the smallest currency unit, rounding half away from zero.
    ///
    /// Returns `None` if the result does not fit in an `i64`.
    ///
    /// ```
    /// use parlour_core::Price;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Price::inr(Decimal::new(12_345, 2)).to_minor_units(), Some(12_345));
    /// assert_eq!(Price::inr(Decimal::new(1_005, 3)).to_minor_units(), Some(101));
    /// ```
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        let scaled = self
            .amount
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64()
    }
}

impl fmt::Display for Price {
    /// Formats as symbol + two decimals, e.g. `₹240.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{}{:.2}", self.currency_code.symbol(), rounded)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }

    /// ISO code as sent to the payment gateway.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_two_decimals() {
        assert_eq!(Price::inr(Decimal::from(120)).to_string(), "₹120.00");
        assert_eq!(Price::inr(Decimal::new(805, 1)).to_string(), "₹80.50");
    }

    #[test]
    fn test_display_rounds_long_fractions() {
        // 100 / 3
        let third = Decimal::from(100) / Decimal::from(3);
        assert_eq!(Price::inr(third).to_string(), "₹33.33");
        assert_eq!(Price::inr(Decimal::new(2_005, 3)).to_string(), "₹2.01");
    }

    #[test]
    fn test_to_minor_units_rounds_half_away_from_zero() {
        assert_eq!(Price::inr(Decimal::from(320)).to_minor_units(), Some(32_000));
        assert_eq!(Price::inr(Decimal::new(9_995, 4)).to_minor_units(), Some(100));
        assert_eq!(Price::inr(Decimal::new(1_004, 3)).to_minor_units(), Some(100));
    }

    #[test]
    fn test_to_minor_units_overflow() {
        assert_eq!(Price::inr(Decimal::MAX).to_minor_units(), None);
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(CurrencyCode::default().code(), "INR");
        assert_eq!(CurrencyCode::USD.symbol(), "$");
    }
}
