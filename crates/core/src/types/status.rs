//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Which checkout flow produced an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// "Buy now" on a single product.
    Single,
    /// Checkout of a whole cart.
    Cart,
}

impl OrderSource {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Cart => "cart",
        }
    }
}

impl std::fmt::Display for OrderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "cart" => Ok(Self::Cart),
            _ => Err(format!("invalid order source: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_source_string_forms() {
        assert_eq!(OrderSource::Cart.to_string(), "cart");
        assert_eq!("single".parse::<OrderSource>().unwrap(), OrderSource::Single);
        assert!("bulk".parse::<OrderSource>().is_err());
        assert_eq!(serde_json::to_string(&OrderSource::Cart).unwrap(), "\"cart\"");
    }
}
