//! Type-safe price representation using decimal arithmetic.
//!
//! Totals are always shown with a currency symbol prefix and exactly two
//! decimal places (`₹398.00`). Catalog prices echo the server amount in
//! normalized form (`₹199`, `₹49.5`).

use rust_decimal::Decimal;
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

    /// Format with two decimal places (e.g., "₹398.00").
    #[must_use]
    pub fn display(&self) -> String {
        format_amount(self.amount, self.currency_code)
    }

    /// Format the amount as the server sent it, without trailing zeros
    /// (e.g., "₹199" for `199.00`).
    #[must_use]
    pub fn display_compact(&self) -> String {
        format!("{}{}", self.currency_code.symbol(), self.amount.normalize())
    }
}

/// Format an amount with the currency symbol and exactly two decimals.
#[must_use]
pub fn format_amount(amount: Decimal, currency_code: CurrencyCode) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    format!("{}{rounded}", currency_code.symbol())
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol used as a prefix.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// ISO code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}
