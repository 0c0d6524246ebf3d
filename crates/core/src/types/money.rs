//! Money amounts using decimal arithmetic.
//!
//! The shop trades in a single currency (Sri Lankan rupees), so `Money` is a
//! bare decimal amount. It travels over the wire as a JSON number, which is
//! what the backend sends and expects.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency label used when rendering amounts.
pub const CURRENCY_LABEL: &str = "Rs.";

/// A monetary amount in rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// Renders as `Rs. 1,250.00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        let text = format!("{:.2}", rounded.abs());
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        write!(f, "{CURRENCY_LABEL} {sign}{grouped}.{fraction}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_units(0).to_string(), "Rs. 0.00");
        assert_eq!(Money::from_units(500).to_string(), "Rs. 500.00");
        assert_eq!(Money::from_units(1250).to_string(), "Rs. 1,250.00");
        assert_eq!(Money::from_units(1_234_567).to_string(), "Rs. 1,234,567.00");
        assert_eq!(Money::new(Decimal::new(-45, 1)).to_string(), "Rs. -4.50");
    }

    #[test]
    fn test_arithmetic() {
        let unit = Money::new(Decimal::new(1999, 2));
        assert_eq!(unit * 3, Money::new(Decimal::new(5997, 2)));

        let total: Money = [Money::from_units(10), Money::from_units(5)].into_iter().sum();
        assert_eq!(total, Money::from_units(15));
    }

    #[test]
    fn test_deserializes_json_numbers() {
        let whole: Money = serde_json::from_str("1250").unwrap();
        assert_eq!(whole, Money::from_units(1250));

        let fractional: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(fractional, Money::new(Decimal::new(125, 1)));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Money::from_units(300)).unwrap();
        assert_eq!(json, "300.0");
    }
}
