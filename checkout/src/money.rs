use crate::error::{CheckoutError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// A non-negative amount of currency with exactly two decimal digits.
///
/// All derived price fields in the system are carried as `Money`, so they
/// serialize as fixed-point strings ("44.50") and never drift through float
/// arithmetic. Construction validates once at the boundary; arithmetic on
/// already-constructed values keeps the two-digit scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub fn zero() -> Self {
        Money(Decimal::new(0, 2))
    }

    /// Parse a decimal literal, rejecting negative amounts and more than
    /// two fractional digits.
    pub fn parse(input: &str) -> Result<Self> {
        let value: Decimal = input.trim().parse().map_err(|_| {
            CheckoutError::Validation(format!("Invalid price value: {input}"))
        })?;
        if value.is_sign_negative() {
            return Err(CheckoutError::Validation(
                "Price must not be negative".to_string(),
            ));
        }
        if value.scale() > 2 {
            return Err(CheckoutError::Validation(
                "Price must have exactly two decimal places".to_string(),
            ));
        }
        let mut value = value;
        value.rescale(2);
        Ok(Money(value))
    }

    /// Build from a payment provider's minor-unit amount (e.g. cents).
    pub fn from_minor_units(minor: i64) -> Self {
        Money(Decimal::new(minor, 2))
    }

    /// Build from a decimal coming out of storage (NUMERIC columns).
    pub fn from_decimal(value: Decimal) -> Self {
        Money::round2(value)
    }

    /// Round half-away-from-zero to two decimal places.
    pub fn round2(value: Decimal) -> Self {
        let mut rounded =
            value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        Money(rounded)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Unit price times a line quantity. Two-digit inputs stay two-digit.
    pub fn times(&self, qty: u32) -> Self {
        Money::round2(self.0 * Decimal::from(qty))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(serde::de::Error::custom)
    }
}
