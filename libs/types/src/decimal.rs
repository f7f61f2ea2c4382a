//! Fixed-point decimal arithmetic for prices and quantities
//!
//! Wraps rust_decimal for deterministic arithmetic (no floating-point errors).
//! All values carry at most eight fractional digits; division rounds
//! half-away-from-zero at the ninth digit. Serialized as strings to prevent
//! JSON number precision loss.

use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use crate::errors::DecimalError;

/// Number of fractional digits carried by every [`Decimal`].
pub const FRACTION_DIGITS: u32 = 8;

/// Signed fixed-point decimal with eight fractional digits and a total order.
///
/// The single numeric type used for every monetary quantity in the engine.
/// Construction normalizes the value, so parse→format round-trips are
/// idempotent ("1.50" prints as "1.5", "5" stays "5").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(rust_decimal::Decimal);

impl Decimal {
    pub const ZERO: Decimal = Decimal(rust_decimal::Decimal::ZERO);
    pub const ONE: Decimal = Decimal(rust_decimal::Decimal::ONE);

    /// Create from an integer.
    pub fn from_int(value: i64) -> Self {
        Self(rust_decimal::Decimal::from(value))
    }

    /// Parse a decimal literal.
    ///
    /// Accepts an optional sign and at most [`FRACTION_DIGITS`] fractional
    /// digits; exponent notation is rejected.
    pub fn parse(s: &str) -> Result<Self, DecimalError> {
        if s.contains(['e', 'E']) {
            return Err(DecimalError::Malformed(s.to_string()));
        }
        let inner = rust_decimal::Decimal::from_str(s)
            .map_err(|_| DecimalError::Malformed(s.to_string()))?;
        if inner.scale() > FRACTION_DIGITS {
            return Err(DecimalError::Malformed(s.to_string()));
        }
        Ok(Self(inner.normalize()))
    }

    /// Exact addition; fails with [`DecimalError::Overflow`] when the result
    /// is not representable.
    pub fn checked_add(self, rhs: Self) -> Result<Self, DecimalError> {
        self.0
            .checked_add(rhs.0)
            .map(|d| Self(d.normalize()))
            .ok_or(DecimalError::Overflow)
    }

    /// Exact subtraction; fails with [`DecimalError::Overflow`] on overflow.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, DecimalError> {
        self.0
            .checked_sub(rhs.0)
            .map(|d| Self(d.normalize()))
            .ok_or(DecimalError::Overflow)
    }

    /// Multiplication rounded half-away-from-zero at the eighth fractional
    /// digit.
    pub fn checked_mul(self, rhs: Self) -> Result<Self, DecimalError> {
        self.0
            .checked_mul(rhs.0)
            .map(|d| Self(Self::rescale(d)))
            .ok_or(DecimalError::Overflow)
    }

    /// Division rounded half-away-from-zero at the ninth digit (the result
    /// carries eight fractional digits).
    pub fn checked_div(self, rhs: Self) -> Result<Self, DecimalError> {
        if rhs.is_zero() {
            return Err(DecimalError::DivisionByZero);
        }
        self.0
            .checked_div(rhs.0)
            .map(|d| Self(Self::rescale(d)))
            .ok_or(DecimalError::Overflow)
    }

    /// Division truncated toward zero at the eighth fractional digit.
    ///
    /// Used for quote-budget fills, where rounding up could spend more than
    /// the remaining budget.
    pub fn div_floor(self, rhs: Self) -> Result<Self, DecimalError> {
        if rhs.is_zero() {
            return Err(DecimalError::DivisionByZero);
        }
        self.0
            .checked_div(rhs.0)
            .map(|d| {
                Self(
                    d.round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::ToZero)
                        .normalize(),
                )
            })
            .ok_or(DecimalError::Overflow)
    }

    /// Check if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check if the value is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > rust_decimal::Decimal::ZERO
    }

    /// The smaller of two values.
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    fn rescale(inner: rust_decimal::Decimal) -> rust_decimal::Decimal {
        inner
            .round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    }
}

// Operator impls for validated values. Overflow here is an engine bug, not
// a recoverable submission error: validated order quantities stay far below
// the representable range.
impl Add for Decimal {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.checked_add(rhs).expect("decimal overflow in add")
    }
}

impl Sub for Decimal {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.checked_sub(rhs).expect("decimal overflow in sub")
    }
}

impl Mul for Decimal {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.checked_mul(rhs).expect("decimal overflow in mul")
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Custom serialization to preserve precision
impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display_roundtrip() {
        for s in ["0", "5", "0.5", "-3.25", "123.45678901", "0.00000001"] {
            let parsed = d(s);
            assert_eq!(parsed.to_string(), s);
            assert_eq!(Decimal::parse(&parsed.to_string()).unwrap(), parsed);
        }
    }

    #[test]
    fn test_parse_normalizes_trailing_zeros() {
        assert_eq!(d("1.50").to_string(), "1.5");
        assert_eq!(d("5.000").to_string(), "5");
    }

    #[test]
    fn test_parse_rejects_exponent() {
        assert!(matches!(
            Decimal::parse("1e5"),
            Err(DecimalError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_excess_fraction_digits() {
        assert!(Decimal::parse("0.123456789").is_err());
        assert!(Decimal::parse("0.12345678").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Decimal::parse("").is_err());
        assert!(Decimal::parse("abc").is_err());
        assert!(Decimal::parse("1.2.3").is_err());
    }

    #[test]
    fn test_arithmetic_exact() {
        assert_eq!(d("2.5") + d("1.5"), d("4"));
        assert_eq!(d("2.5") - d("1.5"), d("1"));
        assert_eq!(d("1.5") * d("100"), d("150"));
    }

    #[test]
    fn test_div_rounds_half_away_from_zero() {
        // 1 / 3 = 0.333333333... → 0.33333333
        assert_eq!(d("1").checked_div(d("3")).unwrap(), d("0.33333333"));
        // 2 / 3 = 0.666666666... → 0.66666667
        assert_eq!(d("2").checked_div(d("3")).unwrap(), d("0.66666667"));
        // Negative results round away from zero as well
        assert_eq!(d("-2").checked_div(d("3")).unwrap(), d("-0.66666667"));
    }

    #[test]
    fn test_div_floor_truncates() {
        // 1 / 3 truncated → 0.33333333 (same), but 2/3 → 0.66666666
        assert_eq!(d("2").div_floor(d("3")).unwrap(), d("0.66666666"));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            d("1").checked_div(Decimal::ZERO),
            Err(DecimalError::DivisionByZero)
        );
        assert_eq!(
            d("1").div_floor(Decimal::ZERO),
            Err(DecimalError::DivisionByZero)
        );
    }

    #[test]
    fn test_total_order() {
        let mut values = vec![d("3"), d("-1"), d("0.5"), d("0")];
        values.sort();
        assert_eq!(values, vec![d("-1"), d("0"), d("0.5"), d("3")]);
    }

    #[test]
    fn test_min() {
        assert_eq!(d("3").min(d("7")), d("3"));
        assert_eq!(d("7").min(d("3")), d("3"));
    }

    #[test]
    fn test_serialization_as_string() {
        let value = d("100.25");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"100.25\"");

        let back: Decimal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_deterministic_multiplication() {
        let a = d("0.12345678") * d("50000.87654321");
        let b = d("0.12345678") * d("50000.87654321");
        assert_eq!(a, b);
    }
}
