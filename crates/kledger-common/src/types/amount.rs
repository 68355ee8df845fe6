//! Fixed-point token amounts
//!
//! Every monetary value in the ledger is an unsigned count of sub-units of an
//! 18-decimal asset. Arithmetic is checked end to end and always multiplies
//! before dividing, so percentage math on large amounts never loses more than
//! the final floor division.
//!
//! Conversion to and from human-readable units goes through [`Decimal`], never
//! through floating point.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Arithmetic and unit-conversion failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("Amount overflow")]
    Overflow,

    #[error("Amount underflow")]
    Underflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Amount has more than {decimals} decimal places")]
    TooPrecise { decimals: u32 },

    #[error("Invalid amount: {0}")]
    Parse(String),
}

/// Token amount in sub-units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[inline]
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw sub-unit count
    #[inline]
    pub const fn raw(self) -> u128 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, ArithmeticError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount, ArithmeticError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(ArithmeticError::Underflow)
    }

    /// `self * numerator / denominator`, flooring once at the end
    pub fn mul_div(self, numerator: u128, denominator: u128) -> Result<Amount, ArithmeticError> {
        if denominator == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        let product = self
            .0
            .checked_mul(numerator)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Amount(product / denominator))
    }

    /// Build an amount from whole units (`5` with 18 decimals is `5 * 10^18`)
    pub fn from_whole(units: u128, decimals: u32) -> Result<Amount, ArithmeticError> {
        let factor = 10u128
            .checked_pow(decimals)
            .ok_or(ArithmeticError::Overflow)?;
        units
            .checked_mul(factor)
            .map(Amount)
            .ok_or(ArithmeticError::Overflow)
    }

    /// Convert a display value (`1.5`) into sub-units
    pub fn from_units(value: Decimal, decimals: u32) -> Result<Amount, ArithmeticError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ArithmeticError::Negative);
        }

        let value = if value.scale() > decimals {
            value.normalize()
        } else {
            value
        };
        if value.scale() > decimals {
            return Err(ArithmeticError::TooPrecise { decimals });
        }

        let mantissa = value.mantissa().unsigned_abs();
        let factor = 10u128
            .checked_pow(decimals - value.scale())
            .ok_or(ArithmeticError::Overflow)?;

        mantissa
            .checked_mul(factor)
            .map(Amount)
            .ok_or(ArithmeticError::Overflow)
    }

    /// Parse a display string (`"100.25"`) into sub-units
    pub fn parse_units(value: &str, decimals: u32) -> Result<Amount, ArithmeticError> {
        let parsed = Decimal::from_str(value.trim())
            .map_err(|e| ArithmeticError::Parse(format!("{value}: {e}")))?;
        Self::from_units(parsed, decimals)
    }

    /// Convert sub-units into a display value
    pub fn to_units(self, decimals: u32) -> Result<Decimal, ArithmeticError> {
        let mantissa = i128::try_from(self.0).map_err(|_| ArithmeticError::Overflow)?;
        Decimal::try_from_i128_with_scale(mantissa, decimals)
            .map(|d| d.normalize())
            .map_err(|_| ArithmeticError::Overflow)
    }
}

impl From<u128> for Amount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl FromStr for Amount {
    type Err = ArithmeticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Amount)
            .map_err(|e| ArithmeticError::Parse(format!("{s}: {e}")))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Raw amounts exceed the safe integer range of most JSON consumers, so they
// travel as decimal strings.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
