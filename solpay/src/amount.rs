//! Exact decimal amounts for transfer requests.
//!
//! Amounts are expressed in whole units of the transferred asset (SOL, or
//! the SPL token's UI unit), never in floating point. Parsing accepts only
//! plain unsigned decimals (`1`, `0.05`, `10.500`) of any length and keeps
//! every significant digit. Values are stored without trailing zeros, so
//! `0.050` and `0.05` are the same amount.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use std::sync::LazyLock;

use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Unsigned decimal: digits, optionally followed by `.` and more digits.
static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("Invalid amount pattern"));

/// Errors produced when parsing or constructing an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The text is not a plain unsigned decimal number.
    #[error("Amount {0:?} is not an unsigned decimal")]
    Invalid(String),
    /// The text passed the pattern but the decimal parser refused it.
    #[error("Amount {0:?} is not a number")]
    NotANumber(String),
    /// The value is below zero.
    #[error("Amount {0} is negative")]
    Negative(BigDecimal),
}

/// A non-negative, exact decimal quantity of arbitrary precision.
///
/// # Serialization
///
/// Serializes to/from its normalized decimal string: `"0.05"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(BigDecimal);

impl Amount {
    /// The zero amount.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Creates an amount from a decimal value.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Negative`] if `value` is below zero.
    pub fn new(value: BigDecimal) -> Result<Self, AmountError> {
        if value < BigDecimal::zero() {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value.normalized()))
    }

    /// Creates an amount of `units * 10^-scale`, e.g. `from_units(5, 2)` is `0.05`.
    #[must_use]
    pub fn from_units(units: u64, scale: u32) -> Self {
        Self(BigDecimal::new(units.into(), scale.into()).normalized())
    }

    /// Number of significant decimal places, ignoring trailing zeros.
    #[must_use]
    pub fn decimal_places(&self) -> u64 {
        u64::try_from(self.0.as_bigint_and_exponent().1).unwrap_or(0)
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts `rhs`, returning `None` if the result would be negative.
    #[must_use]
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        if rhs.0 > self.0 {
            return None;
        }
        Some(Self((&self.0 - &rhs.0).normalized()))
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self((self.0 + rhs.0).normalized())
    }
}

/// Fixed-point form with the value's own decimal places: no exponent and no
/// trailing zeros.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_zero() {
            return f.write_str("0");
        }
        let (digits, scale) = self.0.as_bigint_and_exponent();
        let digits = digits.to_string();
        match usize::try_from(scale) {
            Ok(0) => f.write_str(&digits),
            Ok(scale) => {
                let padded = format!("{digits:0>width$}", width = scale + 1);
                let (whole, fraction) = padded.split_at(padded.len() - scale);
                write!(f, "{whole}.{fraction}")
            }
            // Integer whose trailing zeros were folded into a negative scale.
            Err(_) => {
                let zeros = usize::try_from(scale.unsigned_abs()).map_err(|_| fmt::Error)?;
                write!(f, "{digits}{}", "0".repeat(zeros))
            }
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !AMOUNT_PATTERN.is_match(s) {
            return Err(AmountError::Invalid(s.to_owned()));
        }
        let value = BigDecimal::from_str(s).map_err(|_| AmountError::NotANumber(s.to_owned()))?;
        Self::new(value)
    }
}

impl TryFrom<BigDecimal> for Amount {
    type Error = AmountError;

    fn try_from(value: BigDecimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}
