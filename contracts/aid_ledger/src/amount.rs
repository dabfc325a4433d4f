//! ETH-denominated decimal amounts.
//!
//! Amounts travel as decimal strings (`"12.3"`, `"0.0"`) both on the wire and
//! in persisted JSON. [`Amount`] keeps the parsed [`Decimal`] and renders it
//! back exactly as it was written, so seeded and loaded records round-trip
//! verbatim.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LedgerError, Result};

/// Fractional digits kept when accumulating donations.
pub const RAISED_PRECISION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// The starting `raised` value of a fresh request, rendered as `"0.0"`.
    pub fn zero() -> Self {
        Amount(Decimal::new(0, 1))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Amount(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Parse a donation amount. Rejects anything that is not strictly positive.
    pub fn parse_positive(raw: &str) -> Result<Self> {
        let amount: Amount = raw.parse()?;
        if amount.0 <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must be positive, got {raw}"
            )));
        }
        Ok(amount)
    }

    /// Add `other`, rounding to [`RAISED_PRECISION`] digits and trimming
    /// trailing zeros (`12.3 + 2.0` renders as `14.3`).
    ///
    /// Fails with [`LedgerError::InvalidAmount`] when the sum does not fit.
    pub fn accumulate(&self, other: &Amount) -> Result<Amount> {
        let sum = self.0.checked_add(other.0).ok_or_else(|| {
            LedgerError::InvalidAmount(format!("{} + {} overflows", self.0, other.0))
        })?;
        let sum =
            sum.round_dp_with_strategy(RAISED_PRECISION, RoundingStrategy::MidpointAwayFromZero);
        Ok(Amount(sum.normalize()))
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Decimal::from_str(s.trim())
            .map(Amount)
            .map_err(|e| LedgerError::InvalidAmount(format!("{s:?}: {e}")))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
