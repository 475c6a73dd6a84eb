//! # Money
//!
//! [`Amount`] is a signed count of minor currency units. The service is
//! currency-agnostic: whatever unit the marketplace settles in, balances are
//! integers of it and never floats.
//!
//! [`FeeRate`] is the platform's cut expressed in basis points
//! (1 bp = 0.01%). A fee is computed as `amount * bps / 10_000`, rounded
//! half-up to the minor unit, in 128-bit intermediate arithmetic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest absolute amount accepted from callers (10^15 minor units).
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Basis points in 100%.
pub const BPS_SCALE: u32 = 10_000;

/// A monetary amount in minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a count of minor units.
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// The raw minor-unit count.
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Validate a caller-supplied amount that must be strictly positive.
    pub fn require_positive(self, field: &str) -> Result<Amount, MoneyError> {
        if self.0 <= 0 {
            return Err(MoneyError::NotPositive {
                field: field.to_string(),
                value: self.0,
            });
        }
        self.require_in_range(field)
    }

    /// Validate a caller-supplied amount that must be zero or positive.
    pub fn require_non_negative(self, field: &str) -> Result<Amount, MoneyError> {
        if self.0 < 0 {
            return Err(MoneyError::Negative {
                field: field.to_string(),
                value: self.0,
            });
        }
        self.require_in_range(field)
    }

    fn require_in_range(self, field: &str) -> Result<Amount, MoneyError> {
        if self.0.abs() > MAX_AMOUNT {
            return Err(MoneyError::OutOfRange {
                field: field.to_string(),
                value: self.0,
            });
        }
        Ok(self)
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A platform fee rate in basis points, `0..=10_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeRate(u32);

impl FeeRate {
    /// Construct from basis points.
    pub fn from_bps(bps: u32) -> Result<Self, MoneyError> {
        if bps > BPS_SCALE {
            return Err(MoneyError::InvalidRate(format!(
                "{bps} bps exceeds 100%"
            )));
        }
        Ok(Self(bps))
    }

    /// Parse a decimal percentage such as `"10"`, `"7.5"` or `"12.25"`.
    ///
    /// At most two fractional digits are accepted (1 bp resolution).
    pub fn from_percent_str(s: &str) -> Result<Self, MoneyError> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty()
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
            || frac.len() > 2
        {
            return Err(MoneyError::InvalidRate(format!(
                "expected a decimal percentage with at most two fractional digits, got {s:?}"
            )));
        }
        let whole: u32 = whole
            .parse()
            .map_err(|e| MoneyError::InvalidRate(format!("{s:?}: {e}")))?;
        let frac_bps: u32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().unwrap_or(0) * 10,
            _ => frac.parse::<u32>().unwrap_or(0),
        };
        let bps = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac_bps))
            .ok_or_else(|| MoneyError::InvalidRate(format!("{s:?} is out of range")))?;
        Self::from_bps(bps)
    }

    pub fn bps(&self) -> u32 {
        self.0
    }

    /// Render as a percentage string without trailing zeros (`"7.5"`, `"10"`).
    pub fn percent_string(&self) -> String {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        match frac {
            0 => format!("{whole}"),
            f if f % 10 == 0 => format!("{whole}.{}", f / 10),
            f => format!("{whole}.{f:02}"),
        }
    }

    /// The fee owed on `amount`, rounded half-up to the minor unit.
    ///
    /// Negative amounts yield a zero fee.
    pub fn fee_for(&self, amount: Amount) -> Amount {
        if amount.minor_units() <= 0 {
            return Amount::ZERO;
        }
        let scaled = i128::from(amount.minor_units()) * i128::from(self.0);
        let fee = (scaled + i128::from(BPS_SCALE / 2)) / i128::from(BPS_SCALE);
        Amount::new(i64::try_from(fee).unwrap_or(i64::MAX))
    }
}

impl Default for FeeRate {
    /// Ten percent.
    fn default() -> Self {
        Self(1_000)
    }
}

impl std::fmt::Display for FeeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.percent_string())
    }
}

/// Validation failures for amounts and rates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: String, value: i64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: i64 },

    #[error("{field} exceeds the maximum accepted amount, got {value}")]
    OutOfRange { field: String, value: i64 },

    #[error("invalid fee rate: {0}")]
    InvalidRate(String),
}
