use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For BRL/USD, 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into an amount.
/// Example: "50.00", "12.5", "100"
pub fn parse_amount(input: &str) -> Result<Decimal, MoneyError> {
    Decimal::from_str(input.trim()).map_err(|_| MoneyError::InvalidFormat)
}

/// Convert a decimal amount into cents.
///
/// Amounts carrying more than two fractional digits are rejected instead of
/// truncated, so a caller never gets credited for less than they asked.
pub fn decimal_to_cents(amount: Decimal) -> Result<Cents, MoneyError> {
    let normalized = amount.normalize();
    if normalized.scale() > 2 {
        return Err(MoneyError::TooPrecise(normalized));
    }
    normalized
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(MoneyError::OutOfRange)
}

/// Render cents as a two-decimal amount.
pub fn cents_to_decimal(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

/// Fraction of the gross value withheld as the anticipation fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate(Decimal);

/// Fee/net split of a gross amount. `fee + net == gross` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: Cents,
    pub net: Cents,
}

impl FeeRate {
    pub const DEFAULT: FeeRate = FeeRate(Decimal::from_parts(3, 0, 0, false, 2));

    pub fn new(rate: Decimal) -> Result<Self, MoneyError> {
        if rate.is_sign_negative() || rate >= Decimal::ONE {
            return Err(MoneyError::InvalidFeeRate(rate));
        }
        Ok(Self(rate))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Split a gross amount into fee and net.
    /// The fee is rounded half away from zero to whole cents and the net
    /// takes the remainder.
    pub fn split(&self, gross: Cents) -> FeeSplit {
        let fee = (Decimal::from(gross) * self.0)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0);
        FeeSplit {
            fee,
            net: gross - fee,
        }
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for FeeRate {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_amount(s)?)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    InvalidFormat,
    TooPrecise(Decimal),
    OutOfRange,
    InvalidFeeRate(Decimal),
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::InvalidFormat => write!(f, "invalid money format"),
            MoneyError::TooPrecise(d) => {
                write!(f, "amount {} has more than two decimal places", d)
            }
            MoneyError::OutOfRange => write!(f, "amount out of range"),
            MoneyError::InvalidFeeRate(d) => {
                write!(f, "fee rate {} must be within [0, 1)", d)
            }
        }
    }
}

impl std::error::Error for MoneyError {}
