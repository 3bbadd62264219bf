//! Currency value objects and deterministic decimal rounding.
//!
//! Every monetary figure in the workspace is a [`rust_decimal::Decimal`] and is
//! rounded with an explicit precision: a currency's decimal places, a digit
//! count, or a rounding increment taken from a unit of measure. Midpoints
//! always round away from zero (`2.5 -> 3`, `0.045 -> 0.05`).
//!
//! `Decimal` operators panic on overflow. Arithmetic on caller-supplied
//! figures goes through the `checked_*` methods and [`checked`] instead.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// ISO 4217 currency code (e.g. "USD", "AED").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into().trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "currency code must be three letters, got {code:?}"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for CurrencyCode {}

/// A currency together with its monetary precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    /// Number of decimal places amounts in this currency are rounded to.
    pub decimal_places: u32,
}

impl Currency {
    pub fn new(code: CurrencyCode, decimal_places: u32) -> Self {
        Self {
            code,
            decimal_places,
        }
    }

    /// Round an amount to this currency's precision.
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_digits(amount, self.decimal_places)
    }

    /// True when `amount` rounds to zero in this currency.
    pub fn is_zero(&self, amount: Decimal) -> bool {
        self.round(amount).is_zero()
    }
}

impl ValueObject for Currency {}

/// Round `value` to `digits` decimal places, midpoints away from zero.
pub fn round_digits(value: Decimal, digits: u32) -> Decimal {
    value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
}

/// Turn the result of a `checked_*` operation into a validation error.
///
/// `what` names the figure that went out of range.
pub fn checked(value: Option<Decimal>, what: &str) -> DomainResult<Decimal> {
    value.ok_or_else(|| DomainError::validation(format!("{what} is out of range")))
}

/// Round `value` to the nearest multiple of `increment`, midpoints away from zero.
///
/// A non-positive increment leaves the value untouched.
pub fn round_to_increment(value: Decimal, increment: Decimal) -> DomainResult<Decimal> {
    if increment <= Decimal::ZERO {
        return Ok(value);
    }
    let steps = checked(value.checked_div(increment), "rounded quantity")?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    checked(steps.checked_mul(increment), "rounded quantity")
}
