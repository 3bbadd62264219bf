use rust_decimal::Decimal;
use thiserror::Error;

use procura_core::DomainError;

/// Failure of the per-tax computation primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxError {
    /// Price-included percentages add up to -100% or less.
    #[error("price-included taxes cannot be extracted: combined rate {0}%")]
    InvalidIncludedRate(String),

    /// A tax definition the primitive cannot evaluate.
    #[error("unsupported tax definition {name}: {reason}")]
    Unsupported { name: String, reason: String },

    /// An amount exceeded the decimal range.
    #[error("{0} is out of range")]
    Overflow(String),
}

pub(crate) fn checked(value: Option<Decimal>, what: &str) -> Result<Decimal, TaxError> {
    value.ok_or_else(|| TaxError::Overflow(what.to_string()))
}

impl From<TaxError> for DomainError {
    fn from(err: TaxError) -> Self {
        match err {
            TaxError::Overflow(_) => DomainError::validation(err.to_string()),
            other => DomainError::external("tax", other.to_string()),
        }
    }
}
