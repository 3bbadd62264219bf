use rust_decimal::Decimal;
use thiserror::Error;

use procura_core::DomainError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure reported by a collaborating service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Units belong to different categories (e.g. kg → unit).
    #[error("cannot convert {from} to {to}: units belong to different categories")]
    IncompatibleUnits { from: String, to: String },

    /// A referenced catalog record does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// No exchange rate is known for the pair at the date.
    #[error("no exchange rate for {currency} on {date}")]
    MissingRate { currency: String, date: String },

    /// The service could not answer at all.
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    /// A converted figure exceeded the decimal range.
    #[error("{0} is out of range")]
    Overflow(String),
}

pub(crate) fn checked(value: Option<Decimal>, what: &str) -> ServiceResult<Decimal> {
    value.ok_or_else(|| ServiceError::Overflow(what.to_string()))
}

impl ServiceError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl From<ServiceError> for DomainError {
    fn from(err: ServiceError) -> Self {
        match &err {
            ServiceError::IncompatibleUnits { .. } | ServiceError::Overflow(_) => {
                DomainError::validation(err.to_string())
            }
            ServiceError::NotFound { .. } => DomainError::external("catalog", err.to_string()),
            ServiceError::MissingRate { .. } => DomainError::external("currency", err.to_string()),
            ServiceError::Unavailable { service, .. } => {
                DomainError::external(service.clone(), err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_units_become_validation_errors() {
        let err: DomainError = ServiceError::IncompatibleUnits {
            from: "kg".into(),
            to: "Units".into(),
        }
        .into();
        assert!(err.is_validation());
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let err: DomainError = ServiceError::Overflow("converted quantity".into()).into();
        match err {
            DomainError::Validation(msg) if msg.contains("converted quantity") => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn outages_keep_the_service_name() {
        let err: DomainError = ServiceError::unavailable("pricing", "timeout").into();
        match err {
            DomainError::External { service, message } => {
                assert_eq!(service, "pricing");
                assert!(message.contains("timeout"));
            }
            other => panic!("Expected External, got {other:?}"),
        }
    }
}
