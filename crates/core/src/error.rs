//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Validation errors are user-correctable. `External` wraps failures of the
/// collaborating services (catalog, pricing, currency, tax); those abort the
/// recompute that triggered them and surface to the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. document already deleted).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A collaborating service failed.
    #[error("{service} service failed: {message}")]
    External { service: String, message: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn external(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::External {
            service: service.into(),
            message: msg.into(),
        }
    }

    /// True for errors the user can fix by editing the document.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
