//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures (broken input contracts,
/// invariants, conflicts). Recoverable business outcomes are reported as
/// messages by the modules that own them, not through this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field was absent on an input aggregate (caller bug).
    #[error("required field missing: {0}")]
    RequiredField(String),

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

    /// A conflict occurred (e.g. duplicate unique key).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn required(field: impl Into<String>) -> Self {
        Self::RequiredField(field.into())
    }

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

    /// `true` for failures that signal a broken caller contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::RequiredField(_))
    }
}

/// Unwrap an optional field or fail with [`DomainError::RequiredField`].
pub fn require<T>(value: Option<T>, field: &str) -> DomainResult<T> {
    value.ok_or_else(|| DomainError::required(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_the_missing_field() {
        let err = require::<u32>(None, "store").unwrap_err();
        assert_eq!(err, DomainError::RequiredField("store".to_string()));
        assert!(err.is_contract_violation());
        assert_eq!(err.to_string(), "required field missing: store");
    }

    #[test]
    fn require_passes_present_values_through() {
        assert_eq!(require(Some(7), "id").unwrap(), 7);
        assert!(!DomainError::not_found().is_contract_violation());
    }
}
