//! Engine error model.
//!
//! Only contract violations and infrastructure failures are errors. Business
//! rule failures travel as [`crate::ReturnResponse::Failure`].

use thiserror::Error;

use returnflow_core::DomainError;

/// Storage operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A unique constraint was violated (e.g. duplicate return reference).
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// A write referenced a row that does not exist or is not bound yet.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Internal lock poisoning.
    #[error("storage lock poisoned")]
    Poisoned,

    /// Any other backend failure.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Failure reported by an external collaborator (order, store or OMS ports).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{collaborator}: {message}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

/// The single error type of the return lifecycle engine.
#[derive(Debug, Error)]
pub enum ReturnError {
    /// Broken input contract (missing required field, precondition).
    #[error("contract violation: {0}")]
    Contract(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl ReturnError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

pub type ReturnResult<T> = Result<T, ReturnError>;
