//! Centralized error handling for the lending ledger.
//!
//! Every service in this crate surfaces one of these typed errors. Failures
//! raised inside an open transaction abort the whole unit of work; callers
//! always see either the fully committed state or the state before the call.

use thiserror::Error;

/// Ledger error taxonomy.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The loan, installment, borrower or collection does not exist, or is
    /// not owned by the acting owner.
    #[error("not found: {0}")]
    NotFound(String),

    /// The action is forbidden by the entity's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Input values outside the allowed range, or a payment amount the loan
    /// cannot absorb.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Identifier generation exhausted its retry budget, or a caller-supplied
    /// unique value already exists.
    #[error("conflicting identifier: {0}")]
    ConflictingIdentifier(String),

    /// The storage layer failed; any open transaction was rolled back.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Stable machine-readable code for each variant.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::InvalidState(_) => "INVALID_STATE",
            LedgerError::InvalidParameters(_) => "INVALID_PARAMETERS",
            LedgerError::ConflictingIdentifier(_) => "CONFLICTING_IDENTIFIER",
            LedgerError::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound("record not found".to_string()),
            _ => LedgerError::Persistence(err.to_string()),
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
