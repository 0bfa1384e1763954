//! Custom error types for the envelope ledger
//!
//! This module defines the error hierarchy for the ledger using thiserror.
//! Store methods return these as typed failures for expected domain
//! conditions (missing month, duplicate account, ...) instead of panicking.

use thiserror::Error;

use crate::services::ledger::LedgerStep;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors (month, group, category, account, transaction)
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    AlreadyExists {
        entity_type: &'static str,
        identifier: String,
    },

    /// Persisted data does not match the expected document schema
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// An amount could not be parsed into money, or a stored amount is not
    /// a whole number of cents
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A step committed but a later step failed and could not be undone
    #[error("Consistency gap after {step} step: {detail}")]
    ConsistencyGap { step: LedgerStep, detail: String },

    /// CSV import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Storage errors (lock poisoning, document store failures)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create a "not found" error for budget months
    pub fn month_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Month",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for budget groups
    pub fn group_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Group",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    pub fn month_exists(identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type: "Month",
            identifier: identifier.into(),
        }
    }

    pub fn group_exists(identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type: "Group",
            identifier: identifier.into(),
        }
    }

    pub fn category_exists(identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    pub fn account_exists(identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a "not found" error for the given entity type
    pub fn is_not_found_for(&self, entity: &str) -> bool {
        matches!(self, Self::NotFound { entity_type, .. } if *entity_type == entity)
    }

    /// Check if this is an "already exists" error for the given entity type
    pub fn is_already_exists_for(&self, entity: &str) -> bool {
        matches!(self, Self::AlreadyExists { entity_type, .. } if *entity_type == entity)
    }

    /// Check if this is an invalid shape error
    pub fn is_invalid_shape(&self) -> bool {
        matches!(self, Self::InvalidShape(_))
    }

    /// Check if a persisted document was rejected on load
    ///
    /// These are contained by resetting the affected store.
    pub fn is_document_error(&self) -> bool {
        matches!(self, Self::InvalidShape(_) | Self::InvalidAmount(_))
    }

    /// Create a storage error for a poisoned lock
    pub(crate) fn poisoned(what: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("Failed to acquire {} lock: {}", what, err))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = LedgerError::account_not_found("Checking");
        assert_eq!(err.to_string(), "Account not found: Checking");
        assert!(err.is_not_found());
        assert!(err.is_not_found_for("Account"));
        assert!(!err.is_not_found_for("Category"));
    }

    #[test]
    fn test_already_exists_error() {
        let err = LedgerError::category_exists("202401/Dining");
        assert_eq!(err.to_string(), "Category already exists: 202401/Dining");
        assert!(err.is_already_exists_for("Category"));
    }

    #[test]
    fn test_consistency_gap_display() {
        let err = LedgerError::ConsistencyGap {
            step: LedgerStep::Budget,
            detail: "account step failed".into(),
        };
        assert_eq!(
            err.to_string(),
            "Consistency gap after budget step: account step failed"
        );
    }

    #[test]
    fn test_document_errors() {
        assert!(LedgerError::InvalidShape("x".into()).is_document_error());
        assert!(LedgerError::InvalidAmount("1.5".into()).is_document_error());
        assert!(!LedgerError::Storage("disk full".into()).is_document_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LedgerError = io_err.into();
        assert!(matches!(err, LedgerError::Io(_)));
    }
}
