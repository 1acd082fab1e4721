//! # Error Types
//!
//! Domain-specific error types for balcao-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  balcao-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  balcao-db errors (separate crate)                                     │
//! │  ├── StoreError       - Store operation failures (NotFound, Conflict)  │
//! │  └── LedgerError      - Either of the above, as seen by callers        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller message      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ledger errors are terminal for the single requested operation: the
//! transaction guarantees that no partial effect is ever persisted, so the
//! caller can surface the message and leave form state intact for retry.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Committing or amending a movement would drive stock negative.
    ///
    /// ## When This Occurs
    /// - Selling more than the product currently has in stock
    /// - Amending a sale upward past the remaining stock
    ///
    /// The operation aborts with no partial write; stock is unchanged.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A customer with the same normalized (name, identification) pair
    /// already exists. The caller must not silently merge; the message
    /// names the conflicting record.
    #[error("A customer named '{name}' is already registered")]
    DuplicateCustomer {
        name: String,
        identification: Option<String>,
    },

    /// A movement can never be moved to a different product. Reassignment
    /// would require rewriting two products' derived state; the supported
    /// path is delete-and-recreate.
    #[error("Movement {movement_id}: cannot reassign the product of an existing movement; delete it and record a new one")]
    ProductReassignment { movement_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a request doesn't meet requirements, before any
/// business logic or I/O runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "P-4821".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for P-4821: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        assert_eq!(err.to_string(), "customer_id is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
