//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Unit, catalog and amount errors                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbook-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - What the ledger/billing services return        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → handler response    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A quantity was flagged as sub-unit for a product that has no sub-unit.
    ///
    /// ## When This Occurs
    /// - Movement line or bill item with `is_sub_unit = true` on a product
    ///   whose catalog entry has no sub-unit configured
    ///
    /// Caller-correctable; surfaced as a 4xx-equivalent.
    #[error("Product {product_id} has no sub-unit configured")]
    UnsupportedUnit { product_id: String },

    /// Referenced product is missing from the catalog.
    ///
    /// ## When This Occurs
    /// - Strict movement policy and a line references an unknown id
    /// - Enrichment never raises this; it degrades to `None`
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A bill item's product could not be resolved for pricing.
    #[error("Price not found for product: {0}")]
    PriceNotFound(String),

    /// An amount that must be non-negative was negative.
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(String),

    /// A quantity or amount left the representable range.
    ///
    /// ## When This Occurs
    /// - Sub-unit conversion, per-product folding or a bill total exceeds
    ///   what a decimal or an i64 paise value can hold
    #[error("{0} is out of range")]
    Overflow(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether the caller can fix the request and resubmit.
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            CoreError::UnsupportedUnit { .. }
                | CoreError::NegativeAmount(_)
                | CoreError::Overflow(_)
                | CoreError::Validation(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection that needs entries has none.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid decimal, unknown unit).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate bill number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
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
        let err = CoreError::UnsupportedUnit {
            product_id: "p-1".to_string(),
        };
        assert_eq!(err.to_string(), "Product p-1 has no sub-unit configured");

        let err = CoreError::PriceNotFound("p-9".to_string());
        assert_eq!(err.to_string(), "Price not found for product: p-9");

        let err = CoreError::Overflow("stock of p-3".to_string());
        assert_eq!(err.to_string(), "stock of p-3 is out of range");
        assert!(err.is_caller_correctable());
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("bill_number").to_string(),
            "bill_number is required"
        );
        let err = ValidationError::OutOfRange {
            field: "discount_percentage".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "discount_percentage must be between 0 and 100"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("lines").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(core_err.is_caller_correctable());
        assert!(!CoreError::ProductNotFound("x".into()).is_caller_correctable());
    }
}
