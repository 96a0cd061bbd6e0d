//! # Error Types
//!
//! Domain-specific error types for sari-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sari-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule / state machine violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  sari-db errors (separate crate)                                       │
//! │  └── DbError          - Storage failures, wraps CoreError transparently│
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → web layer → client      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, available stock, ...)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or state machine
/// failures. Every one of them aborts the operation before any write
/// becomes visible.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a sale line.
    ///
    /// ## When This Occurs
    /// - A cart line requests more than the available stock
    /// - Two concurrent sales race for the same stock; the loser gets this
    ///
    /// The message names the product and the available quantity so the
    /// cashier can adjust the cart and resubmit.
    #[error("Not enough stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// A signed stock delta would take the product below zero.
    ///
    /// Raised by the stock ledger's `apply_delta` during sale edits and
    /// manual adjustments.
    #[error("Stock for {name} cannot go negative")]
    NegativeStock { name: String },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer referenced by a sale cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Voucher code is unknown or inactive.
    #[error("Voucher code not found or inactive: {0}")]
    VoucherNotFound(String),

    /// A sale was submitted with no line items.
    #[error("No order items")]
    EmptyCart,

    /// Only unpaid sales may be edited.
    #[error("Cannot edit a paid sale: {0}")]
    CannotEditPaidSale(String),

    /// The sale has already been paid.
    #[error("Sale has already been paid: {0}")]
    AlreadyPaid(String),

    /// The sale has already been retracted.
    ///
    /// `Retracted` is a terminal state: no payment, edit, or second
    /// retraction is allowed, and stock must not be restored twice.
    #[error("Sale has already been retracted: {0}")]
    AlreadyRetracted(String),

    /// The operation is restricted to the Admin role.
    #[error("Admin role required to {action}")]
    AdminRequired { action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an AdminRequired error for the named action.
    pub fn admin_required(action: impl Into<String>) -> Self {
        CoreError::AdminRequired {
            action: action.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs - a request that
/// fails validation never reaches storage.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid payment method).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
    fn test_insufficient_stock_message_names_product_and_quantities() {
        let err = CoreError::InsufficientStock {
            name: "Lavender Massage Oil".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Lavender Massage Oil. Available: 3, Requested: 5"
        );
    }

    #[test]
    fn test_state_machine_error_messages() {
        let err = CoreError::AlreadyRetracted("abc".to_string());
        assert_eq!(err.to_string(), "Sale has already been retracted: abc");

        let err = CoreError::admin_required("retract a sale");
        assert_eq!(err.to_string(), "Admin role required to retract a sale");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
