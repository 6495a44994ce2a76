//! # Error Types
//!
//! Domain-specific error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salon-core errors (this file)                                          │
//! │  ├── CoreError        - Malformed cart or discount input                │
//! │  └── ValidationError  - Field validation failures                       │
//! │                                                                         │
//! │  salon-core values (not errors)                                         │
//! │  ├── Violation        - Business invariant broken (validation.rs)       │
//! │  └── CouponRejection  - Why a coupon does not apply (coupon.rs)         │
//! │                                                                         │
//! │  salon-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  checkout-api errors (in app)                                           │
//! │  └── ApiError         - What the billing page sees (serialized)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError (400) → Frontend          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ref id, scope, ...)
//! 3. Errors are enum variants, never String

use thiserror::Error;

use crate::types::DiscountScope;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// All of these mean the request itself is malformed; none of them depend on
/// stock or staff state (those are [`crate::Violation`]s).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A line item cannot be priced.
    ///
    /// ## When This Occurs
    /// - Negative unit price or negative quantity
    /// - Line total or subtotal overflows
    #[error("Invalid line item {ref_id}: {reason}")]
    InvalidLineItem { ref_id: String, reason: String },

    /// A manual discount is out of range or given twice for one scope.
    #[error("Invalid {scope} discount: {reason}")]
    InvalidDiscount { scope: DiscountScope, reason: String },

    /// Cart has exceeded maximum allowed items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart transition referenced a line that does not exist.
    #[error("Cart line {index} does not exist")]
    LineNotFound { index: usize },

    /// A coupon result was computed for a different subtotal than the cart
    /// currently has.
    ///
    /// ## User Workflow
    /// ```text
    /// Validate "DIWALI10" on ₹650 ──► add a product (cart now ₹750)
    ///      │
    ///      ▼
    /// apply_coupon(result for ₹650) ──► StaleCoupon
    ///      │
    ///      ▼
    /// UI re-validates the coupon against ₹750
    /// ```
    #[error("Coupon {code} was validated for {validated_for} paise, cart is now {current} paise")]
    StaleCoupon {
        code: String,
        validated_for: i64,
        current: i64,
    },

    /// Tried to apply a coupon result that was rejected.
    #[error("Coupon {code} is not valid: {message}")]
    CouponNotValid { code: String, message: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub(crate) fn invalid_line(ref_id: &str, reason: impl Into<String>) -> Self {
        CoreError::InvalidLineItem {
            ref_id: ref_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_discount(scope: DiscountScope, reason: impl Into<String>) -> Self {
        CoreError::InvalidDiscount {
            scope,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
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
    fn test_error_messages() {
        let err = CoreError::invalid_line("prd-1", "unit price must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid line item prd-1: unit price must not be negative"
        );

        let err = CoreError::invalid_discount(DiscountScope::Services, "percent above 100%");
        assert_eq!(err.to_string(), "Invalid services discount: percent above 100%");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "idempotencyKey".to_string(),
        };
        assert_eq!(err.to_string(), "idempotencyKey is required");

        let err = ValidationError::TooShort {
            field: "idempotencyKey".to_string(),
            min: 8,
        };
        assert_eq!(err.to_string(), "idempotencyKey must be at least 8 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
