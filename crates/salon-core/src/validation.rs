//! # Validation Module
//!
//! Field validators and the checkout invariant validator.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Billing page (TypeScript)                                     │
//! │  ├── Basic format checks (empty, length)                                │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Field validators (this module, top half)                      │
//! │  ├── Idempotency key, coupon code, quantity, price                      │
//! │  └── Fail fast with a ValidationError → 400                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Checkout invariants (this module, validate_checkout)          │
//! │  ├── Biller present and active, stylist on every service line           │
//! │  ├── Stock covers every product line (advisory, read-only)              │
//! │  └── Collects EVERY violation → 422                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                             │
//! │  ├── UNIQUE (salon_id, idempotency_key)                                 │
//! │  └── CHECK (current_stock >= 0), conditional decrements                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::error::ValidationError;
use crate::types::LineItem;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Idempotency keys shorter than this are rejected.
pub const MIN_IDEMPOTENCY_KEY_LEN: usize = 8;

/// Idempotency keys longer than this are rejected.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

// =============================================================================
// String Validators
// =============================================================================

/// Validates and normalizes an idempotency key.
///
/// ## Rules
/// - Surrounding whitespace is trimmed
/// - Must be 8 to 255 characters after trimming
/// - Printable ASCII only (it travels in an HTTP header)
///
/// ## Example
/// ```rust
/// use salon_core::validation::validate_idempotency_key;
///
/// assert_eq!(validate_idempotency_key(" 3f2a9c10-aa ").unwrap(), "3f2a9c10-aa");
/// assert!(validate_idempotency_key("short").is_err());
/// ```
pub fn validate_idempotency_key(key: &str) -> ValidationResult<String> {
    let key = key.trim();

    if key.is_empty() {
        return Err(ValidationError::Required {
            field: "idempotencyKey".to_string(),
        });
    }

    if key.len() < MIN_IDEMPOTENCY_KEY_LEN {
        return Err(ValidationError::TooShort {
            field: "idempotencyKey".to_string(),
            min: MIN_IDEMPOTENCY_KEY_LEN,
        });
    }

    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(ValidationError::TooLong {
            field: "idempotencyKey".to_string(),
            max: MAX_IDEMPOTENCY_KEY_LEN,
        });
    }

    if !key.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::InvalidFormat {
            field: "idempotencyKey".to_string(),
            reason: "must be printable ASCII without spaces".to_string(),
        });
    }

    Ok(key.to_string())
}

/// Validates a coupon code as typed by the receptionist.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 32 characters
/// - Letters, digits, hyphens and underscores only
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "only letters, numbers, hyphens, and underscores allowed".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## Example
/// ```rust
/// use salon_core::validation::validate_quantity;
///
/// assert!(validate_quantity(5).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(1000).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in paise.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (complimentary services)
pub fn validate_amount_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if paise < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a checkout request.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "lineItems".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use salon_core::validation::validate_uuid;
///
/// assert!(validate_uuid("billId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("billId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Checkout Invariants
// =============================================================================

/// A broken business invariant. Checkout collects all of them before
/// refusing, so the receptionist can fix everything in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("A biller must be selected")]
    BillerRequired,

    #[error("Biller {staff_id} is not an active staff member")]
    BillerNotActive { staff_id: String },

    /// ## When This Occurs
    /// - Service line with no stylist selected
    /// - Stylist has since been deactivated
    #[error("Service {service} needs an active performing staff member")]
    StaffAttributionRequired { ref_id: String, service: String },

    /// ## User Workflow
    /// ```text
    /// Add Shampoo (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// StockInsufficient { product: "Shampoo", requested: 5, available: 3 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Shampoo in stock"
    /// ```
    #[error("Only {available} {product} in stock, {requested} requested")]
    StockInsufficient {
        product_id: String,
        product: String,
        requested: i64,
        available: i64,
    },

    /// Unknown or inactive catalog entry.
    #[error("Item {ref_id} is unavailable: {reason}")]
    ItemUnavailable { ref_id: String, reason: String },

    /// The coupon failed server-side revalidation.
    #[error("Coupon {code} cannot be applied: {message}")]
    CouponRejected { code: String, message: String },
}

impl Violation {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Violation::EmptyCart => "EMPTY_CART",
            Violation::BillerRequired => "BILLER_REQUIRED",
            Violation::BillerNotActive { .. } => "BILLER_NOT_ACTIVE",
            Violation::StaffAttributionRequired { .. } => "STAFF_ATTRIBUTION_REQUIRED",
            Violation::StockInsufficient { .. } => "STOCK_INSUFFICIENT",
            Violation::ItemUnavailable { .. } => "ITEM_UNAVAILABLE",
            Violation::CouponRejected { .. } => "COUPON_REJECTED",
        }
    }

    /// The catalog id or code the violation is about, if any.
    pub fn ref_id(&self) -> Option<&str> {
        match self {
            Violation::BillerNotActive { staff_id } => Some(staff_id),
            Violation::StaffAttributionRequired { ref_id, .. } => Some(ref_id),
            Violation::StockInsufficient { product_id, .. } => Some(product_id),
            Violation::ItemUnavailable { ref_id, .. } => Some(ref_id),
            Violation::CouponRejected { code, .. } => Some(code),
            Violation::EmptyCart | Violation::BillerRequired => None,
        }
    }

    /// Stock on hand, for stock violations.
    pub fn available(&self) -> Option<i64> {
        match self {
            Violation::StockInsufficient { available, .. } => Some(*available),
            _ => None,
        }
    }
}

/// Everything the invariant check reads. Gathered by the caller beforehand
/// so the check itself stays pure.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutInput<'a> {
    pub biller_id: Option<&'a str>,
    pub line_items: &'a [LineItem],
    /// Ids of currently active staff.
    pub active_staff: &'a HashSet<String>,
    /// Current stock by product id.
    pub stock: &'a HashMap<String, i64>,
}

/// Checks every checkout invariant and returns all violations found.
///
/// Read-only: stock is compared, never reserved. The real guard against
/// overselling is the conditional decrement at deduction time.
pub fn validate_checkout(input: &CheckoutInput<'_>) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    if input.line_items.is_empty() {
        violations.push(Violation::EmptyCart);
    }

    match input.biller_id.map(str::trim).filter(|id| !id.is_empty()) {
        None => violations.push(Violation::BillerRequired),
        Some(id) if !input.active_staff.contains(id) => {
            violations.push(Violation::BillerNotActive {
                staff_id: id.to_string(),
            })
        }
        Some(_) => {}
    }

    for line in input.line_items.iter().filter(|l| l.is_service()) {
        let attributed = line
            .performing_staff_id
            .as_deref()
            .is_some_and(|id| input.active_staff.contains(id));
        if !attributed {
            violations.push(Violation::StaffAttributionRequired {
                ref_id: line.ref_id.clone(),
                service: line.name.clone(),
            });
        }
    }

    // Same product on several lines is checked against its total
    let mut requested: Vec<(&LineItem, i64)> = Vec::new();
    for line in input.line_items.iter().filter(|l| l.is_product()) {
        match requested.iter_mut().find(|(l, _)| l.ref_id == line.ref_id) {
            Some((_, qty)) => *qty += line.quantity,
            None => requested.push((line, line.quantity)),
        }
    }
    for (line, qty) in requested {
        let available = input.stock.get(&line.ref_id).copied().unwrap_or(0);
        if qty > available {
            violations.push(Violation::StockInsufficient {
                product_id: line.ref_id.clone(),
                product: line.name.clone(),
                requested: qty,
                available,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn staff(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn stock(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn haircut_by(staff_id: Option<&str>) -> LineItem {
        LineItem::service("svc-1", "Haircut", Money::from_paise(50_000), staff_id.map(String::from))
    }

    fn shampoo(qty: i64) -> LineItem {
        LineItem::product("prd-1", "Shampoo", Money::from_paise(10_000), qty)
    }

    #[test]
    fn test_validate_idempotency_key() {
        assert!(validate_idempotency_key("abcd1234").is_ok());
        assert!(validate_idempotency_key(&"k".repeat(255)).is_ok());

        assert!(matches!(
            validate_idempotency_key("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_idempotency_key("abc"),
            Err(ValidationError::TooShort { min: 8, .. })
        ));
        assert!(matches!(
            validate_idempotency_key(&"k".repeat(256)),
            Err(ValidationError::TooLong { max: 255, .. })
        ));
        assert!(validate_idempotency_key("has a space").is_err());
    }

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("DIWALI10").is_ok());
        assert!(validate_coupon_code(" new_year-25 ").is_ok());
        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("50% OFF").is_err());
        assert!(validate_coupon_code(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amount_and_tax() {
        assert!(validate_amount_paise("orderValue", 0).is_ok());
        assert!(validate_amount_paise("orderValue", -1).is_err());
        assert!(validate_tax_rate_bps(1800).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
        assert!(validate_cart_size(100).is_ok());
        assert!(validate_cart_size(101).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("billId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("billId", "").is_err());
        assert!(validate_uuid("billId", "123").is_err());
    }

    #[test]
    fn test_valid_checkout() {
        let items = vec![haircut_by(Some("st-1")), shampoo(2)];
        let active = staff(&["st-1", "st-2"]);
        let levels = stock(&[("prd-1", 2)]);
        let input = CheckoutInput {
            biller_id: Some("st-2"),
            line_items: &items,
            active_staff: &active,
            stock: &levels,
        };
        assert!(validate_checkout(&input).is_ok());
    }

    #[test]
    fn test_collects_all_violations() {
        let items = vec![haircut_by(None), shampoo(5)];
        let active = staff(&["st-1"]);
        let levels = stock(&[("prd-1", 3)]);
        let input = CheckoutInput {
            biller_id: None,
            line_items: &items,
            active_staff: &active,
            stock: &levels,
        };

        let violations = validate_checkout(&input).unwrap_err();
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0], Violation::BillerRequired);
        assert_eq!(violations[1].code(), "STAFF_ATTRIBUTION_REQUIRED");
        assert_eq!(
            violations[2],
            Violation::StockInsufficient {
                product_id: "prd-1".into(),
                product: "Shampoo".into(),
                requested: 5,
                available: 3,
            }
        );
        assert_eq!(violations[2].available(), Some(3));
        assert_eq!(violations[2].to_string(), "Only 3 Shampoo in stock, 5 requested");
    }

    #[test]
    fn test_inactive_biller_and_stylist() {
        let items = vec![haircut_by(Some("st-gone"))];
        let active = staff(&["st-1"]);
        let levels = stock(&[]);
        let input = CheckoutInput {
            biller_id: Some("st-gone"),
            line_items: &items,
            active_staff: &active,
            stock: &levels,
        };

        let violations = validate_checkout(&input).unwrap_err();
        assert_eq!(
            violations,
            vec![
                Violation::BillerNotActive {
                    staff_id: "st-gone".into()
                },
                Violation::StaffAttributionRequired {
                    ref_id: "svc-1".into(),
                    service: "Haircut".into()
                },
            ]
        );
    }

    #[test]
    fn test_stock_aggregates_repeated_product_lines() {
        let items = vec![shampoo(2), shampoo(2)];
        let active = staff(&["st-1"]);
        let levels = stock(&[("prd-1", 3)]);
        let input = CheckoutInput {
            biller_id: Some("st-1"),
            line_items: &items,
            active_staff: &active,
            stock: &levels,
        };

        let violations = validate_checkout(&input).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            Violation::StockInsufficient { requested: 4, available: 3, .. }
        ));
    }

    #[test]
    fn test_empty_cart() {
        let active = staff(&["st-1"]);
        let levels = stock(&[]);
        let input = CheckoutInput {
            biller_id: Some("st-1"),
            line_items: &[],
            active_staff: &active,
            stock: &levels,
        };
        assert_eq!(validate_checkout(&input).unwrap_err(), vec![Violation::EmptyCart]);
    }
}
