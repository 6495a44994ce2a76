//! # Coupon Rules
//!
//! Pure evaluation of a coupon code against an order value.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  code ──► lookup (caller) ──► evaluate(record, code, order, now)        │
//! │                                   │                                     │
//! │        unknown? ──────────────────┼──► UnknownCode                      │
//! │        inactive? ─────────────────┼──► Inactive                         │
//! │        now < valid_from? ─────────┼──► NotYetActive                     │
//! │        now > valid_until? ────────┼──► Expired                          │
//! │        usage_count >= limit? ─────┼──► UsageLimitReached                │
//! │        order < min_order? ────────┼──► BelowMinimumOrder                │
//! │                                   ▼                                     │
//! │                    discount = percent (capped) | min(fixed, order)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Evaluation never touches usage counters. The checkout flow increments
//! usage once a new bill has committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::DiscountMode;

// =============================================================================
// Store Record
// =============================================================================

/// A coupon as held by the coupon store.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CouponRecord {
    pub id: String,
    /// Stored upper-case.
    pub code: String,
    pub discount_type: DiscountMode,
    /// Basis points for percent coupons, paise for fixed coupons.
    pub discount_value: i64,
    pub min_order_paise: i64,
    /// Upper bound on a percent coupon's discount.
    pub max_discount_paise: Option<i64>,
    #[ts(as = "Option<String>")]
    pub valid_from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
}

// =============================================================================
// Result Types
// =============================================================================

/// Machine-readable reason a coupon does not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    UnknownCode,
    Inactive,
    NotYetActive,
    Expired,
    BelowMinimumOrder,
    UsageLimitReached,
}

/// Outcome of validating a coupon. Stateless: holds for `order_value` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CouponResult {
    pub code: String,
    pub valid: bool,
    /// Always within `0..=order_value`; zero when `valid` is false.
    pub discount_amount: Money,
    pub order_value: Money,
    pub message: String,
    pub rejection: Option<CouponRejection>,
}

/// A coupon accepted for a specific order value, ready for pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Money,
    /// Subtotal the discount was computed against.
    pub order_value: Money,
}

impl CouponResult {
    fn rejected(code: String, order_value: Money, rejection: CouponRejection, message: String) -> Self {
        CouponResult {
            code,
            valid: false,
            discount_amount: Money::zero(),
            order_value,
            message,
            rejection: Some(rejection),
        }
    }

    /// The applicable coupon, if this result is valid.
    pub fn applied(&self) -> Option<AppliedCoupon> {
        self.valid.then(|| AppliedCoupon {
            code: self.code.clone(),
            discount: self.discount_amount,
            order_value: self.order_value,
        })
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Canonical form of a coupon code: trimmed, upper-case.
///
/// ```rust
/// use salon_core::coupon::normalize_code;
///
/// assert_eq!(normalize_code("  diwali10 "), "DIWALI10");
/// ```
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Evaluates `code` against `order_value` at time `now`.
///
/// `record` is what the store returned for the normalized code, `None` if
/// nothing matched.
pub fn evaluate(
    record: Option<&CouponRecord>,
    code: &str,
    order_value: Money,
    now: DateTime<Utc>,
) -> CouponResult {
    let code = normalize_code(code);

    let Some(record) = record else {
        return CouponResult::rejected(
            code,
            order_value,
            CouponRejection::UnknownCode,
            "Coupon code not found".to_string(),
        );
    };

    if !record.is_active {
        return CouponResult::rejected(
            code,
            order_value,
            CouponRejection::Inactive,
            "Coupon is no longer active".to_string(),
        );
    }

    if let Some(from) = record.valid_from {
        if now < from {
            return CouponResult::rejected(
                code,
                order_value,
                CouponRejection::NotYetActive,
                format!("Coupon is valid from {}", from.format("%Y-%m-%d")),
            );
        }
    }

    if let Some(until) = record.valid_until {
        if now > until {
            return CouponResult::rejected(
                code,
                order_value,
                CouponRejection::Expired,
                "Coupon has expired".to_string(),
            );
        }
    }

    if let Some(limit) = record.usage_limit {
        if record.usage_count >= limit {
            return CouponResult::rejected(
                code,
                order_value,
                CouponRejection::UsageLimitReached,
                "Coupon usage limit reached".to_string(),
            );
        }
    }

    let minimum = Money::from_paise(record.min_order_paise);
    if order_value < minimum {
        return CouponResult::rejected(
            code,
            order_value,
            CouponRejection::BelowMinimumOrder,
            format!("Minimum order value for this coupon is {}", minimum),
        );
    }

    let discount = discount_for(record, order_value);

    CouponResult {
        message: format!("Coupon applied: {} off", discount),
        code,
        valid: true,
        discount_amount: discount,
        order_value,
        rejection: None,
    }
}

/// Discount amount for an otherwise-valid coupon, within `0..=order_value`.
fn discount_for(record: &CouponRecord, order_value: Money) -> Money {
    if !order_value.is_positive() {
        return Money::zero();
    }

    let raw = match record.discount_type {
        DiscountMode::Percent => {
            let bps = record.discount_value.clamp(0, crate::BPS_SCALE);
            let amount = order_value.percent_bps(bps);
            match record.max_discount_paise {
                Some(cap) => amount.min(Money::from_paise(cap.max(0))),
                None => amount,
            }
        }
        DiscountMode::Fixed => Money::from_paise(record.discount_value.max(0)),
    };

    raw.min(order_value)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn percent_coupon(bps: i64) -> CouponRecord {
        CouponRecord {
            id: "c-1".to_string(),
            code: "DIWALI10".to_string(),
            discount_type: DiscountMode::Percent,
            discount_value: bps,
            min_order_paise: 0,
            max_discount_paise: None,
            valid_from: None,
            valid_until: None,
            is_active: true,
            usage_limit: None,
            usage_count: 0,
        }
    }

    fn fixed_coupon(paise: i64) -> CouponRecord {
        CouponRecord {
            code: "FLAT200".to_string(),
            discount_type: DiscountMode::Fixed,
            discount_value: paise,
            ..percent_coupon(0)
        }
    }

    #[test]
    fn test_unknown_code() {
        let result = evaluate(None, "nope", Money::from_paise(10_000), Utc::now());
        assert!(!result.valid);
        assert_eq!(result.rejection, Some(CouponRejection::UnknownCode));
        assert_eq!(result.code, "NOPE");
        assert!(result.discount_amount.is_zero());
        assert!(result.applied().is_none());
    }

    #[test]
    fn test_percent_coupon() {
        let record = percent_coupon(1000);
        let result = evaluate(Some(&record), "diwali10", Money::from_paise(65_000), Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount_amount.paise(), 6_500);
        assert_eq!(result.message, "Coupon applied: ₹65.00 off");

        let applied = result.applied().unwrap();
        assert_eq!(applied.code, "DIWALI10");
        assert_eq!(applied.order_value.paise(), 65_000);
    }

    #[test]
    fn test_percent_coupon_respects_max_discount() {
        let mut record = percent_coupon(5000);
        record.max_discount_paise = Some(10_000);
        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(100_000), Utc::now());
        assert_eq!(result.discount_amount.paise(), 10_000);
    }

    #[test]
    fn test_fixed_coupon_clamps_to_order_value() {
        let record = fixed_coupon(100_000);
        let result = evaluate(Some(&record), "FLAT200", Money::from_paise(60_000), Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount_amount.paise(), 60_000);
    }

    #[test]
    fn test_inactive_coupon() {
        let mut record = percent_coupon(1000);
        record.is_active = false;
        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(10_000), Utc::now());
        assert_eq!(result.rejection, Some(CouponRejection::Inactive));
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let mut record = percent_coupon(1000);

        record.valid_from = Some(now + Duration::days(1));
        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(10_000), now);
        assert_eq!(result.rejection, Some(CouponRejection::NotYetActive));

        record.valid_from = Some(now - Duration::days(10));
        record.valid_until = Some(now - Duration::days(1));
        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(10_000), now);
        assert_eq!(result.rejection, Some(CouponRejection::Expired));

        record.valid_until = Some(now);
        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(10_000), now);
        assert!(result.valid);
    }

    #[test]
    fn test_minimum_order_value() {
        let mut record = percent_coupon(1000);
        record.min_order_paise = 50_000;
        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(49_999), Utc::now());
        assert_eq!(result.rejection, Some(CouponRejection::BelowMinimumOrder));
        assert_eq!(result.message, "Minimum order value for this coupon is ₹500.00");

        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(50_000), Utc::now());
        assert!(result.valid);
    }

    #[test]
    fn test_usage_limit() {
        let mut record = percent_coupon(1000);
        record.usage_limit = Some(5);
        record.usage_count = 5;
        let result = evaluate(Some(&record), "DIWALI10", Money::from_paise(10_000), Utc::now());
        assert_eq!(result.rejection, Some(CouponRejection::UsageLimitReached));
    }

    #[test]
    fn test_zero_order_value_gives_zero_discount() {
        let record = fixed_coupon(20_000);
        let result = evaluate(Some(&record), "FLAT200", Money::zero(), Utc::now());
        assert!(result.valid);
        assert!(result.discount_amount.is_zero());
    }
}
