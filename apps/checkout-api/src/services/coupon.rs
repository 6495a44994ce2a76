//! Coupon validation service.
//!
//! Looks a code up in the coupon store and evaluates it against an order
//! value. Never touches usage counters.

use chrono::Utc;
use tracing::debug;

use salon_core::coupon::evaluate;
use salon_core::validation::validate_coupon_code;
use salon_core::{CouponResult, Money};
use salon_db::{Database, DbResult};

#[derive(Debug, Clone)]
pub struct CouponService {
    db: Database,
}

impl CouponService {
    pub fn new(db: Database) -> Self {
        CouponService { db }
    }

    /// Validates `code` for an order of `order_value`.
    ///
    /// A rejected coupon is an `Ok` result with `valid = false`. Codes that
    /// cannot exist (bad characters, too long) are rejected as unknown
    /// without a lookup.
    pub async fn validate(&self, code: &str, order_value: Money) -> DbResult<CouponResult> {
        let now = Utc::now();

        if validate_coupon_code(code).is_err() {
            debug!(code = %code, "Malformed coupon code");
            return Ok(evaluate(None, code, order_value, now));
        }

        let record = self.db.coupons().lookup(code).await?;
        let result = evaluate(record.as_ref(), code, order_value, now);

        debug!(
            code = %result.code,
            valid = result.valid,
            discount = result.discount_amount.paise(),
            "Coupon evaluated"
        );

        Ok(result)
    }

    /// Counts one use of `code` after a new bill committed.
    ///
    /// Returns false when the limit was reached by a concurrent checkout.
    pub async fn record_use(&self, code: &str) -> DbResult<bool> {
        self.db.coupons().increment_usage(code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use salon_core::{CouponRecord, CouponRejection, DiscountMode};
    use salon_db::DbConfig;

    async fn service_with(record: CouponRecord) -> CouponService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&record).await.unwrap();
        CouponService::new(db)
    }

    fn fixed(code: &str, paise: i64) -> CouponRecord {
        CouponRecord {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            discount_type: DiscountMode::Fixed,
            discount_value: paise,
            min_order_paise: 0,
            max_discount_paise: None,
            valid_from: None,
            valid_until: Some(Utc::now() + Duration::days(30)),
            is_active: true,
            usage_limit: None,
            usage_count: 0,
        }
    }

    #[tokio::test]
    async fn test_valid_code_any_case() {
        let service = service_with(fixed("FLAT100", 10_000)).await;

        let result = service.validate("flat100", Money::from_rupees(650)).await.unwrap();
        assert!(result.valid);
        assert_eq!(result.code, "FLAT100");
        assert_eq!(result.discount_amount, Money::from_rupees(100));
    }

    #[tokio::test]
    async fn test_validation_does_not_count_usage() {
        let service = service_with(fixed("FLAT100", 10_000)).await;

        for _ in 0..3 {
            service.validate("FLAT100", Money::from_rupees(650)).await.unwrap();
        }
        let record = service.db.coupons().lookup("FLAT100").await.unwrap().unwrap();
        assert_eq!(record.usage_count, 0);
    }

    #[tokio::test]
    async fn test_malformed_code_is_unknown() {
        let service = service_with(fixed("FLAT100", 10_000)).await;

        let result = service.validate("FLAT 100!", Money::from_rupees(650)).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.rejection, Some(CouponRejection::UnknownCode));
    }
}
