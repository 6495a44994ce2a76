//! # Coupon Repository
//!
//! The coupon store. Lookups are by normalized (trimmed, upper-case) code.
//!
//! ## Usage Counting
//! ```text
//! validate coupon ──► lookup() only, never counts
//! commit new bill ──► increment_usage()
//!                       UPDATE ... WHERE usage_limit IS NULL
//!                                 OR usage_count < usage_limit
//! replayed bill   ──► nothing
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use salon_core::coupon::normalize_code;
use salon_core::CouponRecord;

const COUPON_COLUMNS: &str = "id, code, discount_type, discount_value, min_order_paise, \
     max_discount_paise, valid_from, valid_until, is_active, usage_limit, usage_count";

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Finds a coupon by code, case-insensitively.
    pub async fn lookup(&self, code: &str) -> DbResult<Option<CouponRecord>> {
        let code = normalize_code(code);
        debug!(code = %code, "Looking up coupon");

        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1");
        let record = sqlx::query_as::<_, CouponRecord>(&sql)
            .bind(&code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Counts one use of `code`.
    ///
    /// Returns false when the coupon is unknown or its limit was reached in
    /// the meantime. The bill has already committed by then, so callers log
    /// and move on.
    pub async fn increment_usage(&self, code: &str) -> DbResult<bool> {
        let code = normalize_code(code);

        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET usage_count = usage_count + 1
            WHERE code = ?1
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(&code)
        .execute(&self.pool)
        .await?;

        debug!(code = %code, counted = result.rows_affected() > 0, "Coupon usage increment");

        Ok(result.rows_affected() > 0)
    }

    /// Inserts a coupon. The code is stored normalized.
    pub async fn insert(&self, coupon: &CouponRecord) -> DbResult<()> {
        let code = normalize_code(&coupon.code);
        debug!(id = %coupon.id, code = %code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, discount_value, min_order_paise,
                max_discount_paise, valid_from, valid_until, is_active,
                usage_limit, usage_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&coupon.id)
        .bind(&code)
        .bind(coupon.discount_type)
        .bind(coupon.discount_value)
        .bind(coupon.min_order_paise)
        .bind(coupon.max_discount_paise)
        .bind(coupon.valid_from)
        .bind(coupon.valid_until)
        .bind(coupon.is_active)
        .bind(coupon.usage_limit)
        .bind(coupon.usage_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
