//! # Bill Repository
//!
//! Idempotent, append-only bill persistence.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    1. bump invoice_sequences[salon_id]          ◄── first statement is  │
//! │       RETURNING last_value                          a write: lock now   │
//! │    2. INSERT bills (..., idempotency_key)                               │
//! │         │                                                               │
//! │         ├── UNIQUE (salon_id, idempotency_key) fails?                   │
//! │         │      ROLLBACK  (sequence bump undone, numbers stay gapless)   │
//! │         │      SELECT existing bill ──► CommitResult { created: false } │
//! │         ▼                                                               │
//! │    3. INSERT bill_items                                                 │
//! │  COMMIT ──► CommitResult { created: true }                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two requests racing with the same key serialize on the write lock; the
//! loser hits the unique index and gets the winner's bill.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use salon_core::{Bill, BillDraft, BillItem};

const BILL_COLUMNS: &str = "id, salon_id, invoice_number, invoice_seq, idempotency_key, \
     billed_by_staff_id, customer_id, services_subtotal_paise, products_subtotal_paise, \
     service_discount_paise, product_discount_paise, coupon_code, coupon_discount_paise, \
     taxable_paise, tax_rate_bps, tax_paise, final_paise, payment_method, notes, created_at";

const BILL_ITEM_COLUMNS: &str = "id, bill_id, line_no, kind, ref_id, name, unit_price_paise, \
     quantity, line_total_paise, performing_staff_id";

/// Result of [`BillRepository::commit`].
#[derive(Debug, Clone)]
pub struct CommitResult {
    pub bill: Bill,
    /// False when the idempotency key already had a bill.
    pub created: bool,
}

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill by ID, with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1");
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(bill).await
    }

    /// Gets the bill committed under `key` for `salon_id`, with its items.
    pub async fn get_by_idempotency_key(&self, salon_id: &str, key: &str) -> DbResult<Option<Bill>> {
        let sql = format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE salon_id = ?1 AND idempotency_key = ?2"
        );
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(salon_id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(bill).await
    }

    /// Line items of a bill in line order.
    pub async fn items_for(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let sql = format!(
            "SELECT {BILL_ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY line_no"
        );
        let items = sqlx::query_as::<_, BillItem>(&sql)
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Commits a bill exactly once per `(salon_id, idempotency_key)`.
    ///
    /// ## Returns
    /// - `created: true` with the new bill
    /// - `created: false` with the previously committed bill for this key
    ///
    /// ## Errors
    /// Any other database failure. Nothing is persisted in that case.
    pub async fn commit(&self, draft: &BillDraft) -> DbResult<CommitResult> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;

        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (salon_id, last_value) VALUES (?1, 1)
            ON CONFLICT(salon_id) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(&draft.salon_id)
        .fetch_one(&mut *tx)
        .await?;

        let bill = match Bill::from_draft(draft, id, seq, now) {
            Ok(bill) => bill,
            Err(e) => {
                tx.rollback().await?;
                return Err(DbError::ConstraintViolation {
                    message: e.to_string(),
                });
            }
        };

        debug!(
            id = %bill.id,
            invoice_number = %bill.invoice_number,
            key = %bill.idempotency_key,
            "Inserting bill"
        );

        let inserted = sqlx::query(
            r#"
            INSERT INTO bills (
                id, salon_id, invoice_number, invoice_seq, idempotency_key,
                billed_by_staff_id, customer_id,
                services_subtotal_paise, products_subtotal_paise,
                service_discount_paise, product_discount_paise,
                coupon_code, coupon_discount_paise,
                taxable_paise, tax_rate_bps, tax_paise, final_paise,
                payment_method, notes, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7,
                ?8, ?9,
                ?10, ?11,
                ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19, ?20
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.salon_id)
        .bind(&bill.invoice_number)
        .bind(bill.invoice_seq)
        .bind(&bill.idempotency_key)
        .bind(&bill.billed_by_staff_id)
        .bind(&bill.customer_id)
        .bind(bill.services_subtotal_paise)
        .bind(bill.products_subtotal_paise)
        .bind(bill.service_discount_paise)
        .bind(bill.product_discount_paise)
        .bind(&bill.coupon_code)
        .bind(bill.coupon_discount_paise)
        .bind(bill.taxable_paise)
        .bind(bill.tax_rate_bps)
        .bind(bill.tax_paise)
        .bind(bill.final_paise)
        .bind(bill.payment_method)
        .bind(&bill.notes)
        .bind(bill.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let err = DbError::from(e);
            tx.rollback().await?;

            if err.is_unique_on("idempotency_key") {
                debug!(key = %draft.idempotency_key, "Idempotency key already committed");
                let existing = self
                    .get_by_idempotency_key(&draft.salon_id, &draft.idempotency_key)
                    .await?
                    .ok_or_else(|| DbError::not_found("Bill", &draft.idempotency_key))?;
                return Ok(CommitResult {
                    bill: existing,
                    created: false,
                });
            }
            return Err(err);
        }

        for item in &bill.items {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, line_no, kind, ref_id, name,
                    unit_price_paise, quantity, line_total_paise, performing_staff_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&item.id)
            .bind(&item.bill_id)
            .bind(item.line_no)
            .bind(item.kind)
            .bind(&item.ref_id)
            .bind(&item.name)
            .bind(item.unit_price_paise)
            .bind(item.quantity)
            .bind(item.line_total_paise)
            .bind(&item.performing_staff_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %bill.id,
            invoice_number = %bill.invoice_number,
            final_paise = bill.final_paise,
            items = bill.items.len(),
            "Bill committed"
        );

        Ok(CommitResult { bill, created: true })
    }

    async fn with_items(&self, bill: Option<Bill>) -> DbResult<Option<Bill>> {
        match bill {
            Some(mut bill) => {
                bill.items = self.items_for(&bill.id).await?;
                Ok(Some(bill))
            }
            None => Ok(None),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use salon_core::{
        price, DiscountScope, DiscountSpec, ItemKind, LineItem, Money, PaymentMethod, TaxRate,
    };

    fn draft(salon_id: &str, key: &str) -> BillDraft {
        let items = vec![
            LineItem::service("svc-1", "Haircut", Money::from_paise(50_000), Some("st-1".into())),
            LineItem::product("prd-1", "Shampoo", Money::from_paise(10_000), 2),
        ];
        let discount = DiscountSpec::percent(DiscountScope::Services, 1000);
        let invoice = price(&items, Some(&discount), None, None, TaxRate::from_bps(1800)).unwrap();

        BillDraft {
            salon_id: salon_id.to_string(),
            idempotency_key: key.to_string(),
            billed_by_staff_id: "st-1".to_string(),
            customer_id: Some("cust-1".to_string()),
            payment_method: PaymentMethod::Card,
            notes: None,
            invoice,
        }
    }

    #[tokio::test]
    async fn test_commit_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result = db.bills().commit(&draft("salon-1", "key-00000001")).await.unwrap();
        assert!(result.created);
        assert_eq!(result.bill.invoice_number, "INV-000001");
        assert_eq!(result.bill.final_paise, 76_700);

        let loaded = db.bills().get_by_id(&result.bill.id).await.unwrap().unwrap();
        assert_eq!(loaded.invoice_number, result.bill.invoice_number);
        assert_eq!(loaded.customer_id.as_deref(), Some("cust-1"));
        assert_eq!(loaded.items, result.bill.items);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].kind, ItemKind::Service);
        assert_eq!(loaded.items[1].quantity, 2);
        assert_eq!(loaded.payment_method, PaymentMethod::Card);
    }

    #[tokio::test]
    async fn test_same_key_returns_existing_bill() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = db.bills().commit(&draft("salon-1", "key-00000001")).await.unwrap();
        let second = db.bills().commit(&draft("salon-1", "key-00000001")).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.bill.id, second.bill.id);

        // The rolled-back attempt did not consume a number
        let third = db.bills().commit(&draft("salon-1", "key-00000002")).await.unwrap();
        assert_eq!(third.bill.invoice_seq, 2);
    }

    #[tokio::test]
    async fn test_overflowing_line_commits_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut bad = draft("salon-1", "key-00000001");
        bad.invoice
            .line_items
            .push(LineItem::product("prd-big", "Bulk", Money::from_paise(i64::MAX), 2));

        let err = db.bills().commit(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation { .. }));
        assert!(db
            .bills()
            .get_by_idempotency_key("salon-1", "key-00000001")
            .await
            .unwrap()
            .is_none());

        // The sequence bump was rolled back with it
        let next = db.bills().commit(&draft("salon-1", "key-00000002")).await.unwrap();
        assert_eq!(next.bill.invoice_seq, 1);
    }

    #[tokio::test]
    async fn test_sequences_are_per_salon() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let a1 = db.bills().commit(&draft("salon-a", "key-a-000001")).await.unwrap();
        let b1 = db.bills().commit(&draft("salon-b", "key-b-000001")).await.unwrap();
        let a2 = db.bills().commit(&draft("salon-a", "key-a-000002")).await.unwrap();

        assert_eq!(a1.bill.invoice_seq, 1);
        assert_eq!(b1.bill.invoice_seq, 1);
        assert_eq!(a2.bill.invoice_seq, 2);

        // Same key under another salon is a different bill
        let b_same = db.bills().commit(&draft("salon-b", "key-a-000001")).await.unwrap();
        assert!(b_same.created);
    }

    #[tokio::test]
    async fn test_bills_are_append_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = db.bills().commit(&draft("salon-1", "key-00000001")).await.unwrap();

        let err = sqlx::query("UPDATE bills SET final_paise = 0 WHERE id = ?1")
            .bind(&result.bill.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_same_key_commits_once() {
        let path = std::env::temp_dir().join(format!("salon-bill-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let repo = db.bills();
            handles.push(tokio::spawn(async move {
                repo.commit(&draft("salon-1", "key-racing-01")).await
            }));
        }

        let mut ids = Vec::new();
        let mut created = 0;
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            if result.created {
                created += 1;
            }
            ids.push(result.bill.id);
        }

        assert_eq!(created, 1);
        assert!(ids.iter().all(|id| id == &ids[0]));

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
