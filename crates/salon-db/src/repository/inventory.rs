//! # Inventory Repository
//!
//! The append-only stock ledger and the inventory exception queue.
//!
//! ## Deducting One Line
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  movement exists for (bill, product)? ──yes──► AlreadyApplied           │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    UPDATE products                                                      │
//! │       SET current_stock = current_stock - q                             │
//! │     WHERE id = ? AND current_stock >= q      ◄── check and decrement    │
//! │     RETURNING current_stock                      in one statement       │
//! │       │                                                                 │
//! │       ├── no row ──► ROLLBACK ──► Insufficient { available }            │
//! │       │                           or ProductNotFound                    │
//! │       ▼                                                                 │
//! │    INSERT stock_movements (UNIQUE billing_id, product_id)               │
//! │       │                                                                 │
//! │       ├── conflict ──► ROLLBACK (decrement undone) ──► AlreadyApplied   │
//! │       ▼                                                                 │
//! │  COMMIT ──► Applied                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock can never go negative: a concurrent sale either sees enough stock
//! in the same statement that removes it, or it sees too little and fails.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use salon_core::{InventoryException, MovementType, StockMovement};

const MOVEMENT_COLUMNS: &str = "id, product_id, billing_id, quantity_change, quantity_before, \
     quantity_after, movement_type, created_at";

const EXCEPTION_COLUMNS: &str = "id, billing_id, product_id, product_name, requested, available, \
     reason, created_at, resolved_at";

/// Outcome of [`InventoryRepository::deduct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeductOutcome {
    /// Stock was decremented and this movement recorded.
    Applied(StockMovement),
    /// A movement for this (bill, product) already existed.
    AlreadyApplied(StockMovement),
    /// Stock was below the requested quantity; nothing changed.
    Insufficient { available: i64 },
    ProductNotFound,
}

/// A failed deduction line to queue for an operator.
#[derive(Debug, Clone)]
pub struct NewException<'a> {
    pub billing_id: &'a str,
    pub product_id: &'a str,
    pub product_name: &'a str,
    pub requested: i64,
    pub available: Option<i64>,
    pub reason: &'a str,
}

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// The movement for one bill line, if deducted.
    pub async fn movement_for(&self, bill_id: &str, product_id: &str) -> DbResult<Option<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE billing_id = ?1 AND product_id = ?2"
        );
        let movement = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(bill_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movement)
    }

    /// Every movement recorded for a bill.
    pub async fn movements_for_bill(&self, bill_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE billing_id = ?1 ORDER BY created_at"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Deducts `quantity` of `product_id` for `bill_id`, at most once.
    ///
    /// ## Errors
    /// Storage failures only. Business outcomes (insufficient stock, unknown
    /// product, already applied) are [`DeductOutcome`] values.
    pub async fn deduct(&self, bill_id: &str, product_id: &str, quantity: i64) -> DbResult<DeductOutcome> {
        if quantity <= 0 {
            return Err(DbError::ConstraintViolation {
                message: format!("deduction quantity must be positive, got {quantity}"),
            });
        }

        if let Some(existing) = self.movement_for(bill_id, product_id).await? {
            debug!(bill_id = %bill_id, product_id = %product_id, "Deduction already applied");
            return Ok(DeductOutcome::AlreadyApplied(existing));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET current_stock = current_stock - ?2, updated_at = ?3
            WHERE id = ?1 AND current_stock >= ?2
            RETURNING current_stock
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(after) = after else {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Ok(match available {
                Some(available) => DeductOutcome::Insufficient { available },
                None => DeductOutcome::ProductNotFound,
            });
        };

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            billing_id: bill_id.to_string(),
            quantity_change: -quantity,
            quantity_before: after + quantity,
            quantity_after: after,
            movement_type: MovementType::BillingDeduction,
            created_at: now,
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, billing_id, quantity_change,
                quantity_before, quantity_after, movement_type, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(&movement.billing_id)
        .bind(movement.quantity_change)
        .bind(movement.quantity_before)
        .bind(movement.quantity_after)
        .bind(movement.movement_type)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            let err = DbError::from(e);
            tx.rollback().await?;

            if err.is_unique_on("billing_id") {
                debug!(bill_id = %bill_id, product_id = %product_id, "Lost deduction race");
                let existing = self
                    .movement_for(bill_id, product_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("StockMovement", product_id))?;
                return Ok(DeductOutcome::AlreadyApplied(existing));
            }
            return Err(err);
        }

        tx.commit().await?;

        info!(
            bill_id = %bill_id,
            product_id = %product_id,
            before = movement.quantity_before,
            after = movement.quantity_after,
            "Stock deducted"
        );

        Ok(DeductOutcome::Applied(movement))
    }

    /// Queues (or refreshes) the open exception for one bill line.
    pub async fn record_exception(&self, new: &NewException<'_>) -> DbResult<InventoryException> {
        let sql = format!(
            r#"
            INSERT INTO inventory_exceptions (
                id, billing_id, product_id, product_name, requested, available, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (billing_id, product_id) WHERE resolved_at IS NULL
            DO UPDATE SET requested = excluded.requested,
                          available = excluded.available,
                          reason = excluded.reason
            RETURNING {EXCEPTION_COLUMNS}
            "#
        );

        let exception = sqlx::query_as::<_, InventoryException>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(new.billing_id)
            .bind(new.product_id)
            .bind(new.product_name)
            .bind(new.requested)
            .bind(new.available)
            .bind(new.reason)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        debug!(
            id = %exception.id,
            bill_id = %new.billing_id,
            product_id = %new.product_id,
            reason = %new.reason,
            "Inventory exception queued"
        );

        Ok(exception)
    }

    /// Marks the open exception for one bill line resolved. Returns the
    /// number of rows resolved (0 or 1).
    pub async fn resolve_exceptions(&self, bill_id: &str, product_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_exceptions
            SET resolved_at = ?3
            WHERE billing_id = ?1 AND product_id = ?2 AND resolved_at IS NULL
            "#,
        )
        .bind(bill_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Unresolved exceptions, oldest first.
    pub async fn open_exceptions(&self, limit: u32) -> DbResult<Vec<InventoryException>> {
        let sql = format!(
            "SELECT {EXCEPTION_COLUMNS} FROM inventory_exceptions \
             WHERE resolved_at IS NULL ORDER BY created_at LIMIT ?1"
        );
        let exceptions = sqlx::query_as::<_, InventoryException>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(exceptions)
    }

    /// Unresolved exceptions for one bill.
    pub async fn open_exceptions_for_bill(&self, bill_id: &str) -> DbResult<Vec<InventoryException>> {
        let sql = format!(
            "SELECT {EXCEPTION_COLUMNS} FROM inventory_exceptions \
             WHERE billing_id = ?1 AND resolved_at IS NULL ORDER BY created_at"
        );
        let exceptions = sqlx::query_as::<_, InventoryException>(&sql)
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(exceptions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
