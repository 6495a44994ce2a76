//! # Inventory Deduction Service
//!
//! Second phase of checkout: decrements stock for a committed bill.
//!
//! ## Failure Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bill committed ──► for each product line (independently):              │
//! │                                                                         │
//! │     Applied / AlreadyApplied ──► resolve any open exception             │
//! │                                                                         │
//! │     Failed(insufficient, unknown product, storage)                      │
//! │          ──► queue InventoryException + warn! log                       │
//! │          ──► caller reports "sale recorded; inventory update            │
//! │              incomplete for <product>"                                  │
//! │                                                                         │
//! │  The bill is never rolled back. Re-running is always safe: the          │
//! │  ledger holds at most one movement per (bill, product).                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, error, info, warn};

use salon_core::{
    Bill, DeductionFailure, DeductionLine, DeductionLineStatus, DeductionReport,
    InventoryStatus, ProductLine, StockMovement,
};
use salon_db::{Database, DbError, DeductOutcome, NewException};

/// Errors that stop a deduction request before any line runs.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

#[derive(Debug, Clone)]
pub struct InventoryService {
    db: Database,
}

impl InventoryService {
    pub fn new(db: Database) -> Self {
        InventoryService { db }
    }

    /// Applies the requested deduction lines for a bill.
    ///
    /// Each line must name a product on the bill with the bill's quantity;
    /// mismatches fail that line only and are not queued.
    pub async fn apply(
        &self,
        bill_id: &str,
        lines: &[ProductLine],
    ) -> Result<DeductionReport, InventoryError> {
        let bill = self
            .db
            .bills()
            .get_by_id(bill_id)
            .await?
            .ok_or_else(|| InventoryError::BillNotFound(bill_id.to_string()))?;

        let billed = bill.product_lines();
        let mut report_lines = Vec::with_capacity(lines.len());

        for line in lines {
            let name = bill
                .product_name(&line.product_id)
                .unwrap_or(&line.product_id)
                .to_string();

            let outcome = match billed.iter().find(|b| b.product_id == line.product_id) {
                None => failed(line, name, DeductionFailure::NotOnBill),
                Some(b) if b.quantity != line.quantity => failed(
                    line,
                    name,
                    DeductionFailure::QuantityMismatch {
                        expected: b.quantity,
                    },
                ),
                Some(_) => self.deduct_line(&bill, line, name).await,
            };
            report_lines.push(outcome);
        }

        let status = self.status_for(&bill).await?;

        Ok(DeductionReport {
            bill_id: bill.id,
            status,
            lines: report_lines,
        })
    }

    /// Deducts (or finishes deducting) every product line of a bill.
    pub async fn apply_all(&self, bill_id: &str) -> Result<DeductionReport, InventoryError> {
        let bill = self
            .db
            .bills()
            .get_by_id(bill_id)
            .await?
            .ok_or_else(|| InventoryError::BillNotFound(bill_id.to_string()))?;

        Ok(self.deduct_detached(&bill).await)
    }

    /// Deducts every product line of `bill`. Never fails as a whole: storage
    /// errors become failed lines.
    pub async fn deduct_for_bill(&self, bill: &Bill) -> DeductionReport {
        let lines = bill.product_lines();
        if lines.is_empty() {
            return DeductionReport::not_applicable(&bill.id);
        }

        let mut report_lines = Vec::with_capacity(lines.len());
        for line in &lines {
            let name = bill
                .product_name(&line.product_id)
                .unwrap_or(&line.product_id)
                .to_string();
            report_lines.push(self.deduct_line(bill, line, name).await);
        }

        let moved = report_lines
            .iter()
            .filter(|l| l.status != DeductionLineStatus::Failed)
            .count();
        let status = InventoryStatus::derive(lines.len(), moved);

        if status == InventoryStatus::Deducted {
            info!(bill_id = %bill.id, lines = lines.len(), "Inventory deducted");
        } else {
            warn!(
                bill_id = %bill.id,
                moved,
                total = lines.len(),
                "Inventory deduction incomplete"
            );
        }

        DeductionReport {
            bill_id: bill.id.clone(),
            status,
            lines: report_lines,
        }
    }

    /// Runs [`Self::deduct_for_bill`] on its own task so a dropped request
    /// cannot stop it between lines.
    pub async fn deduct_detached(&self, bill: &Bill) -> DeductionReport {
        let service = self.clone();
        let owned = bill.clone();
        let task = tokio::spawn(async move { service.deduct_for_bill(&owned).await });

        match task.await {
            Ok(report) => report,
            Err(e) => {
                error!(bill_id = %bill.id, error = %e, "Deduction task failed");
                self.interrupted(bill, &e.to_string()).await
            }
        }
    }

    /// Inventory status of `bill`, derived from the ledger.
    pub async fn status_for(&self, bill: &Bill) -> Result<InventoryStatus, DbError> {
        let products = bill.product_lines().len();
        if products == 0 {
            return Ok(InventoryStatus::NotApplicable);
        }
        let moved = self.db.inventory().movements_for_bill(&bill.id).await?.len();
        Ok(InventoryStatus::derive(products, moved))
    }

    async fn interrupted(&self, bill: &Bill, message: &str) -> DeductionReport {
        if bill.product_lines().is_empty() {
            return DeductionReport::not_applicable(&bill.id);
        }
        let ledger = match self.db.inventory().movements_for_bill(&bill.id).await {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(bill_id = %bill.id, error = %e, "Could not read stock ledger");
                Vec::new()
            }
        };
        interrupted_report(bill, &ledger, message)
    }

    async fn deduct_line(&self, bill: &Bill, line: &ProductLine, name: String) -> DeductionLine {
        let repo = self.db.inventory();

        let (status, movement, failure) =
            match repo.deduct(&bill.id, &line.product_id, line.quantity).await {
                Ok(DeductOutcome::Applied(m)) => (DeductionLineStatus::Applied, Some(m), None),
                Ok(DeductOutcome::AlreadyApplied(m)) => {
                    (DeductionLineStatus::AlreadyApplied, Some(m), None)
                }
                Ok(DeductOutcome::Insufficient { available }) => (
                    DeductionLineStatus::Failed,
                    None,
                    Some(DeductionFailure::InsufficientStock { available }),
                ),
                Ok(DeductOutcome::ProductNotFound) => (
                    DeductionLineStatus::Failed,
                    None,
                    Some(DeductionFailure::ProductNotFound),
                ),
                Err(e) => (
                    DeductionLineStatus::Failed,
                    None,
                    Some(DeductionFailure::Storage {
                        message: e.to_string(),
                    }),
                ),
            };

        match &failure {
            None => {
                if let Err(e) = repo.resolve_exceptions(&bill.id, &line.product_id).await {
                    warn!(bill_id = %bill.id, product_id = %line.product_id, error = %e, "Failed to resolve inventory exception");
                }
            }
            Some(failure) => self.queue(bill, line, &name, failure).await,
        }

        DeductionLine {
            product_id: line.product_id.clone(),
            product_name: name,
            quantity: line.quantity,
            status,
            movement,
            failure,
        }
    }

    async fn queue(&self, bill: &Bill, line: &ProductLine, name: &str, failure: &DeductionFailure) {
        let available = match failure {
            DeductionFailure::InsufficientStock { available } => Some(*available),
            _ => None,
        };

        warn!(
            bill_id = %bill.id,
            invoice = %bill.invoice_number,
            product_id = %line.product_id,
            requested = line.quantity,
            available = ?available,
            reason = failure.code(),
            "Inventory deduction failed"
        );

        if !failure.is_queued() {
            return;
        }

        let exception = NewException {
            billing_id: &bill.id,
            product_id: &line.product_id,
            product_name: name,
            requested: line.quantity,
            available,
            reason: failure.code(),
        };
        match self.db.inventory().record_exception(&exception).await {
            Ok(queued) => debug!(exception_id = %queued.id, "Exception queued"),
            Err(e) => error!(
                bill_id = %bill.id,
                product_id = %line.product_id,
                error = %e,
                "Failed to queue inventory exception"
            ),
        }
    }
}

fn failed(line: &ProductLine, name: String, failure: DeductionFailure) -> DeductionLine {
    DeductionLine {
        product_id: line.product_id.clone(),
        product_name: name,
        quantity: line.quantity,
        status: DeductionLineStatus::Failed,
        movement: None,
        failure: Some(failure),
    }
}

/// Report for a deduction task that died before finishing. Lines with a
/// movement in `ledger` landed; the rest are reported failed and a retry
/// picks them up.
fn interrupted_report(bill: &Bill, ledger: &[StockMovement], message: &str) -> DeductionReport {
    let products = bill.product_lines();
    let lines: Vec<DeductionLine> = products
        .iter()
        .map(|line| {
            let name = bill
                .product_name(&line.product_id)
                .unwrap_or(&line.product_id)
                .to_string();
            match ledger.iter().find(|m| m.product_id == line.product_id) {
                Some(movement) => DeductionLine {
                    product_id: line.product_id.clone(),
                    product_name: name,
                    quantity: line.quantity,
                    status: DeductionLineStatus::AlreadyApplied,
                    movement: Some(movement.clone()),
                    failure: None,
                },
                None => failed(
                    line,
                    name,
                    DeductionFailure::Storage {
                        message: message.to_string(),
                    },
                ),
            }
        })
        .collect();

    let moved = lines.iter().filter(|l| l.failure.is_none()).count();

    DeductionReport {
        bill_id: bill.id.clone(),
        status: InventoryStatus::derive(products.len(), moved),
        lines,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use salon_core::{price, BillDraft, LineItem, Money, PaymentMethod, Product, TaxRate};
    use salon_db::DbConfig;

    async fn setup() -> (Database, InventoryService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, name, stock) in [("p-shampoo", "Shampoo", 5), ("p-cond", "Conditioner", 1)] {
            let now = Utc::now();
            db.catalog()
                .insert_product(&Product {
                    id: id.to_string(),
                    sku: id.to_uppercase(),
                    name: name.to_string(),
                    price_paise: 10_000,
                    current_stock: stock,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        let service = InventoryService::new(db.clone());
        (db, service)
    }

    async fn commit(db: &Database, key: &str, items: Vec<LineItem>) -> Bill {
        let invoice = price(&items, None, None, None, TaxRate::from_bps(1800)).unwrap();
        let draft = BillDraft {
            salon_id: "salon-1".to_string(),
            idempotency_key: key.to_string(),
            billed_by_staff_id: "st-1".to_string(),
            customer_id: None,
            payment_method: PaymentMethod::Upi,
            notes: None,
            invoice,
        };
        db.bills().commit(&draft).await.unwrap().bill
    }

    fn products() -> Vec<LineItem> {
        vec![
            LineItem::product("p-shampoo", "Shampoo", Money::from_rupees(100), 2),
            LineItem::product("p-cond", "Conditioner", Money::from_rupees(100), 1),
        ]
    }

    #[tokio::test]
    async fn test_full_deduction() {
        let (db, service) = setup().await;
        let bill = commit(&db, "key-full-001", products()).await;

        let report = service.deduct_for_bill(&bill).await;
        assert_eq!(report.status, InventoryStatus::Deducted);
        assert!(report.warnings().is_empty());
        assert_eq!(db.catalog().get_product("p-shampoo").await.unwrap().unwrap().current_stock, 3);

        // Running again changes nothing
        let again = service.deduct_for_bill(&bill).await;
        assert!(again
            .lines
            .iter()
            .all(|l| l.status == DeductionLineStatus::AlreadyApplied));
        assert_eq!(db.catalog().get_product("p-shampoo").await.unwrap().unwrap().current_stock, 3);
    }

    #[tokio::test]
    async fn test_oversold_line_fails_alone_and_is_queued() {
        let (db, service) = setup().await;
        let bill = commit(&db, "key-race-001", products()).await;

        // Another counter sold the last conditioner after validation
        db.catalog().set_stock("p-cond", 0).await.unwrap();

        let report = service.deduct_for_bill(&bill).await;
        assert_eq!(report.status, InventoryStatus::PartiallyDeducted);
        assert_eq!(report.lines[0].status, DeductionLineStatus::Applied);
        assert_eq!(
            report.lines[1].failure,
            Some(DeductionFailure::InsufficientStock { available: 0 })
        );
        assert_eq!(
            report.warnings(),
            vec!["sale recorded; inventory update incomplete for Conditioner".to_string()]
        );

        // The bill stands with one movement
        assert!(db.bills().get_by_id(&bill.id).await.unwrap().is_some());
        assert_eq!(db.inventory().movements_for_bill(&bill.id).await.unwrap().len(), 1);

        let open = db.inventory().open_exceptions_for_bill(&bill.id).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].product_name, "Conditioner");
        assert_eq!(open[0].reason, "insufficient_stock");

        // Restock and retry the failed line: it lands and the exception closes
        db.catalog().set_stock("p-cond", 4).await.unwrap();
        let retry = service
            .apply(&bill.id, &[ProductLine { product_id: "p-cond".to_string(), quantity: 1 }])
            .await
            .unwrap();
        assert_eq!(retry.status, InventoryStatus::Deducted);
        assert_eq!(retry.lines[0].status, DeductionLineStatus::Applied);
        assert!(db.inventory().open_exceptions_for_bill(&bill.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_rejects_lines_not_matching_bill() {
        let (db, service) = setup().await;
        let bill = commit(&db, "key-match-001", products()).await;

        let report = service
            .apply(
                &bill.id,
                &[
                    ProductLine { product_id: "p-other".to_string(), quantity: 1 },
                    ProductLine { product_id: "p-shampoo".to_string(), quantity: 5 },
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.lines[0].failure, Some(DeductionFailure::NotOnBill));
        assert_eq!(
            report.lines[1].failure,
            Some(DeductionFailure::QuantityMismatch { expected: 2 })
        );
        assert_eq!(report.status, InventoryStatus::Pending);
        assert!(db.inventory().open_exceptions(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_report_reads_the_ledger() {
        let (db, service) = setup().await;
        let bill = commit(&db, "key-intr-001", products()).await;

        // Only the shampoo line landed before the task died
        service
            .apply(&bill.id, &[ProductLine { product_id: "p-shampoo".to_string(), quantity: 2 }])
            .await
            .unwrap();
        let ledger = db.inventory().movements_for_bill(&bill.id).await.unwrap();

        let report = interrupted_report(&bill, &ledger, "task panicked");
        assert_eq!(report.status, InventoryStatus::PartiallyDeducted);
        assert_eq!(report.lines[0].status, DeductionLineStatus::AlreadyApplied);
        assert_eq!(report.lines[0].movement.as_ref().map(|m| m.quantity_change), Some(-2));
        assert_eq!(report.lines[1].status, DeductionLineStatus::Failed);
        assert_eq!(
            report.warnings(),
            vec!["sale recorded; inventory update incomplete for Conditioner".to_string()]
        );

        let nothing_landed = interrupted_report(&bill, &[], "task panicked");
        assert_eq!(nothing_landed.status, InventoryStatus::Pending);

        let from_ledger = service.interrupted(&bill, "task panicked").await;
        assert_eq!(from_ledger.status, InventoryStatus::PartiallyDeducted);
    }

    #[tokio::test]
    async fn test_apply_unknown_bill() {
        let (_db, service) = setup().await;
        let err = service.apply("missing", &[]).await.unwrap_err();
        assert!(matches!(err, InventoryError::BillNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_services_only_bill_is_not_applicable() {
        let (db, service) = setup().await;
        let bill = commit(
            &db,
            "key-svc-0001",
            vec![LineItem::service("svc-1", "Haircut", Money::from_rupees(500), Some("st-1".to_string()))],
        )
        .await;

        let report = service.deduct_detached(&bill).await;
        assert_eq!(report.status, InventoryStatus::NotApplicable);
        assert!(report.lines.is_empty());
        assert_eq!(service.status_for(&bill).await.unwrap(), InventoryStatus::NotApplicable);
    }
}
