//! # Checkout Service
//!
//! Orchestrates a checkout from request to committed bill.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Checkout Flow                                  │
//! │                                                                         │
//! │  idempotency key ──► invalid ──────────────────────────► 400            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  bill exists for (salon, key)? ──yes──► replay: same bill, resume       │
//! │       │ no                              inventory deduction             │
//! │       ▼                                                                 │
//! │  build cart from catalog (prices frozen server-side)                    │
//! │  revalidate coupon against the server subtotal                          │
//! │  price ──► InvalidLineItem / InvalidDiscount ──────────► 400            │
//! │  check invariants ──► violations ──────────────────────► 422            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BillRepository::commit (one transaction) ──► failure ─► 503            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  count coupon use (new bills only)                                      │
//! │  InventoryService::deduct_detached ──► per-line report                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once a bill exists the checkout has succeeded. Inventory problems after
//! that point are reported as warnings, never as a failed checkout.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use salon_core::validation::{validate_cart_size, validate_idempotency_key};
use salon_core::{
    validate_checkout, Bill, BillDraft, Cart, CheckoutInput, CoreError, CouponResult,
    DeductionReport, DiscountScope, DiscountSpec, ItemKind, PaymentMethod, PricedInvoice, TaxRate,
    ValidationError, Violation,
};
use salon_db::{CommitResult, Database, DbError};

use super::coupon::CouponService;
use super::inventory::InventoryService;

// =============================================================================
// Request / Outcome Types
// =============================================================================

/// One requested cart line. Prices and names come from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub kind: ItemKind,
    pub ref_id: String,
    /// Products only; services are always quantity 1.
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub performing_staff_id: Option<String>,
}

/// A checkout (or quote) request from the billing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutRequest {
    /// Used when the `Idempotency-Key` header is absent.
    pub idempotency_key: Option<String>,
    pub billed_by_staff_id: Option<String>,
    pub customer_id: Option<String>,
    pub items: Vec<CartLineRequest>,
    pub service_discount: Option<DiscountSpec>,
    pub product_discount: Option<DiscountSpec>,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// A priced cart plus everything that would block committing it.
#[derive(Debug, Clone)]
pub struct PreparedCheckout {
    pub cart: Cart,
    pub invoice: PricedInvoice,
    pub coupon: Option<CouponResult>,
    pub violations: Vec<Violation>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub bill: Bill,
    /// True when the key had already produced this bill.
    pub replayed: bool,
    pub inventory: DeductionReport,
}

impl CheckoutOutcome {
    pub fn warnings(&self) -> Vec<String> {
        self.inventory.warnings()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Invalid idempotency key: {0}")]
    InvalidKey(ValidationError),

    #[error(transparent)]
    InvalidRequest(#[from] CoreError),

    #[error("Checkout blocked by {} violation(s)", .0.len())]
    ValidationFailed(Vec<Violation>),

    /// The bill could not be persisted. Retrying with the same key is safe.
    #[error("Commit failed: {0}")]
    CommitFailed(DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    tax_rate: TaxRate,
    coupons: CouponService,
    inventory: InventoryService,
}

impl CheckoutService {
    pub fn new(
        db: Database,
        tax_rate: TaxRate,
        coupons: CouponService,
        inventory: InventoryService,
    ) -> Self {
        CheckoutService {
            db,
            tax_rate,
            coupons,
            inventory,
        }
    }

    /// Commits `request` as a bill for `salon_id`, exactly once per key.
    pub async fn checkout(
        &self,
        salon_id: &str,
        idempotency_key: &str,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let key = validate_idempotency_key(idempotency_key).map_err(CheckoutError::InvalidKey)?;

        if let Some(bill) = self.db.bills().get_by_idempotency_key(salon_id, &key).await? {
            info!(
                bill_id = %bill.id,
                invoice = %bill.invoice_number,
                "Replaying checkout for existing key"
            );
            let inventory = self.inventory.deduct_detached(&bill).await;
            return Ok(CheckoutOutcome {
                bill,
                replayed: true,
                inventory,
            });
        }

        let prepared = self.prepare(request).await?;
        self.commit(salon_id, &key, request, prepared).await
    }

    /// Commits an already prepared cart and deducts its stock.
    ///
    /// Stock may have moved since `prepare` ran. The bill still stands; lines
    /// that can no longer be deducted come back failed in the report.
    pub async fn commit(
        &self,
        salon_id: &str,
        idempotency_key: &str,
        request: &CheckoutRequest,
        prepared: PreparedCheckout,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let key = validate_idempotency_key(idempotency_key).map_err(CheckoutError::InvalidKey)?;

        if !prepared.violations.is_empty() {
            debug!(count = prepared.violations.len(), "Checkout blocked by violations");
            return Err(CheckoutError::ValidationFailed(prepared.violations));
        }

        let draft = BillDraft {
            salon_id: salon_id.to_string(),
            idempotency_key: key,
            billed_by_staff_id: request
                .billed_by_staff_id
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            customer_id: request.customer_id.clone(),
            payment_method: request.payment_method,
            notes: request.notes.clone(),
            invoice: prepared.invoice,
        };

        let CommitResult { bill, created } = self
            .db
            .bills()
            .commit(&draft)
            .await
            .map_err(CheckoutError::CommitFailed)?;

        if created {
            if let Some(code) = &bill.coupon_code {
                match self.coupons.record_use(code).await {
                    Ok(true) => {}
                    Ok(false) => warn!(code = %code, bill_id = %bill.id, "Coupon limit reached before usage was counted"),
                    Err(e) => warn!(code = %code, bill_id = %bill.id, error = %e, "Failed to count coupon use"),
                }
            }
        }

        let inventory = self.inventory.deduct_detached(&bill).await;

        Ok(CheckoutOutcome {
            bill,
            replayed: !created,
            inventory,
        })
    }

    /// Builds, prices and validates `request` without committing anything.
    ///
    /// Unknown or inactive catalog entries and a rejected coupon are
    /// reported as violations alongside the invariant checks. Malformed
    /// lines and discounts are errors.
    pub async fn prepare(&self, request: &CheckoutRequest) -> Result<PreparedCheckout, CheckoutError> {
        validate_cart_size(request.items.len()).map_err(CoreError::from)?;

        let (mut cart, mut violations) = self.build_cart(request).await?;

        cart = cart.set_discount(DiscountScope::Services, request.service_discount)?;
        cart = cart.set_discount(DiscountScope::Products, request.product_discount)?;

        let mut coupon = None;
        if let Some(code) = request.coupon_code.as_deref().filter(|c| !c.trim().is_empty()) {
            let result = self.coupons.validate(code, cart.gross_subtotal()).await?;
            if result.valid {
                cart = cart.apply_coupon(&result)?;
            } else {
                violations.push(Violation::CouponRejected {
                    code: result.code.clone(),
                    message: result.message.clone(),
                });
            }
            coupon = Some(result);
        }

        let invoice = cart.price(self.tax_rate)?;

        let active_staff: HashSet<String> = self.db.staff().active_ids().await?;
        let product_ids: Vec<String> = cart
            .lines()
            .iter()
            .filter(|l| l.is_product())
            .map(|l| l.ref_id.clone())
            .collect();
        let stock: HashMap<String, i64> = self.db.catalog().stock_levels(&product_ids).await?;

        let input = CheckoutInput {
            biller_id: request.billed_by_staff_id.as_deref(),
            line_items: cart.lines(),
            active_staff: &active_staff,
            stock: &stock,
        };
        if let Err(found) = validate_checkout(&input) {
            violations.extend(found);
        }

        Ok(PreparedCheckout {
            cart,
            invoice,
            coupon,
            violations,
        })
    }

    /// Resolves each requested line against the catalog.
    async fn build_cart(&self, request: &CheckoutRequest) -> Result<(Cart, Vec<Violation>), CheckoutError> {
        let mut cart = Cart::new();
        let mut violations = Vec::new();

        for line in &request.items {
            match line.kind {
                ItemKind::Service => {
                    if line.quantity.is_some_and(|q| q != 1) {
                        return Err(CoreError::InvalidLineItem {
                            ref_id: line.ref_id.clone(),
                            reason: "service lines have quantity 1".to_string(),
                        }
                        .into());
                    }
                    match self.db.catalog().get_service(&line.ref_id).await? {
                        Some(service) if service.is_active => {
                            cart = cart.add_service(&service, line.performing_staff_id.clone())?;
                        }
                        Some(_) => violations.push(unavailable(&line.ref_id, "service is inactive")),
                        None => violations.push(unavailable(&line.ref_id, "unknown service")),
                    }
                }
                ItemKind::Product => {
                    let quantity = line.quantity.unwrap_or(1);
                    match self.db.catalog().get_product(&line.ref_id).await? {
                        Some(product) if product.is_active => {
                            cart = cart.add_product(&product, quantity)?;
                        }
                        Some(_) => violations.push(unavailable(&line.ref_id, "product is inactive")),
                        None => violations.push(unavailable(&line.ref_id, "unknown product")),
                    }
                }
            }
        }

        Ok((cart, violations))
    }
}

fn unavailable(ref_id: &str, reason: &str) -> Violation {
    Violation::ItemUnavailable {
        ref_id: ref_id.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
