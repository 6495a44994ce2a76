//! # Domain Types
//!
//! Core domain types used throughout the checkout engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  EPHEMERAL (priced, never stored as-is)                                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │  DiscountSpec   │   │  PricedInvoice  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  kind           │   │  scope          │   │  subtotals      │       │
//! │  │  ref_id         │   │  mode           │   │  discounts      │       │
//! │  │  unit_price     │   │  value          │   │  taxable / tax  │       │
//! │  │  performing_    │   └─────────────────┘   │  final_amount   │       │
//! │  │   staff_id      │                         └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  APPEND-ONLY (persisted, never updated)                                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Bill       │   │  StockMovement  │   │   Inventory     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │   Exception     │       │
//! │  │  invoice_number │   │  billing_id     │   │  ─────────────  │       │
//! │  │  idempotency_key│   │  product_id     │   │  billing_id     │       │
//! │  │  pricing snap   │   │  before / after │   │  requested      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  READ-ONLY (owned by other parts of the salon app)                      │
//! │  Product, CatalogService, StaffMember                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A bill copies every price, name and pricing figure at commit time. Later
//! catalog edits never change a committed bill.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (GST on salon services)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// Whether a line is a performed service or a retail product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Service,
    Product,
}

/// One line of a cart or bill.
///
/// `unit_price` is frozen from the catalog when the line is added; the
/// pricing engine never looks prices up again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub kind: ItemKind,
    /// Catalog id of the service or product.
    pub ref_id: String,
    /// Display name at time of sale (frozen).
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// Required for service lines, absent for product lines.
    pub performing_staff_id: Option<String>,
}

impl LineItem {
    /// A service line attributed to the staff member who performed it.
    pub fn service(
        ref_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        performing_staff_id: Option<String>,
    ) -> Self {
        LineItem {
            kind: ItemKind::Service,
            ref_id: ref_id.into(),
            name: name.into(),
            unit_price,
            quantity: 1,
            performing_staff_id,
        }
    }

    /// A product line.
    pub fn product(
        ref_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> Self {
        LineItem {
            kind: ItemKind::Product,
            ref_id: ref_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            performing_staff_id: None,
        }
    }

    #[inline]
    pub fn is_service(&self) -> bool {
        self.kind == ItemKind::Service
    }

    #[inline]
    pub fn is_product(&self) -> bool {
        self.kind == ItemKind::Product
    }
}

// =============================================================================
// Discounts
// =============================================================================

/// Which subtotal a manual discount applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    Services,
    Products,
}

impl std::fmt::Display for DiscountScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountScope::Services => write!(f, "services"),
            DiscountScope::Products => write!(f, "products"),
        }
    }
}

/// Percent (value in basis points) or fixed (value in paise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountMode {
    Percent,
    Fixed,
}

/// A manual discount entered at the billing page.
///
/// ## Value Units
/// - `Percent`: basis points, 0..=10000 (1000 = 10%)
/// - `Fixed`: paise, clamped to the scope subtotal when applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSpec {
    pub scope: DiscountScope,
    pub mode: DiscountMode,
    pub value: i64,
}

impl DiscountSpec {
    pub fn percent(scope: DiscountScope, bps: i64) -> Self {
        DiscountSpec {
            scope,
            mode: DiscountMode::Percent,
            value: bps,
        }
    }

    pub fn fixed(scope: DiscountScope, amount: Money) -> Self {
        DiscountSpec {
            scope,
            mode: DiscountMode::Fixed,
            value: amount.paise(),
        }
    }
}

// =============================================================================
// Priced Invoice
// =============================================================================

/// Output of the pricing engine.
///
/// ## Identities
/// ```text
/// taxable = (services_subtotal - service_discount)
///         + (products_subtotal - product_discount)
/// final   = taxable + tax
/// ```
/// When a coupon is applied, `coupon_discount` equals the sum of the two
/// scope discounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedInvoice {
    pub services_subtotal: Money,
    pub products_subtotal: Money,
    pub service_discount: Money,
    pub product_discount: Money,
    pub coupon_code: Option<String>,
    pub coupon_discount: Money,
    pub taxable_amount: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub final_amount: Money,
    pub line_items: Vec<LineItem>,
}

impl PricedInvoice {
    /// Services plus products, before any discount.
    #[inline]
    pub fn gross_subtotal(&self) -> Money {
        self.services_subtotal + self.products_subtotal
    }

    /// Total discount across both scopes.
    #[inline]
    pub fn total_discount(&self) -> Money {
        self.service_discount + self.product_discount
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Recorded on the bill as metadata only.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Card,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Bill
// =============================================================================

/// Everything the checkout flow hands to persistence for one commit.
#[derive(Debug, Clone)]
pub struct BillDraft {
    pub salon_id: String,
    pub idempotency_key: String,
    pub billed_by_staff_id: String,
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub invoice: PricedInvoice,
}

/// Formats a per-salon invoice sequence value as an invoice number.
///
/// ```rust
/// use salon_core::types::invoice_number_for;
///
/// assert_eq!(invoice_number_for(42), "INV-000042");
/// ```
pub fn invoice_number_for(seq: i64) -> String {
    format!("INV-{:06}", seq)
}

/// A committed bill. Append-only: never updated once inserted.
///
/// Pricing figures are stored as flat paise columns so the row can be read
/// back without re-pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub salon_id: String,
    /// Human-readable number, e.g. `INV-000042`.
    pub invoice_number: String,
    pub invoice_seq: i64,
    pub idempotency_key: String,
    pub billed_by_staff_id: String,
    pub customer_id: Option<String>,
    pub services_subtotal_paise: i64,
    pub products_subtotal_paise: i64,
    pub service_discount_paise: i64,
    pub product_discount_paise: i64,
    pub coupon_code: Option<String>,
    pub coupon_discount_paise: i64,
    pub taxable_paise: i64,
    pub tax_rate_bps: i64,
    pub tax_paise: i64,
    pub final_paise: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Loaded separately from `bill_items`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<BillItem>,
}

impl Bill {
    /// Freezes a draft into a bill with the allocated sequence number.
    ///
    /// ## Errors
    /// [`CoreError::InvalidLineItem`] if a line total overflows.
    pub fn from_draft(
        draft: &BillDraft,
        id: String,
        seq: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<Bill> {
        let invoice = &draft.invoice;
        let items = invoice
            .line_items
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let line_total = line
                    .unit_price
                    .checked_multiply_quantity(line.quantity)
                    .ok_or_else(|| CoreError::invalid_line(&line.ref_id, "line total overflows"))?;

                Ok(BillItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    bill_id: id.clone(),
                    line_no: idx as i64 + 1,
                    kind: line.kind,
                    ref_id: line.ref_id.clone(),
                    name: line.name.clone(),
                    unit_price_paise: line.unit_price.paise(),
                    quantity: line.quantity,
                    line_total_paise: line_total.paise(),
                    performing_staff_id: line.performing_staff_id.clone(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Bill {
            id,
            salon_id: draft.salon_id.clone(),
            invoice_number: invoice_number_for(seq),
            invoice_seq: seq,
            idempotency_key: draft.idempotency_key.clone(),
            billed_by_staff_id: draft.billed_by_staff_id.clone(),
            customer_id: draft.customer_id.clone(),
            services_subtotal_paise: invoice.services_subtotal.paise(),
            products_subtotal_paise: invoice.products_subtotal.paise(),
            service_discount_paise: invoice.service_discount.paise(),
            product_discount_paise: invoice.product_discount.paise(),
            coupon_code: invoice.coupon_code.clone(),
            coupon_discount_paise: invoice.coupon_discount.paise(),
            taxable_paise: invoice.taxable_amount.paise(),
            tax_rate_bps: invoice.tax_rate.bps() as i64,
            tax_paise: invoice.tax_amount.paise(),
            final_paise: invoice.final_amount.paise(),
            payment_method: draft.payment_method,
            notes: draft.notes.clone(),
            created_at: now,
            items,
        })
    }

    /// Returns the amount charged as Money.
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_paise(self.final_paise)
    }

    /// Product quantities on this bill, one entry per product in first-seen
    /// order. Repeated lines for the same product are summed.
    pub fn product_lines(&self) -> Vec<ProductLine> {
        let mut lines: Vec<ProductLine> = Vec::new();
        for item in self.items.iter().filter(|i| i.kind == ItemKind::Product) {
            match lines.iter_mut().find(|l| l.product_id == item.ref_id) {
                Some(existing) => existing.quantity += item.quantity,
                None => lines.push(ProductLine {
                    product_id: item.ref_id.clone(),
                    quantity: item.quantity,
                }),
            }
        }
        lines
    }

    /// Name of a product as frozen on this bill.
    pub fn product_name(&self, product_id: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|i| i.kind == ItemKind::Product && i.ref_id == product_id)
            .map(|i| i.name.as_str())
    }
}

/// A line item in a bill (snapshot of the priced line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub line_no: i64,
    pub kind: ItemKind,
    pub ref_id: String,
    pub name: String,
    pub unit_price_paise: i64,
    pub quantity: i64,
    pub line_total_paise: i64,
    pub performing_staff_id: Option<String>,
}

// =============================================================================
// Inventory
// =============================================================================

/// A product and quantity to deduct for a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    BillingDeduction,
}

/// One entry in the append-only stock ledger.
///
/// At most one movement exists per `(billing_id, product_id)`; the database
/// enforces it with a unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub billing_id: String,
    /// Negative for deductions.
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub movement_type: MovementType,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A deduction line that failed after its bill committed, queued for an
/// operator to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryException {
    pub id: String,
    pub billing_id: String,
    pub product_id: String,
    pub product_name: String,
    pub requested: i64,
    pub available: Option<i64>,
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Inventory state of a bill, derived from its movements.
///
/// ```text
///   no product lines ──────────────────────────► NotApplicable
///   product lines, no movements ───────────────► Pending
///   some but not all products moved ───────────► PartiallyDeducted
///   every product moved ───────────────────────► Deducted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    NotApplicable,
    Pending,
    Deducted,
    PartiallyDeducted,
}

impl InventoryStatus {
    /// Derives the status from the number of distinct products on the bill
    /// and the number of them that have a movement.
    pub fn derive(product_count: usize, moved_count: usize) -> Self {
        if product_count == 0 {
            InventoryStatus::NotApplicable
        } else if moved_count == 0 {
            InventoryStatus::Pending
        } else if moved_count >= product_count {
            InventoryStatus::Deducted
        } else {
            InventoryStatus::PartiallyDeducted
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self, InventoryStatus::NotApplicable | InventoryStatus::Deducted)
    }
}

/// Outcome of one deduction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeductionLineStatus {
    Applied,
    AlreadyApplied,
    Failed,
}

/// Why a deduction line failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeductionFailure {
    /// The conditional decrement matched no row: stock was below the request.
    InsufficientStock { available: i64 },
    ProductNotFound,
    /// The product does not appear on the bill.
    NotOnBill,
    /// The requested quantity differs from the bill's quantity.
    QuantityMismatch { expected: i64 },
    /// The storage layer failed; the line can be retried.
    Storage { message: String },
}

impl DeductionFailure {
    /// Short machine-readable reason, stored on the exception queue.
    pub fn code(&self) -> &'static str {
        match self {
            DeductionFailure::InsufficientStock { .. } => "insufficient_stock",
            DeductionFailure::ProductNotFound => "product_not_found",
            DeductionFailure::NotOnBill => "not_on_bill",
            DeductionFailure::QuantityMismatch { .. } => "quantity_mismatch",
            DeductionFailure::Storage { .. } => "storage",
        }
    }

    /// Whether the failure should be queued for an operator.
    ///
    /// Requests that never matched the bill are caller errors and are only
    /// reported back.
    pub fn is_queued(&self) -> bool {
        matches!(
            self,
            DeductionFailure::InsufficientStock { .. }
                | DeductionFailure::ProductNotFound
                | DeductionFailure::Storage { .. }
        )
    }
}

/// Per-line result of a deduction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeductionLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub status: DeductionLineStatus,
    pub movement: Option<StockMovement>,
    pub failure: Option<DeductionFailure>,
}

/// Result of applying inventory deduction for a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeductionReport {
    pub bill_id: String,
    pub status: InventoryStatus,
    pub lines: Vec<DeductionLine>,
}

impl DeductionReport {
    /// Report for a bill with no product lines.
    pub fn not_applicable(bill_id: impl Into<String>) -> Self {
        DeductionReport {
            bill_id: bill_id.into(),
            status: InventoryStatus::NotApplicable,
            lines: Vec::new(),
        }
    }

    pub fn failed_lines(&self) -> impl Iterator<Item = &DeductionLine> {
        self.lines
            .iter()
            .filter(|l| l.status == DeductionLineStatus::Failed)
    }

    /// One operator-facing warning per failed line.
    pub fn warnings(&self) -> Vec<String> {
        self.failed_lines()
            .map(|l| {
                format!(
                    "sale recorded; inventory update incomplete for {}",
                    l.product_name
                )
            })
            .collect()
    }
}

// =============================================================================
// Catalog & Staff (read-only here)
// =============================================================================

/// A retail product with tracked stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub price_paise: i64,
    /// Never negative; the products table carries a CHECK constraint.
    pub current_stock: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

/// A bookable salon service (haircut, facial, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogService {
    pub id: String,
    pub name: String,
    pub price_paise: i64,
    pub duration_minutes: i64,
    pub is_active: bool,
}

impl CatalogService {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    /// Free-form role, e.g. "stylist", "receptionist".
    pub role: String,
    pub is_active: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> BillDraft {
        let lines = vec![
            LineItem::service("svc-1", "Haircut", Money::from_paise(50_000), Some("st-1".into())),
            LineItem::product("prd-1", "Shampoo", Money::from_paise(10_000), 2),
        ];
        BillDraft {
            salon_id: "salon-1".to_string(),
            idempotency_key: "key-12345678".to_string(),
            billed_by_staff_id: "st-1".to_string(),
            customer_id: None,
            payment_method: PaymentMethod::Upi,
            notes: None,
            invoice: PricedInvoice {
                services_subtotal: Money::from_paise(50_000),
                products_subtotal: Money::from_paise(20_000),
                service_discount: Money::from_paise(5_000),
                product_discount: Money::zero(),
                coupon_code: None,
                coupon_discount: Money::zero(),
                taxable_amount: Money::from_paise(65_000),
                tax_rate: TaxRate::from_bps(1800),
                tax_amount: Money::from_paise(11_700),
                final_amount: Money::from_paise(76_700),
                line_items: lines,
            },
        }
    }

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(rate.bps(), 1800);
        assert!((rate.percentage() - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(invoice_number_for(1), "INV-000001");
        assert_eq!(invoice_number_for(1_234_567), "INV-1234567");
    }

    #[test]
    fn test_bill_from_draft_freezes_pricing() {
        let bill = Bill::from_draft(&sample_draft(), "bill-1".into(), 7, Utc::now()).unwrap();

        assert_eq!(bill.invoice_number, "INV-000007");
        assert_eq!(bill.final_paise, 76_700);
        assert_eq!(bill.tax_rate_bps, 1800);
        assert_eq!(bill.items.len(), 2);
        assert_eq!(bill.items[1].line_total_paise, 20_000);
        assert_eq!(bill.items[1].line_no, 2);
        assert!(bill.items.iter().all(|i| i.bill_id == "bill-1"));
    }

    #[test]
    fn test_bill_from_draft_rejects_overflowing_line() {
        let mut draft = sample_draft();
        draft
            .invoice
            .line_items
            .push(LineItem::product("prd-big", "Bulk", Money::from_paise(i64::MAX), 2));

        let err = Bill::from_draft(&draft, "bill-1".into(), 1, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidLineItem { ref ref_id, .. } if ref_id == "prd-big"
        ));
    }

    #[test]
    fn test_product_lines_skip_services_and_sum_repeats() {
        let mut draft = sample_draft();
        draft
            .invoice
            .line_items
            .push(LineItem::product("prd-1", "Shampoo", Money::from_paise(10_000), 1));
        let bill = Bill::from_draft(&draft, "bill-1".into(), 1, Utc::now()).unwrap();

        let lines = bill.product_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, "prd-1");
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(bill.product_name("prd-1"), Some("Shampoo"));
        assert_eq!(bill.product_name("svc-1"), None);
    }

    #[test]
    fn test_inventory_status_derivation() {
        assert_eq!(InventoryStatus::derive(0, 0), InventoryStatus::NotApplicable);
        assert_eq!(InventoryStatus::derive(2, 0), InventoryStatus::Pending);
        assert_eq!(InventoryStatus::derive(2, 1), InventoryStatus::PartiallyDeducted);
        assert_eq!(InventoryStatus::derive(2, 2), InventoryStatus::Deducted);
        assert!(InventoryStatus::NotApplicable.is_complete());
        assert!(!InventoryStatus::Pending.is_complete());
    }

    #[test]
    fn test_deduction_failure_serializes_with_reason_tag() {
        let json = serde_json::to_value(DeductionFailure::InsufficientStock { available: 0 }).unwrap();
        assert_eq!(json["reason"], "insufficient_stock");
        assert_eq!(json["available"], 0);
    }

    #[test]
    fn test_report_warnings_name_failed_products() {
        let report = DeductionReport {
            bill_id: "bill-1".into(),
            status: InventoryStatus::PartiallyDeducted,
            lines: vec![
                DeductionLine {
                    product_id: "p1".into(),
                    product_name: "Shampoo".into(),
                    quantity: 1,
                    status: DeductionLineStatus::Applied,
                    movement: None,
                    failure: None,
                },
                DeductionLine {
                    product_id: "p2".into(),
                    product_name: "Serum".into(),
                    quantity: 1,
                    status: DeductionLineStatus::Failed,
                    movement: None,
                    failure: Some(DeductionFailure::InsufficientStock { available: 0 }),
                },
            ],
        };
        assert_eq!(
            report.warnings(),
            vec!["sale recorded; inventory update incomplete for Serum".to_string()]
        );
    }

    #[test]
    fn test_line_item_serializes_camel_case() {
        let line = LineItem::service("svc-1", "Haircut", Money::from_paise(50_000), Some("st-1".into()));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["refId"], "svc-1");
        assert_eq!(json["unitPrice"], 50_000);
        assert_eq!(json["performingStaffId"], "st-1");
        assert_eq!(json["kind"], "service");
    }
}
