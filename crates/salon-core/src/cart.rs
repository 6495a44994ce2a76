//! # Cart Snapshot
//!
//! The cart as an immutable value. Every change is an explicit transition
//! that consumes the old snapshot and returns a new one.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Billing Page Action        Transition              Coupon              │
//! │  ───────────────────        ──────────              ──────              │
//! │                                                                         │
//! │  Pick service ────────────► add_service() ────────► cleared             │
//! │  Pick product ────────────► add_product() ────────► cleared             │
//! │  Change quantity ─────────► set_quantity() ───────► cleared             │
//! │  Remove line ─────────────► remove_line() ────────► cleared             │
//! │  Choose stylist ──────────► assign_staff() ───────► kept                │
//! │  Manual discount ─────────► set_discount() ───────► cleared             │
//! │  Apply coupon ────────────► apply_coupon() ───────► set, discounts = 0  │
//! │                                                                         │
//! │  Any change to the lines or discounts drops an applied coupon, so a     │
//! │  coupon can only ever be priced against the subtotal it was validated   │
//! │  for.                                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Freezing
//! Unit prices and names are copied from the catalog record when a line is
//! added. Later catalog edits do not reach an existing cart.

use serde::{Deserialize, Serialize};

use crate::coupon::{AppliedCoupon, CouponResult};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing;
use crate::types::{CatalogService, DiscountScope, DiscountSpec, LineItem, PricedInvoice, Product, TaxRate};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// A cart snapshot.
///
/// ## Invariants
/// - Product lines are unique by product id (adding again increases quantity)
/// - Quantities are between 1 and [`MAX_ITEM_QUANTITY`]
/// - At most [`MAX_CART_ITEMS`] lines
/// - A coupon and manual discounts are never both set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<LineItem>,
    service_discount: Option<DiscountSpec>,
    product_discount: Option<DiscountSpec>,
    coupon: Option<AppliedCoupon>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    pub fn discount(&self, scope: DiscountScope) -> Option<&DiscountSpec> {
        match scope {
            DiscountScope::Services => self.service_discount.as_ref(),
            DiscountScope::Products => self.product_discount.as_ref(),
        }
    }

    /// Sum of all line totals before any discount.
    ///
    /// This is the order value a coupon is validated against.
    pub fn gross_subtotal(&self) -> Money {
        self.lines
            .iter()
            .map(|l| l.unit_price * l.quantity)
            .sum()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Adds a service line performed by `staff_id`.
    ///
    /// Services are never merged: two haircuts by two stylists are two lines.
    pub fn add_service(mut self, service: &CatalogService, staff_id: Option<String>) -> CoreResult<Cart> {
        self.ensure_room()?;
        self.lines.push(LineItem::service(
            service.id.clone(),
            service.name.clone(),
            service.price(),
            staff_id,
        ));
        Ok(self.invalidate_coupon())
    }

    /// Adds a product or increases its quantity if already present.
    pub fn add_product(mut self, product: &Product, quantity: i64) -> CoreResult<Cart> {
        check_quantity(quantity)?;

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.is_product() && l.ref_id == product.id)
        {
            let new_qty = line.quantity + quantity;
            check_quantity(new_qty)?;
            line.quantity = new_qty;
            return Ok(self.invalidate_coupon());
        }

        self.ensure_room()?;
        self.lines.push(LineItem::product(
            product.id.clone(),
            product.name.clone(),
            product.price(),
            quantity,
        ));
        Ok(self.invalidate_coupon())
    }

    /// Sets the quantity of line `index`. Zero removes the line.
    pub fn set_quantity(mut self, index: usize, quantity: i64) -> CoreResult<Cart> {
        if quantity == 0 {
            return self.remove_line(index);
        }
        check_quantity(quantity)?;

        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index })?;
        line.quantity = quantity;
        Ok(self.invalidate_coupon())
    }

    pub fn remove_line(mut self, index: usize) -> CoreResult<Cart> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound { index });
        }
        self.lines.remove(index);
        Ok(self.invalidate_coupon())
    }

    /// Attributes service line `index` to a staff member.
    ///
    /// Prices are unaffected, so an applied coupon stays.
    pub fn assign_staff(mut self, index: usize, staff_id: impl Into<String>) -> CoreResult<Cart> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index })?;
        if !line.is_service() {
            return Err(CoreError::invalid_line(
                &line.ref_id,
                "only service lines carry a performing staff member",
            ));
        }
        line.performing_staff_id = Some(staff_id.into());
        Ok(self)
    }

    /// Sets or clears the manual discount for `scope`.
    pub fn set_discount(mut self, scope: DiscountScope, spec: Option<DiscountSpec>) -> CoreResult<Cart> {
        if let Some(spec) = &spec {
            if spec.scope != scope {
                return Err(CoreError::invalid_discount(
                    scope,
                    format!("discount is scoped to {}", spec.scope),
                ));
            }
        }
        match scope {
            DiscountScope::Services => self.service_discount = spec,
            DiscountScope::Products => self.product_discount = spec,
        }
        self.coupon = None;
        Ok(self)
    }

    /// Applies a validated coupon, zeroing both manual discounts.
    ///
    /// ## Errors
    /// - [`CoreError::CouponNotValid`] if the result was a rejection
    /// - [`CoreError::StaleCoupon`] if the cart subtotal changed since the
    ///   coupon was validated
    pub fn apply_coupon(mut self, result: &CouponResult) -> CoreResult<Cart> {
        let Some(applied) = result.applied() else {
            return Err(CoreError::CouponNotValid {
                code: result.code.clone(),
                message: result.message.clone(),
            });
        };

        let current = self.gross_subtotal();
        if applied.order_value != current {
            return Err(CoreError::StaleCoupon {
                code: applied.code,
                validated_for: applied.order_value.paise(),
                current: current.paise(),
            });
        }

        self.service_discount = None;
        self.product_discount = None;
        self.coupon = Some(applied);
        Ok(self)
    }

    pub fn remove_coupon(mut self) -> Cart {
        self.coupon = None;
        self
    }

    /// Prices this snapshot.
    pub fn price(&self, tax_rate: TaxRate) -> CoreResult<PricedInvoice> {
        pricing::price(
            &self.lines,
            self.service_discount.as_ref(),
            self.product_discount.as_ref(),
            self.coupon.as_ref(),
            tax_rate,
        )
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn ensure_room(&self) -> CoreResult<()> {
        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
        }
        Ok(())
    }

    fn invalidate_coupon(mut self) -> Cart {
        self.coupon = None;
        self
    }
}

fn check_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
