//! # Pricing Engine
//!
//! Turns line items, discounts, an optional coupon and a tax rate into a
//! [`PricedInvoice`]. Pure and deterministic: same input, same invoice.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line items                                                             │
//! │     │  unit_price × quantity (checked)                                  │
//! │     ▼                                                                   │
//! │  services_subtotal            products_subtotal                         │
//! │     │                              │                                    │
//! │     │   coupon? ──yes──► allocate coupon across both scopes             │
//! │     │      │                       │                                    │
//! │     │      no ──► manual discount per scope (percent | fixed, clamped)  │
//! │     ▼                              ▼                                    │
//! │  (services - svc discount) + (products - prd discount) = taxable        │
//! │     │                                                                   │
//! │     ▼  tax once on the combined amount, round half-up                   │
//! │  final = taxable + tax                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Worked Example
//! ```rust
//! use salon_core::money::Money;
//! use salon_core::pricing::price;
//! use salon_core::types::{DiscountScope, DiscountSpec, LineItem, TaxRate};
//!
//! let items = vec![
//!     LineItem::service("svc-1", "Haircut", Money::from_rupees(500), Some("st-1".into())),
//!     LineItem::product("prd-1", "Shampoo", Money::from_rupees(100), 2),
//! ];
//! let discount = DiscountSpec::percent(DiscountScope::Services, 1000);
//!
//! let invoice = price(&items, Some(&discount), None, None, TaxRate::from_bps(1800)).unwrap();
//! assert_eq!(invoice.taxable_amount, Money::from_rupees(650));
//! assert_eq!(invoice.tax_amount, Money::from_rupees(117));
//! assert_eq!(invoice.final_amount, Money::from_rupees(767));
//! ```

use crate::coupon::AppliedCoupon;
use crate::error::{CoreError, CoreResult};
use crate::money::{div_round_half_up, Money};
use crate::types::{DiscountMode, DiscountScope, DiscountSpec, ItemKind, LineItem, PricedInvoice, TaxRate};
use crate::BPS_SCALE;

/// Prices a cart.
///
/// ## Rules
/// - A negative unit price or quantity is `InvalidLineItem`; quantity zero
///   contributes nothing
/// - A coupon supersedes both manual discounts
/// - Percent discounts round half-up; fixed discounts clamp to the subtotal
/// - An empty cart prices to an all-zero invoice
///
/// ## Errors
/// - [`CoreError::InvalidLineItem`] for bad lines or arithmetic overflow
/// - [`CoreError::InvalidDiscount`] for out-of-range or mis-scoped discounts
pub fn price(
    items: &[LineItem],
    service_discount: Option<&DiscountSpec>,
    product_discount: Option<&DiscountSpec>,
    coupon: Option<&AppliedCoupon>,
    tax_rate: TaxRate,
) -> CoreResult<PricedInvoice> {
    let (services_subtotal, products_subtotal) = subtotals(items)?;

    check_discount(service_discount, DiscountScope::Services)?;
    check_discount(product_discount, DiscountScope::Products)?;

    let (service_off, product_off, coupon_code, coupon_discount) = match coupon {
        Some(coupon) => {
            let (svc, prd) = allocate_coupon(coupon.discount, services_subtotal, products_subtotal);
            (svc, prd, Some(coupon.code.clone()), svc + prd)
        }
        None => (
            discount_amount(service_discount, services_subtotal),
            discount_amount(product_discount, products_subtotal),
            None,
            Money::zero(),
        ),
    };

    let taxable_amount = (services_subtotal - service_off) + (products_subtotal - product_off);
    let tax_amount = taxable_amount.calculate_tax(tax_rate);
    let final_amount = taxable_amount
        .checked_add(tax_amount)
        .ok_or_else(|| CoreError::invalid_line("cart", "total overflows"))?;

    Ok(PricedInvoice {
        services_subtotal,
        products_subtotal,
        service_discount: service_off,
        product_discount: product_off,
        coupon_code,
        coupon_discount,
        taxable_amount,
        tax_rate,
        tax_amount,
        final_amount,
        line_items: items.to_vec(),
    })
}

/// Sums line totals per kind with overflow checks.
fn subtotals(items: &[LineItem]) -> CoreResult<(Money, Money)> {
    let mut services = Money::zero();
    let mut products = Money::zero();

    for item in items {
        if item.unit_price.is_negative() {
            return Err(CoreError::invalid_line(&item.ref_id, "unit price must not be negative"));
        }
        if item.quantity < 0 {
            return Err(CoreError::invalid_line(&item.ref_id, "quantity must not be negative"));
        }

        let line_total = item
            .unit_price
            .checked_multiply_quantity(item.quantity)
            .ok_or_else(|| CoreError::invalid_line(&item.ref_id, "line total overflows"))?;

        let bucket = match item.kind {
            ItemKind::Service => &mut services,
            ItemKind::Product => &mut products,
        };
        *bucket = bucket
            .checked_add(line_total)
            .ok_or_else(|| CoreError::invalid_line(&item.ref_id, "subtotal overflows"))?;
    }

    // Taxable + tax must also fit
    services
        .checked_add(products)
        .and_then(|gross| gross.checked_add(gross))
        .ok_or_else(|| CoreError::invalid_line("cart", "total overflows"))?;

    Ok((services, products))
}

fn check_discount(spec: Option<&DiscountSpec>, expected: DiscountScope) -> CoreResult<()> {
    let Some(spec) = spec else {
        return Ok(());
    };

    if spec.scope != expected {
        return Err(CoreError::invalid_discount(
            expected,
            format!("discount is scoped to {}", spec.scope),
        ));
    }

    match spec.mode {
        DiscountMode::Percent if !(0..=BPS_SCALE).contains(&spec.value) => Err(
            CoreError::invalid_discount(expected, "percent must be between 0 and 10000 bps"),
        ),
        DiscountMode::Fixed if spec.value < 0 => Err(CoreError::invalid_discount(
            expected,
            "fixed amount must not be negative",
        )),
        _ => Ok(()),
    }
}

fn discount_amount(spec: Option<&DiscountSpec>, subtotal: Money) -> Money {
    match spec {
        None => Money::zero(),
        Some(spec) => match spec.mode {
            DiscountMode::Percent => subtotal.percent_bps(spec.value),
            DiscountMode::Fixed => Money::from_paise(spec.value).min(subtotal),
        },
    }
}

/// Splits a coupon discount between the two scopes in proportion to their
/// subtotals. Services take the rounded share, products the remainder; both
/// are clamped to their own subtotal.
fn allocate_coupon(discount: Money, services: Money, products: Money) -> (Money, Money) {
    let total = services + products;
    if !total.is_positive() || !discount.is_positive() {
        return (Money::zero(), Money::zero());
    }

    let coupon = discount.min(total);
    let svc_share = div_round_half_up(
        coupon.paise() as i128 * services.paise() as i128,
        total.paise() as i128,
    );
    let svc = Money::from_paise(svc_share as i64).min(services);
    let prd = (coupon - svc).min(products);

    (svc, prd)
}

// =============================================================================
// Unit Tests
// =============================================================================
