//! # salon-core: Pure Checkout Logic for the Salon Billing Engine
//!
//! This crate is the **heart** of the checkout engine. It contains the cart,
//! pricing, coupon and invariant rules as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Salon Checkout Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   Billing Page (web frontend)                   │   │
//! │  │    Services ──► Products ──► Discount/Coupon ──► Pay & Print    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    checkout-api (axum)                          │   │
//! │  │    checkout, quote, deductInventory, validateCoupon             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ salon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐  │   │
//! │  │  │  money  │ │  cart   │ │ pricing │ │ coupon  │ │validation│  │   │
//! │  │  │  Money  │ │  Cart   │ │ price() │ │evaluate │ │invariants│  │   │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    salon-db (Database Layer)                    │   │
//! │  │        bills, invoice sequences, stock ledger, catalog          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (LineItem, PricedInvoice, Bill, StockMovement, ...)
//! - [`money`] - Money type with integer paise arithmetic
//! - [`pricing`] - The pricing engine (subtotals, discounts, coupon, tax)
//! - [`coupon`] - Coupon rule evaluation
//! - [`cart`] - Immutable-by-default cart snapshot with explicit transitions
//! - [`validation`] - Field validators and checkout invariants
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, no hidden state
//! 2. **Integer Money**: all amounts are paise (i64), rounding is half-up
//! 3. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use salon_core::money::Money;
//! use salon_core::types::TaxRate;
//!
//! let taxable = Money::from_paise(65_000); // ₹650.00
//! let tax = taxable.calculate_tax(TaxRate::from_bps(1800)); // 18%
//! assert_eq!(tax.paise(), 11_700);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod coupon;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::Cart;
pub use coupon::{AppliedCoupon, CouponRecord, CouponRejection, CouponResult};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::price;
pub use types::*;
pub use validation::{validate_checkout, CheckoutInput, Violation};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default salon ID for single-salon deployments.
///
/// Invoice numbers are sequenced per salon; installations that run a single
/// branch use this ID everywhere.
pub const DEFAULT_SALON_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum line items allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product line.
///
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;
