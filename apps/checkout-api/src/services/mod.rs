//! Service layer for the checkout API.
//!
//! Services own the business flow; route handlers only translate HTTP in
//! and out.

pub mod checkout;
pub mod coupon;
pub mod inventory;

pub use checkout::{
    CartLineRequest, CheckoutError, CheckoutOutcome, CheckoutRequest, CheckoutService,
    PreparedCheckout,
};
pub use coupon::CouponService;
pub use inventory::{InventoryError, InventoryService};
