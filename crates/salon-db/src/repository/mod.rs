//! # Repository Module
//!
//! Database repository implementations for the checkout engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Reads, Who Writes                                │
//! │                                                                         │
//! │  CheckoutService                                                        │
//! │       │                                                                 │
//! │       ├── db.catalog()   ── get_service / get_product / stock_levels    │
//! │       ├── db.staff()     ── active_ids                                  │
//! │       ├── db.coupons()   ── lookup / increment_usage                    │
//! │       └── db.bills()     ── get_by_idempotency_key / commit             │
//! │                                                                         │
//! │  InventoryService                                                       │
//! │       └── db.inventory() ── deduct / record_exception / resolve         │
//! │                                                                         │
//! │  SQL is isolated here; services never build queries.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Services, products, stock reads
//! - [`StaffRepository`](staff::StaffRepository) - Staff directory
//! - [`CouponRepository`](coupon::CouponRepository) - Coupon store
//! - [`BillRepository`](bill::BillRepository) - Idempotent bill commit
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock ledger and exception queue

pub mod bill;
pub mod catalog;
pub mod coupon;
pub mod inventory;
pub mod staff;
