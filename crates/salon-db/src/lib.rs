//! # salon-db: Database Layer for the Salon Checkout Engine
//!
//! This crate owns every SQLite read and write the checkout flow makes,
//! and every transaction boundary.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Salon Checkout Data Flow                           │
//! │                                                                         │
//! │  POST /api/checkout (checkout-api)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     salon-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │   │   │
//! │  │   │               │    │ CatalogRepo   │    │              │   │   │
//! │  │   │ SqlitePool    │    │ StaffRepo     │    │ 001_initial_ │   │   │
//! │  │   │ WAL + busy    │◄───│ CouponRepo    │    │   schema.sql │   │   │
//! │  │   │ timeout       │    │ BillRepo      │    │              │   │   │
//! │  │   │               │    │ InventoryRepo │    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (salon.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, staff, coupon, bill and inventory access
//!
//! ## Usage
//!
//! ```rust,ignore
//! use salon_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("salon.db")).await?;
//!
//! let result = db.bills().commit(&draft).await?;
//! if result.created {
//!     db.inventory().deduct(&result.bill.id, "prod-1", 2).await?;
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::{BillRepository, CommitResult};
pub use repository::catalog::CatalogRepository;
pub use repository::coupon::CouponRepository;
pub use repository::inventory::{DeductOutcome, InventoryRepository, NewException};
pub use repository::staff::StaffRepository;
