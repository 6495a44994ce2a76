//! # Salon Checkout API
//!
//! HTTP front for the salon billing engine: prices carts, commits bills
//! exactly once per idempotency key, and deducts product stock after the
//! bill is saved.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout API Server                              │
//! │                                                                         │
//! │  Billing page ──► axum router ──► Services ──────────► SQLite           │
//! │                    (routes/)       │                   (salon-db)       │
//! │                                    │                                    │
//! │  ┌─────────────────┐  ┌────────────┴────┐  ┌──────────────────────────┐ │
//! │  │ CheckoutService │  │  CouponService  │  │  InventoryService        │ │
//! │  │                 │  │                 │  │                          │ │
//! │  │ • prepare       │  │ • validate      │  │ • deduct_for_bill        │ │
//! │  │ • checkout      │  │ • record_use    │  │ • apply / apply_all      │ │
//! │  └────────┬────────┘  └─────────────────┘  └──────────────────────────┘ │
//! │           │                                                             │
//! │           ▼                                                             │
//! │    salon-core: pricing, coupon rules, checkout invariants               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! `salon.toml` (optional) overlaid by environment variables:
//! - `SALON__HTTP_PORT` - HTTP port (default: 8080)
//! - `SALON__DATABASE_PATH` - SQLite file (default: ./salon.db)
//! - `SALON__SALON_ID` - salon used when no `X-Salon-Id` header is sent
//! - `SALON__TAX_RATE_BPS` - tax in basis points (default: 1800)

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

// Re-exports
pub use config::AppConfig;
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
