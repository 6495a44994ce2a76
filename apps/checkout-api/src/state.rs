//! Shared application state.

use std::sync::Arc;

use salon_db::Database;

use crate::config::AppConfig;
use crate::services::{CheckoutService, CouponService, InventoryService};

/// Everything a handler needs. Wrapped in an `Arc` and handed to the router.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub checkout: CheckoutService,
    pub coupons: CouponService,
    pub inventory: InventoryService,
}

impl AppState {
    /// Wires the services over one database handle.
    pub fn new(db: Database, config: AppConfig) -> Arc<Self> {
        let coupons = CouponService::new(db.clone());
        let inventory = InventoryService::new(db.clone());
        let checkout = CheckoutService::new(
            db.clone(),
            config.tax_rate(),
            coupons.clone(),
            inventory.clone(),
        );

        Arc::new(AppState {
            db,
            config,
            checkout,
            coupons,
            inventory,
        })
    }
}
