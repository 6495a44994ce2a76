//! Bill lookup.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use salon_core::{Bill, InventoryStatus};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
    pub bill: Bill,
    /// Derived from the stock movements recorded so far.
    pub inventory_status: InventoryStatus,
}

/// `GET /api/bills/{id}`
pub async fn get_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = state
        .db
        .bills()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill", &id))?;

    let inventory_status = state.inventory.status_for(&bill).await?;

    Ok(Json(BillResponse {
        bill,
        inventory_status,
    }))
}
