//! # Inventory Routes
//!
//! `POST /api/inventory/deduct` applies (or retries) the stock deduction for
//! a committed bill. Lines already moved come back as `already_applied`, so
//! the call is safe to repeat. With no `lines`, every product line of the
//! bill is attempted.
//!
//! `GET /api/inventory/exceptions` lists lines that failed to deduct and are
//! waiting for reconciliation.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use salon_core::{DeductionReport, InventoryException, ProductLine};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_EXCEPTION_LIMIT: u32 = 100;
const MAX_EXCEPTION_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductRequest {
    pub bill_id: String,
    #[serde(default)]
    pub lines: Vec<ProductLine>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExceptionsQuery {
    pub limit: Option<u32>,
}

/// `POST /api/inventory/deduct`
pub async fn deduct(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeductRequest>, JsonRejection>,
) -> Result<Json<DeductionReport>, ApiError> {
    let Json(request) = payload?;

    let report = if request.lines.is_empty() {
        state.inventory.apply_all(&request.bill_id).await?
    } else {
        state.inventory.apply(&request.bill_id, &request.lines).await?
    };

    Ok(Json(report))
}

/// `GET /api/inventory/exceptions?limit=N`
pub async fn exceptions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExceptionsQuery>,
) -> Result<Json<Vec<InventoryException>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EXCEPTION_LIMIT)
        .clamp(1, MAX_EXCEPTION_LIMIT);

    let open = state.db.inventory().open_exceptions(limit).await?;
    Ok(Json(open))
}
