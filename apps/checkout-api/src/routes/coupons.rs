//! Coupon validation.
//!
//! Always answers 200: an invalid code is a normal result carrying its
//! rejection reason, not an error.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use salon_core::validation::validate_amount_paise;
use salon_core::{CouponResult, Money};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    /// Order value in paise the coupon is checked against.
    pub order_value: Money,
}

/// `POST /api/coupons/validate`
pub async fn validate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidateCouponRequest>, JsonRejection>,
) -> Result<Json<CouponResult>, ApiError> {
    let Json(request) = payload?;
    validate_amount_paise("orderValue", request.order_value.paise())
        .map_err(|e| ApiError::invalid_request(e.to_string()))?;

    let result = state
        .coupons
        .validate(&request.code, request.order_value)
        .await?;

    Ok(Json(result))
}
