//! # Checkout Routes
//!
//! ## Status Codes
//! ```text
//! 201  bill created, inventory deducted (or no products on the bill)
//! 207  bill created or replayed, one or more inventory lines still not
//!      deducted (see warnings)
//! 200  replay: the key already produced this bill, inventory complete
//! 400  malformed body, line, discount, or idempotency key
//! 422  business invariants failed (violations[])
//! 503  bill could not be saved; retry with the same key
//! ```

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::info;

use salon_core::validation::validate_uuid;
use salon_core::{Bill, CouponResult, DeductionReport, PricedInvoice};

use crate::error::{ApiError, ViolationBody};
use crate::services::{CheckoutOutcome, CheckoutRequest};
use crate::state::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
pub const SALON_ID_HEADER: &str = "x-salon-id";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub bill: Bill,
    pub replayed: bool,
    pub inventory: DeductionReport,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub invoice: PricedInvoice,
    pub coupon: Option<CouponResult>,
    /// What would block this cart at checkout.
    pub violations: Vec<ViolationBody>,
}

/// `POST /api/checkout`
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let Json(request) = payload?;

    let key = match header_value(&headers, IDEMPOTENCY_KEY_HEADER)? {
        Some(key) => key,
        None => request.idempotency_key.clone().ok_or_else(|| {
            ApiError::invalid_key("Idempotency-Key header or idempotencyKey field is required")
        })?,
    };
    let salon_id = salon_id(&headers, &state)?;

    let outcome = state.checkout.checkout(&salon_id, &key, &request).await?;
    let status = response_status(&outcome);

    info!(
        bill_id = %outcome.bill.id,
        invoice = %outcome.bill.invoice_number,
        total = %outcome.bill.final_amount(),
        replayed = outcome.replayed,
        status = status.as_u16(),
        "Checkout complete"
    );

    let warnings = outcome.warnings();
    Ok((
        status,
        Json(CheckoutResponse {
            bill: outcome.bill,
            replayed: outcome.replayed,
            inventory: outcome.inventory,
            warnings,
        }),
    ))
}

/// `POST /api/checkout/quote`
pub async fn quote(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let Json(request) = payload?;
    let prepared = state.checkout.prepare(&request).await?;

    Ok(Json(QuoteResponse {
        invoice: prepared.invoice,
        coupon: prepared.coupon,
        violations: prepared.violations.iter().map(ViolationBody::from).collect(),
    }))
}

/// 207 whenever inventory lagged, replay or not. Otherwise 200 for a
/// replay and 201 for a new bill.
pub fn response_status(outcome: &CheckoutOutcome) -> StatusCode {
    if !outcome.inventory.status.is_complete() {
        StatusCode::MULTI_STATUS
    } else if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<Option<String>, ApiError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.to_string()))
            .map_err(|_| ApiError::invalid_request(format!("{name} header is not valid text"))),
    }
}

/// Salon from `X-Salon-Id`, or the configured default.
fn salon_id(headers: &HeaderMap, state: &AppState) -> Result<String, ApiError> {
    match header_value(headers, SALON_ID_HEADER)? {
        Some(id) => {
            let id = id.trim().to_string();
            validate_uuid("X-Salon-Id", &id).map_err(|e| ApiError::invalid_request(e.to_string()))?;
            Ok(id)
        }
        None => Ok(state.config.salon_id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use salon_core::{
        price, BillDraft, DeductionFailure, DeductionLine, DeductionLineStatus, InventoryStatus,
        LineItem, Money, PaymentMethod, TaxRate,
    };
    use uuid::Uuid;

    fn outcome(replayed: bool, status: InventoryStatus) -> CheckoutOutcome {
        let items = vec![LineItem::product("p-1", "Shampoo", Money::from_rupees(100), 1)];
        let draft = BillDraft {
            salon_id: "salon-1".to_string(),
            idempotency_key: "status-key-01".to_string(),
            billed_by_staff_id: "st-1".to_string(),
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
            invoice: price(&items, None, None, None, TaxRate::zero()).unwrap(),
        };
        let bill = Bill::from_draft(&draft, Uuid::new_v4().to_string(), 1, Utc::now()).unwrap();

        let lines = if status == InventoryStatus::Pending {
            vec![DeductionLine {
                product_id: "p-1".to_string(),
                product_name: "Shampoo".to_string(),
                quantity: 1,
                status: DeductionLineStatus::Failed,
                movement: None,
                failure: Some(DeductionFailure::InsufficientStock { available: 0 }),
            }]
        } else {
            Vec::new()
        };

        CheckoutOutcome {
            inventory: DeductionReport {
                bill_id: bill.id.clone(),
                status,
                lines,
            },
            bill,
            replayed,
        }
    }

    #[test]
    fn test_response_status() {
        assert_eq!(
            response_status(&outcome(false, InventoryStatus::Deducted)),
            StatusCode::CREATED
        );
        assert_eq!(
            response_status(&outcome(false, InventoryStatus::NotApplicable)),
            StatusCode::CREATED
        );
        assert_eq!(
            response_status(&outcome(true, InventoryStatus::Deducted)),
            StatusCode::OK
        );

        let lagged = outcome(false, InventoryStatus::Pending);
        assert_eq!(response_status(&lagged), StatusCode::MULTI_STATUS);

        // A retry must not hide an incomplete deduction behind a 200
        let lagged_replay = outcome(true, InventoryStatus::Pending);
        assert_eq!(response_status(&lagged_replay), StatusCode::MULTI_STATUS);
        assert_eq!(lagged_replay.warnings().len(), 1);
        assert_eq!(
            lagged.warnings(),
            vec!["sale recorded; inventory update incomplete for Shampoo".to_string()]
        );
    }
}
