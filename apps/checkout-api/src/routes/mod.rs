//! # HTTP Routes
//!
//! ```text
//! POST /api/checkout                 commit a cart (Idempotency-Key)
//! POST /api/checkout/quote           price a cart, commit nothing
//! POST /api/inventory/deduct         apply / retry deduction for a bill
//! GET  /api/inventory/exceptions     open inventory exceptions
//! POST /api/coupons/validate         evaluate a coupon code
//! GET  /api/bills/{id}               bill + inventory status
//! GET  /health                       liveness + database check
//! ```

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod bills;
pub mod checkout;
pub mod coupons;
pub mod health;
pub mod inventory;

/// Builds the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/checkout", post(checkout::checkout))
        .route("/api/checkout/quote", post(checkout::quote))
        .route("/api/inventory/deduct", post(inventory::deduct))
        .route("/api/inventory/exceptions", get(inventory::exceptions))
        .route("/api/coupons/validate", post(coupons::validate))
        .route("/api/bills/{id}", get(bills::get_bill))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::services::checkout::tests::seeded_db;
    use salon_db::DbConfig;

    async fn app() -> Router {
        let db = seeded_db(DbConfig::in_memory()).await;
        build_router(AppState::new(db, AppConfig::default()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("Idempotency-Key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn cart() -> Value {
        json!({
            "billedByStaffId": "st-1",
            "items": [
                { "kind": "service", "refId": "svc-cut", "performingStaffId": "st-2" },
                { "kind": "product", "refId": "p-shampoo", "quantity": 2 }
            ],
            "serviceDiscount": { "scope": "services", "mode": "percent", "value": 1000 },
            "paymentMethod": "upi"
        })
    }

    #[tokio::test]
    async fn test_checkout_then_replay() {
        let app = app().await;

        let (status, body) = send(&app, post_json("/api/checkout", Some("http-key-0001"), cart())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["replayed"], false);
        assert_eq!(body["bill"]["finalPaise"], 76_700);
        assert_eq!(body["bill"]["invoiceNumber"], "INV-000001");
        assert_eq!(body["inventory"]["status"], "deducted");
        assert_eq!(body["warnings"], json!([]));

        let (status, replay) = send(&app, post_json("/api/checkout", Some("http-key-0001"), cart())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replay["replayed"], true);
        assert_eq!(replay["bill"]["id"], body["bill"]["id"]);

        let bill_id = body["bill"]["id"].as_str().unwrap();
        let (status, bill) = send(&app, get(&format!("/api/bills/{bill_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bill["inventoryStatus"], "deducted");
        assert_eq!(bill["bill"]["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_oversold_bill_is_207_on_retry() {
        let db = seeded_db(DbConfig::in_memory()).await;
        let state = AppState::new(db.clone(), AppConfig::default());
        let app = build_router(state.clone());

        let mut body = cart();
        body["items"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "kind": "product", "refId": "p-cond", "quantity": 1 }));
        let request: crate::services::CheckoutRequest = serde_json::from_value(body.clone()).unwrap();

        // The conditioner sells out between validation and commit
        let prepared = state.checkout.prepare(&request).await.unwrap();
        db.catalog().set_stock("p-cond", 0).await.unwrap();
        let first = state
            .checkout
            .commit(&state.config.salon_id, "http-key-0207", &request, prepared)
            .await
            .unwrap();
        assert_eq!(crate::routes::checkout::response_status(&first), StatusCode::MULTI_STATUS);

        let (status, replay) = send(&app, post_json("/api/checkout", Some("http-key-0207"), body)).await;
        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(replay["replayed"], true);
        assert_eq!(replay["bill"]["id"], json!(first.bill.id));
        assert_eq!(replay["inventory"]["status"], "partially_deducted");
        assert_eq!(
            replay["warnings"],
            json!(["sale recorded; inventory update incomplete for Conditioner"])
        );

        let bill_id = first.bill.id.as_str();
        assert_eq!(db.inventory().movements_for_bill(bill_id).await.unwrap().len(), 1);

        let (status, queue) = send(&app, get("/api/inventory/exceptions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(queue.as_array().unwrap().len(), 1);
        assert_eq!(queue[0]["productId"], "p-cond");
        assert_eq!(queue[0]["billingId"], json!(bill_id));
    }

    #[tokio::test]
    async fn test_key_from_body() {
        let app = app().await;
        let mut body = cart();
        body["idempotencyKey"] = json!("body-key-0001");

        let (status, _) = send(&app, post_json("/api/checkout", None, body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_missing_key_is_400() {
        let app = app().await;
        let (status, body) = send(&app, post_json("/api/checkout", None, cart())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_KEY");
    }

    #[tokio::test]
    async fn test_stock_violation_is_422() {
        let app = app().await;
        let body = json!({
            "billedByStaffId": "st-1",
            "items": [{ "kind": "product", "refId": "p-shampoo", "quantity": 5 }]
        });

        let (status, body) = send(&app, post_json("/api/checkout", Some("http-key-0002"), body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["violations"][0]["code"], "STOCK_INSUFFICIENT");
        assert_eq!(body["violations"][0]["available"], 3);
    }

    #[tokio::test]
    async fn test_salon_header() {
        let app = app().await;

        let mut request = post_json("/api/checkout", Some("salon-key-001"), cart());
        request
            .headers_mut()
            .insert("X-Salon-Id", "not-a-uuid".parse().unwrap());
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Invoice numbering is per salon
        let mut request = post_json("/api/checkout", Some("salon-key-001"), cart());
        request.headers_mut().insert(
            "X-Salon-Id",
            "6f1c2d3e-0000-4000-8000-000000000002".parse().unwrap(),
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["bill"]["invoiceNumber"], "INV-000001");
        assert_eq!(body["bill"]["salonId"], "6f1c2d3e-0000-4000-8000-000000000002");
    }

    #[tokio::test]
    async fn test_malformed_body_and_discount_are_400() {
        let app = app().await;

        let (status, body) = send(
            &app,
            post_json("/api/checkout", Some("http-key-0003"), json!({ "items": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");

        let mut bad = cart();
        bad["serviceDiscount"]["value"] = json!(15_000);
        let (status, _) = send(&app, post_json("/api/checkout", Some("http-key-0004"), bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quote_commits_nothing() {
        let app = app().await;

        let (status, body) = send(&app, post_json("/api/checkout/quote", None, cart())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invoice"]["finalAmount"], 76_700);
        assert_eq!(body["violations"], json!([]));

        let (status, _) = send(&app, get("/api/bills/does-not-exist")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_coupon_validate_is_always_200() {
        let app = app().await;

        let (status, body) = send(
            &app,
            post_json("/api/coupons/validate", None, json!({ "code": "flat100", "orderValue": 65_000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["discountAmount"], 10_000);

        let (status, body) = send(
            &app,
            post_json("/api/coupons/validate", None, json!({ "code": "GHOST", "orderValue": 65_000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert_eq!(body["rejection"], "unknown_code");
    }

    #[tokio::test]
    async fn test_deduct_endpoint_is_idempotent() {
        let app = app().await;
        let (_, body) = send(&app, post_json("/api/checkout", Some("http-key-0005"), cart())).await;
        let bill_id = body["bill"]["id"].clone();

        let request = json!({
            "billId": bill_id,
            "lines": [{ "productId": "p-shampoo", "quantity": 2 }]
        });
        let (status, report) = send(&app, post_json("/api/inventory/deduct", None, request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["lines"][0]["status"], "already_applied");
        assert_eq!(report["status"], "deducted");

        let (status, _) = send(
            &app,
            post_json("/api/inventory/deduct", None, json!({ "billId": "missing", "lines": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, queue) = send(&app, get("/api/inventory/exceptions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(queue, json!([]));
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], true);
    }
}
