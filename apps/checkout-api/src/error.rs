//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Checkout API                       │
//! │                                                                         │
//! │  Handler ── Result<T, ApiError>                                         │
//! │     │                                                                   │
//! │     ├── CoreError (bad line, bad discount) ──────► 400 INVALID_REQUEST  │
//! │     ├── bad / missing idempotency key ───────────► 400 INVALID_KEY      │
//! │     ├── Violation list ──────────────────────────► 422 VALIDATION_FAILED│
//! │     ├── unknown bill ────────────────────────────► 404 NOT_FOUND        │
//! │     ├── commit failed ───────────────────────────► 503 COMMIT_FAILED    │
//! │     │                                               retryable: true     │
//! │     └── other DbError ── busy / pool ────────────► 503 DATABASE_ERROR   │
//! │                        └─ anything else ─────────► 500 DATABASE_ERROR   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! {
//!   "code": "VALIDATION_FAILED",
//!   "message": "Checkout blocked by 1 violation(s)",
//!   "retryable": false,
//!   "violations": [
//!     { "code": "STOCK_INSUFFICIENT", "message": "Only 3 Shampoo in stock, 5 requested",
//!       "refId": "p-shampoo", "available": 3 }
//!   ]
//! }
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use salon_core::{CoreError, Violation};
use salon_db::DbError;

use crate::services::{CheckoutError, InventoryError};

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Whether the same request may succeed if sent again
    pub retryable: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<ViolationBody>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed body, line or discount (400)
    InvalidRequest,

    /// Missing or malformed idempotency key (400)
    InvalidKey,

    /// Business invariants failed (422)
    ValidationFailed,

    /// Resource not found (404)
    NotFound,

    /// The bill could not be persisted (503)
    CommitFailed,

    /// Database operation failed (500 / 503)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InvalidKey => StatusCode::BAD_REQUEST,
            ErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::CommitFailed => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A violation as the billing page sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
}

impl From<&Violation> for ViolationBody {
    fn from(v: &Violation) -> Self {
        ViolationBody {
            code: v.code().to_string(),
            message: v.to_string(),
            ref_id: v.ref_id().map(str::to_string),
            available: v.available(),
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retryable: false,
            violations: Vec::new(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidRequest, message)
    }

    pub fn invalid_key(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidKey, message)
    }

    fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// HTTP status for this error. Retryable database errors are 503.
    pub fn status(&self) -> StatusCode {
        if self.code == ErrorCode::DatabaseError && self.retryable {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            ref e if e.is_retryable() => {
                tracing::warn!(error = %e, "Database temporarily unavailable");
                ApiError::new(ErrorCode::DatabaseError, "Database temporarily unavailable").retryable()
            }
            e => {
                // Log the actual error but return a generic message
                tracing::error!(error = %e, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::invalid_request(err.to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidKey(e) => ApiError::invalid_key(e.to_string()),
            CheckoutError::InvalidRequest(e) => e.into(),
            CheckoutError::ValidationFailed(violations) => ApiError {
                code: ErrorCode::ValidationFailed,
                message: format!("Checkout blocked by {} violation(s)", violations.len()),
                retryable: false,
                violations: violations.iter().map(ViolationBody::from).collect(),
            },
            CheckoutError::CommitFailed(e) => {
                tracing::error!(error = %e, "Bill commit failed");
                ApiError::new(
                    ErrorCode::CommitFailed,
                    "The bill could not be saved. Retry with the same idempotency key.",
                )
                .retryable()
            }
            CheckoutError::Storage(e) => e.into(),
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::BillNotFound(id) => ApiError::not_found("Bill", &id),
            InventoryError::Storage(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failure_carries_violations() {
        let err: ApiError = CheckoutError::ValidationFailed(vec![Violation::StockInsufficient {
            product_id: "p-1".to_string(),
            product: "Shampoo".to_string(),
            requested: 5,
            available: 3,
        }])
        .into();

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].code, "STOCK_INSUFFICIENT");
        assert_eq!(err.violations[0].ref_id.as_deref(), Some("p-1"));
        assert_eq!(err.violations[0].available, Some(3));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_FAILED");
        assert_eq!(json["violations"][0]["refId"], "p-1");
    }

    #[test]
    fn test_commit_failure_is_retryable_503() {
        let err: ApiError = CheckoutError::CommitFailed(DbError::Busy("database is locked".into())).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.retryable);
    }

    #[test]
    fn test_db_errors() {
        let busy: ApiError = DbError::PoolExhausted.into();
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);

        let broken: ApiError = DbError::QueryFailed("no such table".into()).into();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!broken.message.contains("no such table"));

        let missing: ApiError = InventoryError::BillNotFound("b-1".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
