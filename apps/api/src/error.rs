//! # API Error Type
//!
//! Every handler returns `Result<_, ApiError>`. The error renders itself as
//! an HTTP status plus a JSON body.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the PDV API                            │
//! │                                                                         │
//! │  ValidationError ──┐                                                    │
//! │  CoreError ────────┤                                                    │
//! │  DbError ──────────┼──► ApiError { code, message } ──► IntoResponse     │
//! │  SaleError ────────┤          │                                         │
//! │  AuthError ────────┘          ▼                                         │
//! │                        status from code                                 │
//! │                                                                         │
//! │  HTTP/1.1 422 Unprocessable Entity                                      │
//! │  {                                                                      │
//! │    "code": "INSUFFICIENT_STOCK",                                        │
//! │    "message": "Insufficient stock for product ...: available 2, ..."    │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence failures are logged with their details and returned with a
//! generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pdv_core::{CoreError, ErrorKind, ValidationError};
use pdv_db::{DbError, SaleError};

/// Machine-readable error codes.
///
/// The sale engine kinds keep the names of [`ErrorKind`]; the rest belong
/// to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    ProductNotFound,
    ProductInactive,
    InsufficientStock,
    InsufficientPayment,
    SaleNotFound,
    AlreadyCancelled,
    PersistenceFailure,

    /// Any other missing resource (user, category).
    NotFound,
    Unauthorized,
    InvalidCredentials,
    UserInactive,
    Forbidden,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::ProductNotFound | ErrorCode::SaleNotFound | ErrorCode::NotFound => {
                StatusCode::NOT_FOUND
            }
            ErrorCode::ProductInactive
            | ErrorCode::InsufficientStock
            | ErrorCode::InsufficientPayment
            | ErrorCode::AlreadyCancelled => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Unauthorized | ErrorCode::InvalidCredentials | ErrorCode::UserInactive => {
                StatusCode::UNAUTHORIZED
            }
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::PersistenceFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::ValidationError => ErrorCode::ValidationError,
            ErrorKind::ProductNotFound => ErrorCode::ProductNotFound,
            ErrorKind::ProductInactive => ErrorCode::ProductInactive,
            ErrorKind::InsufficientStock => ErrorCode::InsufficientStock,
            ErrorKind::InsufficientPayment => ErrorCode::InsufficientPayment,
            ErrorKind::SaleNotFound => ErrorCode::SaleNotFound,
            ErrorKind::AlreadyCancelled => ErrorCode::AlreadyCancelled,
            ErrorKind::PersistenceFailure => ErrorCode::PersistenceFailure,
        }
    }
}

/// Error body returned by every endpoint.
///
/// ```json
/// { "code": "SALE_NOT_FOUND", "message": "Sale not found: 6f1c..." }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Generic 500. The caller has already logged the cause.
    pub fn persistence() -> Self {
        ApiError::new(ErrorCode::PersistenceFailure, "Database operation failed")
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => inner.into(),
            other => ApiError::new(other.kind().into(), other.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::validation(format!("{} '{}' already exists", field, value))
            }
            in_use @ DbError::InUse { .. } => ApiError::validation(in_use.to_string()),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                ApiError::persistence()
            }
        }
    }
}

impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        match err {
            SaleError::Rejected(core) => core.into(),
            SaleError::Persistence(db) => db.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_engine_kinds_keep_their_codes() {
        let err: ApiError = SaleError::from(CoreError::InsufficientStock {
            product_id: "p-1".into(),
            available: 2,
            requested: 3,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = CoreError::AlreadyCancelled("s-1".into()).into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = CoreError::SaleNotFound("s-1".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_message_is_not_double_wrapped() {
        let err: ApiError = CoreError::from(ValidationError::MustBePositive {
            field: "quantity".into(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "quantity must be positive");
    }

    #[test]
    fn test_persistence_details_are_hidden() {
        let err: ApiError = SaleError::from(DbError::QueryFailed("disk I/O error".into())).into();
        assert_eq!(err.code, ErrorCode::PersistenceFailure);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_refused_delete_is_a_bad_request_naming_the_dependents() {
        let err: ApiError = DbError::in_use("Category", "c-1", "3 product(s)").into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Category c-1 is still referenced by 3 product(s)");
    }

    #[test]
    fn test_code_serializes_screaming_snake_case() {
        let json = serde_json::to_value(ApiError::forbidden("no")).unwrap();
        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["message"], "no");
    }
}
