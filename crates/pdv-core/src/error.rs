//! # Domain Errors
//!
//! A refused sale or cancellation is a [`CoreError`]. Bad input is a
//! [`ValidationError`], which also converts into `CoreError`. Both carry
//! an [`ErrorKind`], and that name is the only thing clients should branch on.
//!
//! ```text
//! ValidationError ─► CoreError ─┐
//!                               ├─► SaleError (pdv-db) ─► ApiError { code, message }
//!            DbError (pdv-db) ──┘
//! ```

use std::fmt;

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// Machine-readable failure class, serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ValidationError,
    ProductNotFound,
    ProductInactive,
    InsufficientStock,
    InsufficientPayment,
    SaleNotFound,
    AlreadyCancelled,
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::ProductNotFound => "PRODUCT_NOT_FOUND",
            ErrorKind::ProductInactive => "PRODUCT_INACTIVE",
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::InsufficientPayment => "INSUFFICIENT_PAYMENT",
            ErrorKind::SaleNotFound => "SALE_NOT_FOUND",
            ErrorKind::AlreadyCancelled => "ALREADY_CANCELLED",
            ErrorKind::PersistenceFailure => "PERSISTENCE_FAILURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business refusals. None of these leave anything written.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The id is not in the catalog (or was removed after the cart was built).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product is inactive: {0}")]
    ProductInactive(String),

    /// `available` is the stock seen under the write lock, so a client
    /// can show "only N left" without another round trip.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Cash sale where `amount_received` is below the final total.
    #[error("Insufficient payment: received {received}, total due {due}")]
    InsufficientPayment { received: Money, due: Money },

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A second cancel of the same sale.
    #[error("Sale {0} is already cancelled")]
    AlreadyCancelled(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_) => ErrorKind::ProductNotFound,
            CoreError::ProductInactive(_) => ErrorKind::ProductInactive,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InsufficientPayment { .. } => ErrorKind::InsufficientPayment,
            CoreError::SaleNotFound(_) => ErrorKind::SaleNotFound,
            CoreError::AlreadyCancelled(_) => ErrorKind::AlreadyCancelled,
            CoreError::Validation(_) => ErrorKind::ValidationError,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A field that fails a shape or range rule. Always [`ErrorKind::ValidationError`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Amount above the accepted ceiling, or a sum that would overflow.
    #[error("{field} must not exceed {max}")]
    TooLarge { field: String, max: Money },

    /// Unparseable email, date or enum text.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_and_payment_messages_carry_the_numbers() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 3, requested 5"
        );

        let err = CoreError::InsufficientPayment {
            received: Money::from_cents(500),
            due: Money::from_cents(630),
        };
        assert_eq!(err.to_string(), "Insufficient payment: received 5.00, total due 6.30");
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::TooShort {
            field: "name".to_string(),
            min: 2,
        };
        assert_eq!(err.to_string(), "name must be at least 2 characters");
    }

    #[test]
    fn too_large_shows_the_ceiling_as_money() {
        let err = ValidationError::TooLarge {
            field: "tax".to_string(),
            max: Money::from_cents(100_000_000_000),
        };
        assert_eq!(err.to_string(), "tax must not exceed 1000000000.00");
    }

    #[test]
    fn validation_becomes_a_validation_kind() {
        let core_err: CoreError = ValidationError::Required {
            field: "items".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn kind_names() {
        assert_eq!(
            CoreError::AlreadyCancelled("s-1".into()).kind().as_str(),
            "ALREADY_CANCELLED"
        );
        assert_eq!(ErrorKind::PersistenceFailure.to_string(), "PERSISTENCE_FAILURE");
    }
}
