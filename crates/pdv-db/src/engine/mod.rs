//! # Sale Engine
//!
//! The two operations that change sales and stock together, each inside one
//! sqlx transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Sale Engine                                   │
//! │                                                                         │
//! │  create_sale (checkout.rs)            cancel_sale (cancel.rs)           │
//! │  ─────────────────────────            ───────────────────────           │
//! │  BEGIN                                BEGIN                             │
//! │  lock touched products                lock sale row                     │
//! │  snapshot → build_sale()              load sale + items                 │
//! │  reserve each line  ──┐               reject if cancelled               │
//! │  insert sale + items  │ Stock         restore each line  ──┐ Stock      │
//! │  COMMIT               │ Ledger        status = cancelled   │ Ledger     │
//! │                       ▼               COMMIT               ▼            │
//! │                   stock.rs                             stock.rs         │
//! │                                                                         │
//! │  Any `?` before COMMIT drops the transaction, which rolls it back.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cancel;
mod checkout;

pub use cancel::cancel_sale;
pub use checkout::create_sale;

pub use crate::repository::sale::SaleDetail;

use pdv_core::{CoreError, ErrorKind};
use thiserror::Error;

use crate::error::DbError;

/// Why a sale operation failed.
///
/// ```text
/// Rejected     the request broke a business rule; nothing was written
/// Persistence  the store failed; the transaction was rolled back
/// ```
#[derive(Debug, Error)]
pub enum SaleError {
    #[error(transparent)]
    Rejected(#[from] CoreError),

    #[error(transparent)]
    Persistence(#[from] DbError),
}

impl SaleError {
    /// Stable classification for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaleError::Rejected(err) => err.kind(),
            SaleError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}

impl From<sqlx::Error> for SaleError {
    fn from(err: sqlx::Error) -> Self {
        SaleError::Persistence(DbError::from(err))
    }
}

/// Result type for sale engine operations.
pub type SaleResult<T> = Result<T, SaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_passes_through_domain_errors() {
        let err = SaleError::from(CoreError::AlreadyCancelled("s-1".into()));
        assert_eq!(err.kind(), ErrorKind::AlreadyCancelled);
        assert_eq!(err.to_string(), "Sale s-1 is already cancelled");
    }

    #[test]
    fn test_store_failures_are_persistence() {
        let err = SaleError::from(DbError::TransactionFailed("database is locked".into()));
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    }
}
