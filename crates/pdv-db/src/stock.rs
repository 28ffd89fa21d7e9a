//! # Stock Ledger
//!
//! Every stock mutation in the system goes through this module, on a
//! connection the caller already holds inside a transaction.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lock(id)        UPDATE products SET stock = stock WHERE id = ?        │
//! │                  takes the SQLite write lock before anything is read   │
//! │                                                                         │
//! │  reserve(id, q)  UPDATE products SET stock = stock - q                 │
//! │                  WHERE id = ? AND stock >= q                           │
//! │                  0 rows → InsufficientStock, nothing changed           │
//! │                                                                         │
//! │  restore(id, q)  UPDATE products SET stock = stock + q                 │
//! │                                                                         │
//! │  adjust(id, k,q) add / subtract (floored at 0) / set                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! SQLite has no `SELECT ... FOR UPDATE`. A transaction that reads first and
//! writes later can lose the race for the write lock and fail outright. By
//! writing first, a second writer blocks in the busy handler until the first
//! commits, and then reads the stock the first one left behind.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use pdv_core::validation::validate_stock_quantity;
use pdv_core::{CoreError, StockAdjustment};

use crate::engine::{SaleError, SaleResult};
use crate::error::{DbError, DbResult};

/// Takes the write lock on behalf of the current transaction.
///
/// Touching an id that does not exist still takes the lock; the missing
/// product is reported later by the snapshot read.
pub async fn lock(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE products SET stock = stock WHERE id = ?1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Decrements stock by `quantity` only if enough is on hand.
///
/// ## Returns
/// * `Ok(())` - stock decremented
/// * `Err(SaleError::Rejected(InsufficientStock))` - stock unchanged
/// * `Err(SaleError::Rejected(ProductNotFound))` - no such product
pub async fn reserve(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> SaleResult<()> {
    debug!(product_id = %product_id, quantity, "Reserving stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)?;

    Err(SaleError::Rejected(match available {
        Some(available) => CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available,
            requested: quantity,
        },
        None => CoreError::ProductNotFound(product_id.to_string()),
    }))
}

/// Increments stock by `quantity`. Used by cancellation.
pub async fn restore(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> DbResult<()> {
    debug!(product_id = %product_id, quantity, "Restoring stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    Ok(())
}

/// Applies a manual correction and returns the resulting stock.
///
/// ```text
/// Add       stock + q
/// Subtract  max(0, stock - q)
/// Set       q
/// ```
pub async fn adjust(
    conn: &mut SqliteConnection,
    product_id: &str,
    kind: StockAdjustment,
    quantity: i64,
) -> SaleResult<i64> {
    validate_stock_quantity("quantity", quantity).map_err(CoreError::from)?;

    let sql = match kind {
        StockAdjustment::Add => "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        StockAdjustment::Subtract => {
            "UPDATE products SET stock = MAX(0, stock - ?2), updated_at = ?3 WHERE id = ?1"
        }
        StockAdjustment::Set => "UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1",
    };

    let result = sqlx::query(sql)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }

    let stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(DbError::from)?;

    Ok(stock)
}
