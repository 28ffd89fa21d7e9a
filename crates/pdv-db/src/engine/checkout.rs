//! # Sale Transaction Coordinator
//!
//! Records a sale and takes its stock in one transaction.
//!
//! ## Flow
//! ```text
//! create_sale(request, user_id)
//!      │
//!      ├── validate_request()          reject malformed carts before BEGIN
//!      ▼
//! BEGIN ───────────────────────────────────────────────────────────────┐
//!      │                                                               │
//!      ├── stock::lock(id) for each distinct product (sorted)          │
//!      ├── snapshot(id)    read price/active/stock under the lock      │
//!      ├── build_sale()    totals, discount, change                    │
//!      ├── stock::reserve(line) for each line                          │
//!      ├── insert_sale()                                               │
//!      ├── insert_item() for each line                                 │
//!      ▼                                                               │
//! COMMIT ◄─────── any error before here: transaction dropped ──────────┘
//!                 → ROLLBACK, no sale, no items, no stock change
//! ```
//!
//! Two overlapping checkouts serialize on the SQLite write lock. The second
//! one builds its sale from the stock the first one committed.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use pdv_core::{build_sale, validate_request, BuiltSale, Sale, SaleItem, SaleRequest, SaleStatus};

use crate::engine::{SaleDetail, SaleResult};
use crate::error::DbError;
use crate::repository::product::snapshot;
use crate::repository::sale::{insert_item, insert_sale};
use crate::stock;

/// Validates, prices and records a sale, decrementing stock for every line.
///
/// ## Arguments
/// * `request` - cart and payment as submitted by the register
/// * `user_id` - the authenticated cashier recording the sale
///
/// ## Returns
/// * `Ok(SaleDetail)` - committed sale with status `completed` and its items
/// * `Err(SaleError::Rejected(_))` - a business rule failed; nothing written
/// * `Err(SaleError::Persistence(_))` - the store failed; rolled back
pub async fn create_sale(
    pool: &SqlitePool,
    request: &SaleRequest,
    user_id: &str,
) -> SaleResult<SaleDetail> {
    validate_request(request).inspect_err(|e| warn!(error = %e, "Sale rejected"))?;

    let mut tx = pool.begin().await.map_err(DbError::transaction)?;

    // Sorted so every writer touches rows in the same order.
    let mut product_ids: Vec<&str> = request.items.iter().map(|i| i.product_id.as_str()).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    for id in &product_ids {
        stock::lock(&mut *tx, id).await?;
    }

    let mut catalog = HashMap::with_capacity(product_ids.len());
    for id in &product_ids {
        if let Some(product) = snapshot(&mut *tx, id).await? {
            catalog.insert(id.to_string(), product);
        }
    }

    let built = build_sale(request, &catalog).inspect_err(|e| {
        warn!(kind = %e.kind(), error = %e, "Sale rejected");
    })?;

    for line in &built.lines {
        stock::reserve(&mut *tx, &line.product_id, line.quantity).await?;
    }

    let (sale, items) = into_rows(&built, user_id);

    insert_sale(&mut *tx, &sale).await?;
    for item in &items {
        insert_item(&mut *tx, item).await?;
    }

    tx.commit().await.map_err(DbError::transaction)?;

    info!(
        sale_id = %sale.id,
        user_id = %user_id,
        items = items.len(),
        final_total = %built.final_total,
        payment_method = %sale.payment_method,
        "Sale recorded"
    );

    Ok(SaleDetail { sale, items })
}

/// Assigns ids and timestamps to a priced sale.
fn into_rows(built: &BuiltSale, user_id: &str) -> (Sale, Vec<SaleItem>) {
    let now = Utc::now();
    let sale_id = Uuid::new_v4().to_string();

    let sale = Sale {
        id: sale_id.clone(),
        total_cents: built.total.cents(),
        discount_cents: built.discount.cents(),
        tax_cents: built.tax.cents(),
        final_total_cents: built.final_total.cents(),
        payment_method: built.payment_method,
        amount_received_cents: built.amount_received.map(|m| m.cents()),
        change_cents: built.change.map(|m| m.cents()),
        status: SaleStatus::Completed,
        user_id: user_id.to_string(),
        created_at: now,
        updated_at: now,
    };

    let items = built
        .lines
        .iter()
        .map(|line| SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            total_cents: line.total.cents(),
            created_at: now,
        })
        .collect();

    (sale, items)
}
