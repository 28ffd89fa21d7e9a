//! # Cancellation Engine
//!
//! ```text
//! BEGIN
//!   lock sale row
//!   load sale            ── missing ────────► SaleNotFound
//!   status == cancelled  ── yes ────────────► AlreadyCancelled
//!   restore stock for every item
//!   status = cancelled
//! COMMIT
//! ```
//!
//! Items are never deleted. A cancelled sale keeps its lines so reports and
//! audits can still read what was sold and returned.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use pdv_core::{CoreError, SaleStatus};

use crate::engine::{SaleDetail, SaleResult};
use crate::error::DbError;
use crate::repository::sale::{fetch_items, fetch_sale, lock_sale, set_status};
use crate::stock;

/// Cancels a completed sale and puts its stock back.
///
/// ## Returns
/// * `Ok(SaleDetail)` - the sale, now `cancelled`, with its items
/// * `Err(SaleError::Rejected(SaleNotFound))` - unknown id
/// * `Err(SaleError::Rejected(AlreadyCancelled))` - second cancellation;
///   stock is left untouched
pub async fn cancel_sale(pool: &SqlitePool, sale_id: &str) -> SaleResult<SaleDetail> {
    let mut tx = pool.begin().await.map_err(DbError::transaction)?;

    lock_sale(&mut *tx, sale_id).await?;

    let mut sale = fetch_sale(&mut *tx, sale_id)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

    if sale.is_cancelled() {
        warn!(sale_id = %sale_id, "Sale already cancelled");
        return Err(CoreError::AlreadyCancelled(sale_id.to_string()).into());
    }

    let items = fetch_items(&mut *tx, sale_id).await?;
    for item in &items {
        stock::restore(&mut *tx, &item.product_id, item.quantity).await?;
    }

    let now = Utc::now();
    set_status(&mut *tx, sale_id, SaleStatus::Cancelled, now).await?;

    tx.commit().await.map_err(DbError::transaction)?;

    sale.status = SaleStatus::Cancelled;
    sale.updated_at = now;

    info!(sale_id = %sale_id, items = items.len(), "Sale cancelled");

    Ok(SaleDetail { sale, items })
}
