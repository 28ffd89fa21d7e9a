//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (engine::checkout, one transaction)                         │
//! │     └── insert_sale()  → Sale { status: Completed }                    │
//! │     └── insert_item()  → SaleItem (one per cart line)                  │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL (engine::cancel, one transaction)                │
//! │     └── set_status()   → Sale { status: Cancelled }                    │
//! │         items are kept; only the status changes                        │
//! │                                                                         │
//! │  READ (this repository)                                                │
//! │     └── list() / get_detail()                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write functions are crate-private and take the engine's connection,
//! so a sale can only be written together with its stock movements.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use pdv_core::{PaymentMethod, Sale, SaleItem, SaleStatus};

use crate::error::DbResult;
use crate::repository::DateRange;

const SALE_COLUMNS: &str = r#"
    id, total_cents, discount_cents, tax_cents, final_total_cents, payment_method,
    amount_received_cents, change_cents, status, user_id, created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, sale_id, product_id, quantity, unit_price_cents, total_cents, created_at
"#;

/// Default page size for sale listings.
pub const DEFAULT_SALE_LIMIT: u32 = 50;

/// Largest page a caller may ask for.
pub const MAX_SALE_LIMIT: u32 = 200;

/// A sale together with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Listing filter for [`SaleRepository::list`].
#[derive(Debug, Clone)]
pub struct SaleFilter {
    pub user_id: Option<String>,
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub range: DateRange,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl Default for SaleFilter {
    fn default() -> Self {
        SaleFilter {
            user_id: None,
            status: None,
            payment_method: None,
            range: DateRange::default(),
            page: 1,
            limit: DEFAULT_SALE_LIMIT,
        }
    }
}

impl SaleFilter {
    /// Page and limit clamped to usable values.
    fn paging(&self) -> (u32, u32) {
        let page = self.page.max(1);
        let limit = self.limit.clamp(1, MAX_SALE_LIMIT);
        (page, limit)
    }
}

/// One page of sales, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct SalePage {
    pub sales: Vec<Sale>,
    /// Number of sales matching the filter across all pages.
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// Repository for reading sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale and its items.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;

        let Some(sale) = fetch_sale(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut conn, id).await?;

        Ok(Some(SaleDetail { sale, items }))
    }

    /// Lists sales matching `filter`, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<SalePage> {
        let (page, limit) = filter.paging();
        let offset = (page - 1) as i64 * limit as i64;

        debug!(
            user_id = ?filter.user_id,
            status = ?filter.status,
            page,
            limit,
            "Listing sales"
        );

        const WHERE: &str = r#"
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR payment_method = ?3)
              AND (?4 IS NULL OR created_at >= ?4)
              AND (?5 IS NULL OR created_at < ?5)
        "#;

        let from = filter.range.from();
        let until = filter.range.until();

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales {WHERE} ORDER BY created_at DESC LIMIT ?6 OFFSET ?7"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(filter.user_id.as_deref())
            .bind(filter.status)
            .bind(filter.payment_method)
            .bind(from)
            .bind(until)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM sales {WHERE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.user_id.as_deref())
            .bind(filter.status)
            .bind(filter.payment_method)
            .bind(from)
            .bind(until)
            .fetch_one(&self.pool)
            .await?;

        Ok(SalePage {
            sales,
            total,
            page,
            limit,
        })
    }
}

// =============================================================================
// Transaction-scoped operations (sale engine)
// =============================================================================

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid");
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Takes the write lock by touching the sale row, so concurrent
/// cancellations of one sale run one after the other.
pub(crate) async fn lock_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("UPDATE sales SET status = status WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, final_total = sale.final_total_cents, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, total_cents, discount_cents, tax_cents, final_total_cents,
            payment_method, amount_received_cents, change_cents, status,
            user_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.total_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.final_total_cents)
    .bind(sale.payment_method)
    .bind(sale.amount_received_cents)
    .bind(sale.change_cents)
    .bind(sale.status)
    .bind(&sale.user_id)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, quantity, unit_price_cents, total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.total_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: SaleStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(crate::error::DbError::not_found("Sale", id));
    }

    Ok(())
}
