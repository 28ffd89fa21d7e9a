//! # Report Repository
//!
//! Read-only aggregates over the catalog and committed sales. Only
//! `completed` sales count towards revenue; cancelled sales are counted
//! separately and never contribute money.
//!
//! ## Time Windows
//! ```text
//! now = Thu 2026-10-15 14:30Z
//!
//!   Day    2026-10-15T00:00Z ──► now
//!   Week   2026-10-12T00:00Z ──► now   (weeks start on Monday)
//!   Month  2026-10-01T00:00Z ──► now
//!   Year   2026-01-01T00:00Z ──► now
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use pdv_core::money::{self, Money};
use pdv_core::{Product, ValidationError};

use crate::error::DbResult;
use crate::repository::{start_of_day, DateRange};

/// Default number of rows in the best-sellers list.
pub const DEFAULT_TOP_PRODUCTS: u32 = 10;

// =============================================================================
// Report Types
// =============================================================================

/// Totals for a sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    /// Completed sales in range.
    pub total_sales: i64,
    /// Sum of `final_total` over completed sales.
    #[serde(with = "money::decimal")]
    pub total_revenue: Money,
    /// `total_revenue / total_sales`, or zero when there were no sales.
    #[serde(with = "money::decimal")]
    pub average_ticket: Money,
    pub cancelled_sales: i64,
}

/// Headline numbers for the back-office dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_products: i64,
    pub active_products: i64,
    pub low_stock_products: i64,
    pub total_categories: i64,
    pub total_users: i64,
    pub today_sales: i64,
    #[serde(with = "money::decimal")]
    pub today_revenue: Money,
    pub month_sales: i64,
    #[serde(with = "money::decimal")]
    pub month_revenue: Money,
    pub year_sales: i64,
    #[serde(with = "money::decimal")]
    pub year_revenue: Money,
}

/// One row of the best-sellers list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: String,
    pub product_name: String,
    pub total_sold: i64,
    #[serde(with = "money::decimal")]
    pub total_revenue: Money,
}

/// Window for the best-sellers list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    /// Midnight (UTC) at which the window containing `now` starts.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let day = match self {
            Period::Day => today,
            Period::Week => today
                .checked_sub_days(Days::new(today.weekday().num_days_from_monday() as u64))
                .unwrap_or(today),
            Period::Month => NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today),
            Period::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };
        start_of_day(day)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            _ => Err(ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: vec!["day".into(), "week".into(), "month".into(), "year".into()],
            }),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sales totals over `range` (unbounded ends allowed).
    pub async fn sales_report(&self, range: &DateRange) -> DbResult<SalesReport> {
        debug!(start = ?range.start, end = ?range.end, "Building sales report");

        let (total_sales, revenue_cents, cancelled_sales): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN final_total_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0)
            FROM sales
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at < ?2)
            "#,
        )
        .bind(range.from())
        .bind(range.until())
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesReport {
            total_sales,
            total_revenue: Money::from_cents(revenue_cents),
            average_ticket: average(revenue_cents, total_sales),
            cancelled_sales,
        })
    }

    /// Dashboard counters as of `now`.
    pub async fn dashboard_stats(&self, now: DateTime<Utc>) -> DbResult<DashboardStats> {
        let (total_products, active_products, low_stock_products): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN active = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN active = 1 AND stock <= min_stock THEN 1 ELSE 0 END), 0)
                FROM products
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        let total_categories: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE active = 1")
                .fetch_one(&self.pool)
                .await?;

        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        let (today_sales, today_revenue) = self.completed_since(Period::Day.start(now)).await?;
        let (month_sales, month_revenue) = self.completed_since(Period::Month.start(now)).await?;
        let (year_sales, year_revenue) = self.completed_since(Period::Year.start(now)).await?;

        Ok(DashboardStats {
            total_products,
            active_products,
            low_stock_products,
            total_categories,
            total_users,
            today_sales,
            today_revenue,
            month_sales,
            month_revenue,
            year_sales,
            year_revenue,
        })
    }

    /// Active products at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, barcode, price_cents, cost_price_cents,
                   stock, min_stock, unit, active, category_id, created_at, updated_at
            FROM products
            WHERE active = 1 AND stock <= min_stock
            ORDER BY stock ASC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Best sellers by quantity in completed sales since the start of
    /// `period`.
    pub async fn top_products(
        &self,
        period: Period,
        limit: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<TopProduct>> {
        debug!(%period, limit, "Building top products");

        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT si.product_id, p.name, SUM(si.quantity), SUM(si.total_cents)
            FROM sale_items si
            INNER JOIN sales s ON s.id = si.sale_id
            INNER JOIN products p ON p.id = si.product_id
            WHERE s.status = 'completed' AND s.created_at >= ?1
            GROUP BY si.product_id, p.name
            ORDER BY SUM(si.quantity) DESC, p.name
            LIMIT ?2
            "#,
        )
        .bind(period.start(now))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, product_name, total_sold, revenue_cents)| TopProduct {
                product_id,
                product_name,
                total_sold,
                total_revenue: Money::from_cents(revenue_cents),
            })
            .collect())
    }

    async fn completed_since(&self, since: DateTime<Utc>) -> DbResult<(i64, Money)> {
        let (count, cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(final_total_cents), 0)
            FROM sales
            WHERE status = 'completed' AND created_at >= ?1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok((count, Money::from_cents(cents)))
    }
}

/// Rounded half-up average in cents.
fn average(total_cents: i64, count: i64) -> Money {
    if count <= 0 {
        return Money::zero();
    }
    Money::from_cents((total_cents + count / 2) / count)
}
