//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Listing with name/barcode search
//! - Lookup by id and by barcode (scanner path)
//! - Creation, full update, delete of never-sold products
//! - Manual stock corrections through the Stock Ledger
//! - Catalog snapshots for the sale engine

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use pdv_core::{CoreError, Money, Product, ProductSnapshot, StockAdjustment};

use crate::engine::SaleResult;
use crate::error::{DbError, DbResult};
use crate::stock;

const PRODUCT_COLUMNS: &str = r#"
    id, name, description, barcode, price_cents, cost_price_cents,
    stock, min_stock, unit, active, category_id, created_at, updated_at
"#;

/// Default page size for product listings.
pub const DEFAULT_PRODUCT_LIMIT: u32 = 100;

/// Listing filter for [`ProductRepository::list`].
#[derive(Debug, Clone)]
pub struct ProductFilter {
    /// Substring match on name or barcode.
    pub search: Option<String>,
    pub active: Option<bool>,
    pub category_id: Option<String>,
    pub limit: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            search: None,
            active: None,
            category_id: None,
            limit: DEFAULT_PRODUCT_LIMIT,
        }
    }
}

/// Fields of a product to be created. Validated by the caller.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub price: Money,
    pub cost_price: Money,
    pub stock: i64,
    pub min_stock: i64,
    pub unit: String,
    pub category_id: Option<String>,
    pub active: bool,
}

/// Replacement values for [`ProductRepository::update`].
///
/// The required fields overwrite the row; `None` in an optional field keeps
/// what is stored. A new `stock` is applied as a ledger `set`.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub price: Money,
    pub cost_price: Option<Money>,
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub unit: String,
    pub category_id: Option<String>,
    pub active: Option<bool>,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_barcode("7894900011517").await?;
/// let product = repo.adjust_stock(&id, StockAdjustment::Add, 24).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products, ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(search = ?filter.search, active = ?filter.active, "Listing products");

        let pattern = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (?1 IS NULL OR name LIKE ?1 OR barcode LIKE ?1)
              AND (?2 IS NULL OR active = ?2)
              AND (?3 IS NULL OR category_id = ?3)
            ORDER BY name
            LIMIT ?4
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(filter.active)
            .bind(filter.category_id.as_deref())
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listing returned products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and timestamps
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown category
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        debug!(name = %new.name, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: new.name,
            description: new.description,
            barcode: new.barcode,
            price_cents: new.price.cents(),
            cost_price_cents: new.cost_price.cents(),
            stock: new.stock,
            min_stock: new.min_stock,
            unit: new.unit,
            active: new.active,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, barcode, price_cents, cost_price_cents,
                stock, min_stock, unit, active, category_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(product.price_cents)
        .bind(product.cost_price_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(&product.unit)
        .bind(product.active)
        .bind(&product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| barcode_conflict(e, product.barcode.as_deref()))?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Rewrites a product's catalog fields.
    ///
    /// Repricing never touches recorded sales: sale items keep the unit
    /// price they were sold at.
    ///
    /// ## Returns
    /// * `Err(SaleError::Rejected(ProductNotFound))` - unknown id
    /// * `Err(SaleError::Persistence(UniqueViolation))` - barcode taken by another product
    /// * `Err(SaleError::Persistence(ForeignKeyViolation))` - unknown category
    pub async fn update(&self, id: &str, changes: ProductUpdate) -> SaleResult<Product> {
        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2,
                description = ?3,
                barcode = ?4,
                price_cents = ?5,
                cost_price_cents = COALESCE(?6, cost_price_cents),
                min_stock = COALESCE(?7, min_stock),
                unit = ?8,
                category_id = ?9,
                active = COALESCE(?10, active),
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.barcode)
        .bind(changes.price.cents())
        .bind(changes.cost_price.map(|m| m.cents()))
        .bind(changes.min_stock)
        .bind(&changes.unit)
        .bind(&changes.category_id)
        .bind(changes.active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| barcode_conflict(e, changes.barcode.as_deref()))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        if let Some(quantity) = changes.stock {
            stock::adjust(&mut *tx, id, StockAdjustment::Set, quantity).await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;
        info!(id = %id, "Product updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Deletes a product that has never been sold.
    ///
    /// Products with sale items stay; deactivate them through
    /// [`ProductRepository::update`] instead.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - the product appears on at least one sale
    /// * `Err(DbError::NotFound)` - unknown id
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let sold: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if sold > 0 {
            return Err(DbError::in_use("Product", id, format!("{} sale item(s)", sold)));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;
        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Applies a manual stock correction and returns the updated product.
    ///
    /// Runs in its own transaction through [`stock::adjust`].
    ///
    /// ## Returns
    /// * `Err(SaleError::Rejected(Validation))` - negative quantity
    /// * `Err(SaleError::Rejected(ProductNotFound))` - unknown id
    pub async fn adjust_stock(
        &self,
        id: &str,
        kind: StockAdjustment,
        quantity: i64,
    ) -> SaleResult<Product> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let stock = stock::adjust(&mut *tx, id, kind, quantity).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        info!(id = %id, ?kind, quantity, stock, "Stock adjusted");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Reads the sale-relevant fields of a product.
    pub async fn lookup(&self, id: &str) -> DbResult<Option<ProductSnapshot>> {
        let mut conn = self.pool.acquire().await?;
        snapshot(&mut conn, id).await
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Reads a product snapshot on the caller's connection.
///
/// Inside the sale transaction this runs after the row has been locked, so
/// the values cannot change before the transaction ends.
pub(crate) async fn snapshot(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<ProductSnapshot>> {
    let row: Option<(i64, bool, i64)> =
        sqlx::query_as("SELECT price_cents, active, stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(row.map(|(price_cents, active, stock)| ProductSnapshot {
        price: Money::from_cents(price_cents),
        active,
        stock,
    }))
}

fn barcode_conflict(err: sqlx::Error, barcode: Option<&str>) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("barcode", barcode.unwrap_or_default()),
        other => other,
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
