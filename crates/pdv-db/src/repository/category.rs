//! # Category Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use pdv_core::Category;

use crate::error::{DbError, DbResult};

/// Fields of a category to be created.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Replacement values for [`CategoryRepository::update`]. `active: None`
/// keeps the current flag.
#[derive(Debug, Clone)]
pub struct CategoryUpdate {
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// Repository for product categories.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists categories by name. `active_only` hides deactivated ones.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Category>> {
        debug!(active_only, "Listing categories");

        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, active, created_at, updated_at
            FROM categories
            WHERE (?1 = 0 OR active = 1)
            ORDER BY name
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, active, created_at, updated_at
            FROM categories
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Inserts a new, active category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - A category with this name exists
    pub async fn create(&self, new: NewCategory) -> DbResult<Category> {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| name_conflict(e, &category.name))?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// ## Returns
    /// * `Err(DbError::NotFound)` - unknown id
    /// * `Err(DbError::UniqueViolation)` - another category has this name
    pub async fn update(&self, id: &str, changes: CategoryUpdate) -> DbResult<Category> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = ?2, description = ?3, active = COALESCE(?4, active), updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| name_conflict(e, &changes.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        info!(id = %id, name = %changes.name, "Category updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Deletes a category no product belongs to.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - products still reference it
    /// * `Err(DbError::NotFound)` - unknown id
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if products > 0 {
            return Err(DbError::in_use("Category", id, format!("{} product(s)", products)));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;
        info!(id = %id, "Category deleted");
        Ok(())
    }
}

fn name_conflict(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("name", name),
        other => other,
    }
}
