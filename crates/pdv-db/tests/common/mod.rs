//! Shared fixtures for the pdv-db integration tests.

#![allow(dead_code)]

use chrono::Utc;
use uuid::Uuid;

use pdv_core::{Money, PaymentMethod, SaleLine, SaleRequest};
use pdv_db::{Database, DbConfig, NewProduct};

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Inserts a cashier directly, skipping the (slow) password hash.
pub async fn cashier(db: &Database) -> String {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, active, created_at, updated_at)
        VALUES (?1, 'Caixa', ?2, 'x', 'cashier', 1, ?3, ?3)
        "#,
    )
    .bind(&id)
    .bind(format!("{}@pdv.local", id))
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();
    id
}

pub async fn product(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
    db.products()
        .create(NewProduct {
            name: name.to_string(),
            description: None,
            barcode: None,
            price: Money::from_cents(price_cents),
            cost_price: Money::zero(),
            stock,
            min_stock: 0,
            unit: "un".to_string(),
            category_id: None,
            active: true,
        })
        .await
        .unwrap()
        .id
}

pub async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products().get_by_id(product_id).await.unwrap().unwrap().stock
}

pub async fn sale_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sales")
        .fetch_one(db.pool())
        .await
        .unwrap()
}

pub async fn item_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
        .fetch_one(db.pool())
        .await
        .unwrap()
}

pub fn line(product_id: &str, quantity: i64) -> SaleLine {
    SaleLine {
        product_id: product_id.to_string(),
        quantity,
    }
}

pub fn request(items: Vec<SaleLine>, payment_method: PaymentMethod) -> SaleRequest {
    SaleRequest {
        items,
        payment_method,
        discount_percentage: None,
        discount: None,
        tax: None,
        amount_received: None,
    }
}
