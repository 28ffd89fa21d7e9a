//! # Seed Data
//!
//! Creates the default administrator and a small demo catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./pdv.db
//! cargo run -p pdv-db --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p pdv-db --bin seed -- --db ./data/pdv.db --admin-password s3cret
//! ```
//!
//! Idempotent: the admin is only created when no users exist, the catalog
//! only when no products exist. Running it twice changes nothing.

use std::env;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pdv_core::{Money, Role};
use pdv_db::{Database, DbConfig, NewCategory, NewProduct, NewUser};

const DEFAULT_ADMIN_EMAIL: &str = "admin@pdv.local";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// (category, description, [(name, barcode, price_cents, cost_cents, stock, min_stock, unit)])
#[allow(clippy::type_complexity)]
const CATALOG: &[(&str, &str, &[(&str, &str, i64, i64, i64, i64, &str)])] = &[
    (
        "Bebidas",
        "Refrigerantes, sucos e água",
        &[
            ("Água Mineral 500ml", "7891234500017", 350, 120, 48, 12, "un"),
            ("Refrigerante Cola 2L", "7891234500024", 899, 520, 24, 6, "un"),
            ("Suco de Laranja 1L", "7891234500031", 749, 410, 18, 6, "un"),
        ],
    ),
    (
        "Padaria",
        "Pães e bolos do dia",
        &[
            ("Pão Francês", "2000000000015", 1599, 700, 30, 5, "kg"),
            ("Bolo de Cenoura", "2000000000022", 1890, 900, 4, 2, "un"),
        ],
    ),
    (
        "Mercearia",
        "Itens de despensa",
        &[
            ("Arroz Branco 5kg", "7891234500048", 2790, 1980, 20, 5, "un"),
            ("Feijão Carioca 1kg", "7891234500055", 849, 560, 25, 5, "un"),
            ("Café Torrado 500g", "7891234500062", 1699, 1150, 3, 5, "un"),
        ],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = env::var("PDV_DB_PATH").unwrap_or_else(|_| String::from("./pdv.db"));
    let mut admin_password =
        env::var("PDV_ADMIN_PASSWORD").unwrap_or_else(|_| String::from(DEFAULT_ADMIN_PASSWORD));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PDV Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>              Database file path (default: ./pdv.db)");
                println!("      --admin-password <PW>    Password for {}", DEFAULT_ADMIN_EMAIL);
                println!("  -h, --help                   Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("PDV Seed Data");
    println!("=============");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening database at {}", db_path))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    seed_admin(&db, &admin_password).await?;
    seed_catalog(&db).await?;

    db.close().await;

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

async fn seed_admin(db: &Database, password: &str) -> anyhow::Result<()> {
    let users = db.users().count().await?;
    if users > 0 {
        println!("⚠ Database already has {} users, skipping admin", users);
        return Ok(());
    }

    db.users()
        .create(NewUser {
            name: "Administrador".to_string(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        })
        .await
        .context("creating default admin")?;

    println!("✓ Created admin {}", DEFAULT_ADMIN_EMAIL);
    Ok(())
}

async fn seed_catalog(db: &Database) -> anyhow::Result<()> {
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products, skipping catalog", existing);
        return Ok(());
    }

    let mut generated = 0;
    for (category_name, description, products) in CATALOG {
        let category = db
            .categories()
            .create(NewCategory {
                name: category_name.to_string(),
                description: Some(description.to_string()),
            })
            .await
            .with_context(|| format!("creating category {}", category_name))?;

        for (name, barcode, price, cost, stock, min_stock, unit) in products.iter() {
            db.products()
                .create(NewProduct {
                    name: name.to_string(),
                    description: None,
                    barcode: Some(barcode.to_string()),
                    price: Money::from_cents(*price),
                    cost_price: Money::from_cents(*cost),
                    stock: *stock,
                    min_stock: *min_stock,
                    unit: unit.to_string(),
                    category_id: Some(category.id.clone()),
                    active: true,
                })
                .await
                .with_context(|| format!("creating product {}", name))?;
            generated += 1;
        }
    }

    println!("✓ Created {} categories and {} products", CATALOG.len(), generated);
    Ok(())
}
