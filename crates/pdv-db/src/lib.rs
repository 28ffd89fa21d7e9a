//! # pdv-db
//!
//! Storage for the back office: catalog, users and sales in SQLite via sqlx,
//! plus the engine that records and cancels sales as single transactions.
//!
//! ```text
//! POST /sales ──► Database::create_sale ──► engine::checkout ─┐
//! PUT  /cancel ─► Database::cancel_sale ──► engine::cancel ───┤
//!                                                             ▼
//!                                            stock ledger (stock.rs)
//!                                                             │
//! GET  ... ─────► repositories (product, category, user,      ▼
//!                 sale, report) ───────────────────────► SQLite (WAL)
//! ```
//!
//! Stock only moves inside an engine transaction or an explicit
//! [`ProductRepository::adjust_stock`] call; the repositories never touch it.
//!
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("pdv.db")).await?;
//! let detail = db.create_sale(&request, &user.id).await?;
//! db.cancel_sale(&detail.sale.id).await?;
//! ```

pub mod engine;
pub mod error;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;
pub mod stock;

pub use engine::{SaleError, SaleResult};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::category::{CategoryRepository, CategoryUpdate, NewCategory};
pub use repository::product::{NewProduct, ProductFilter, ProductRepository, ProductUpdate};
pub use repository::report::{
    DashboardStats, Period, ReportRepository, SalesReport, TopProduct,
};
pub use repository::sale::{SaleDetail, SaleFilter, SalePage, SaleRepository};
pub use repository::user::{NewUser, UserRepository, UserUpdate};
pub use repository::DateRange;
