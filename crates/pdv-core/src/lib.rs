//! # pdv-core
//!
//! Types and rules of the back office with no I/O: money in cents, the
//! sale builder that turns a request into priced lines and totals, role
//! permissions, and the field checks run before any write.
//!
//! ```text
//!  apps/api ──► pdv-db (SQLite, stock ledger, sale engine) ──► pdv-core
//!      └──────────────────────────────────────────────────────────┘
//!                   both depend on this crate, it depends on neither
//! ```
//!
//! ```rust
//! use pdv_core::money::{Money, Percentage};
//!
//! let subtotal = Money::from_cents(700);
//! let discount = subtotal.percentage(Percentage::from_percentage(10.0));
//! assert_eq!(discount.cents(), 70);
//! ```

pub mod error;
pub mod money;
pub mod permissions;
pub mod sale_builder;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::{Money, Percentage};
pub use permissions::Action;
pub use sale_builder::{
    build_sale, validate_request, BuiltLine, BuiltSale, Catalog, ProductSnapshot, SaleLine,
    SaleRequest,
};
pub use types::*;

/// Lines per sale. Also bounds how many product rows one sale locks.
pub const MAX_CART_ITEMS: usize = 100;

/// Per-line quantity cap; catches 1000 typed for 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest single amount accepted from a request: prices, tax, discount,
/// cash received (1,000,000,000.00). Sums of capped values stay far from
/// the i64 limit.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
