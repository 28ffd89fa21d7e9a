//! # Domain Types
//!
//! Row-shaped structs for the five tables, plus the enums stored in them.
//!
//! ```text
//! users ◄── sales.user_id
//!           sales ◄── sale_items.sale_id
//!                     sale_items.product_id ──► products.category_id ──► categories
//! ```
//!
//! Amounts are kept as `*_cents` integers exactly as stored; accessors such
//! as [`Product::price`] wrap them in [`Money`]. Response DTOs in the API
//! turn them into decimals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Back-office role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Catalog, cancellations and reports.
    Manager,
    /// Records sales and reads the catalog.
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Cashier
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".into(), "manager".into(), "cashier".into()],
            }),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A back-office user.
///
/// The password hash never leaves the process: it is skipped on
/// serialization and in the generated TypeScript type.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    #[ts(as = "Option<String>")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Category
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the cashier.
    pub name: String,

    pub description: Option<String>,

    /// Barcode (EAN-13, UPC-A, etc.). Unique when present.
    pub barcode: Option<String>,

    /// Sale price in cents.
    pub price_cents: i64,

    /// Cost in cents (for margin reports).
    pub cost_price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Reorder threshold for the low-stock report.
    pub min_stock: i64,

    /// Unit of measure ("un", "kg", "l", ...).
    pub unit: String,

    /// Inactive products stay in history but cannot be sold.
    pub active: bool,

    pub category_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// True when stock has reached the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Manual stock correction applied from the catalog screen.
///
/// ## Semantics
/// ```text
/// Add       stock = stock + qty
/// Subtract  stock = max(0, stock - qty)
/// Set       stock = qty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockAdjustment {
    Add,
    Subtract,
    Set,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ```text
///   create_sale ──► Completed ──cancel_sale──► Cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale has been paid and its stock taken.
    Completed,
    /// Sale was cancelled and its stock restored.
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["completed".into(), "cancelled".into()],
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid.
///
/// The Portuguese spellings used by older registers (`dinheiro`,
/// `cartao_credito`, `cartao_debito`) are accepted on input and normalized.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash. The only method that computes change.
    #[serde(alias = "dinheiro")]
    Cash,
    #[serde(alias = "cartao_credito")]
    CreditCard,
    #[serde(alias = "cartao_debito")]
    DebitCard,
    Pix,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Pix => "pix",
        }
    }

    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" | "dinheiro" => Ok(PaymentMethod::Cash),
            "credit_card" | "cartao_credito" => Ok(PaymentMethod::CreditCard),
            "debit_card" | "cartao_debito" => Ok(PaymentMethod::DebitCard),
            "pix" => Ok(PaymentMethod::Pix),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec![
                    "cash".into(),
                    "credit_card".into(),
                    "debit_card".into(),
                    "pix".into(),
                ],
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale.
///
/// ## Invariants
/// - `final_total_cents == max(0, total_cents - discount_cents + tax_cents)`
/// - `amount_received_cents` and `change_cents` are both set or both null
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Sum of the line totals.
    pub total_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub final_total_cents: i64,
    pub payment_method: PaymentMethod,
    pub amount_received_cents: Option<i64>,
    pub change_cents: Option<i64>,
    pub status: SaleStatus,
    /// Cashier who recorded the sale.
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn final_total(&self) -> Money {
        Money::from_cents(self.final_total_cents)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// The unit price is a snapshot taken when the sale was recorded.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Quantity sold (> 0).
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_accepts_legacy_spellings() {
        let method: PaymentMethod = serde_json::from_str("\"dinheiro\"").unwrap();
        assert_eq!(method, PaymentMethod::Cash);
        let method: PaymentMethod = serde_json::from_str("\"cartao_debito\"").unwrap();
        assert_eq!(method, PaymentMethod::DebitCard);

        // Output always uses the canonical name.
        assert_eq!(serde_json::to_string(&PaymentMethod::Cash).unwrap(), "\"cash\"");
        assert_eq!("cartao_credito".parse::<PaymentMethod>().unwrap(), PaymentMethod::CreditCard);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_only_cash_is_cash() {
        assert!(PaymentMethod::Cash.is_cash());
        assert!(!PaymentMethod::Pix.is_cash());
        assert!(!PaymentMethod::CreditCard.is_cash());
    }

    #[test]
    fn test_sale_status_parsing() {
        assert_eq!(SaleStatus::default(), SaleStatus::Completed);
        assert_eq!("cancelled".parse::<SaleStatus>().unwrap(), SaleStatus::Cancelled);
        assert!("voided".parse::<SaleStatus>().is_err());
    }

    #[test]
    fn test_role_roundtrip_names() {
        for role in [Role::Admin, Role::Manager, Role::Cashier] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_user_never_serializes_password_hash() {
        let now = Utc::now();
        let user = User {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@pdv.local".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Cashier,
            active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_stock_adjustment_names() {
        let kind: StockAdjustment = serde_json::from_str("\"subtract\"").unwrap();
        assert_eq!(kind, StockAdjustment::Subtract);
    }
}
