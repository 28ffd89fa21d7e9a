//! # Sale Builder
//!
//! Turns a cart into priced lines and totals. Pure: it reads a catalog
//! snapshot and returns a [`BuiltSale`] or the first rule it broke.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRequest                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Input validation          cart size, quantities, amounts ≥ 0        │
//! │       │                        → ValidationError                        │
//! │       ▼                                                                 │
//! │  2. Per line, in cart order    exists?   → ProductNotFound              │
//! │                                active?   → ProductInactive              │
//! │                                stock ≥ q → InsufficientStock            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. total      = Σ price × quantity                                     │
//! │  4. discount   = total × pct   (pct wins)  | absolute | 0               │
//! │  5. final      = max(0, total − discount + tax)                         │
//! │  6. cash only  received < final → InsufficientPayment                   │
//! │                change = received − final                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BuiltSale                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sale engine in `pdv-db` runs this same function inside its
//! transaction, over a snapshot read from locked rows, so the rules here are
//! the only place sale math lives.
//!
//! ## Example
//! ```rust
//! use std::collections::HashMap;
//! use pdv_core::money::Money;
//! use pdv_core::sale_builder::{build_sale, ProductSnapshot, SaleLine, SaleRequest};
//! use pdv_core::types::PaymentMethod;
//!
//! let mut catalog = HashMap::new();
//! catalog.insert(
//!     "p-1".to_string(),
//!     ProductSnapshot { price: Money::from_cents(350), active: true, stock: 10 },
//! );
//!
//! let request = SaleRequest {
//!     items: vec![SaleLine { product_id: "p-1".into(), quantity: 2 }],
//!     payment_method: PaymentMethod::Cash,
//!     discount_percentage: None,
//!     discount: None,
//!     tax: None,
//!     amount_received: Some(Money::from_cents(1000)),
//! };
//!
//! let sale = build_sale(&request, &catalog).unwrap();
//! assert_eq!(sale.total.cents(), 700);
//! assert_eq!(sale.change, Some(Money::from_cents(300)));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{self, Money, Percentage};
use crate::types::PaymentMethod;
use crate::validation::{
    validate_cart_size, validate_discount_percentage, validate_non_negative, validate_quantity,
};

// =============================================================================
// Input
// =============================================================================

/// One cart line as submitted by the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
}

/// A request to record a sale.
///
/// Field names and decimal amounts match the JSON body of
/// `POST /api/v1/sales`, so the API deserializes straight into this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    pub items: Vec<SaleLine>,

    pub payment_method: PaymentMethod,

    /// Percentage discount (10.0 = 10%). Takes precedence over `discount`.
    #[serde(default)]
    pub discount_percentage: Option<f64>,

    /// Absolute discount, used only when no percentage is given.
    #[serde(default, with = "money::decimal::option")]
    pub discount: Option<Money>,

    #[serde(default, with = "money::decimal::option")]
    pub tax: Option<Money>,

    /// Cash handed over by the customer. Ignored for non-cash methods.
    #[serde(default, with = "money::decimal::option")]
    pub amount_received: Option<Money>,
}

// =============================================================================
// Catalog Seam
// =============================================================================

/// The fields of a product the builder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub price: Money,
    pub active: bool,
    pub stock: i64,
}

/// Read access to product snapshots.
///
/// Implemented for a plain `HashMap` so callers can snapshot the rows they
/// locked and hand them over.
pub trait Catalog {
    fn lookup(&self, product_id: &str) -> Option<ProductSnapshot>;
}

impl Catalog for HashMap<String, ProductSnapshot> {
    fn lookup(&self, product_id: &str) -> Option<ProductSnapshot> {
        self.get(product_id).copied()
    }
}

// =============================================================================
// Output
// =============================================================================

/// A priced line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltLine {
    pub product_id: String,
    pub quantity: i64,
    /// Price snapshot at the time of sale.
    pub unit_price: Money,
    /// `unit_price × quantity`.
    pub total: Money,
}

/// A fully priced sale, ready to persist.
///
/// ## Invariants
/// - `total == Σ lines.total`
/// - `final_total == max(0, total − discount + tax)`
/// - `amount_received` and `change` are both `Some` (cash) or both `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltSale {
    pub lines: Vec<BuiltLine>,
    pub payment_method: PaymentMethod,
    pub total: Money,
    pub discount: Money,
    pub tax: Money,
    pub final_total: Money,
    pub amount_received: Option<Money>,
    pub change: Option<Money>,
}

impl BuiltSale {
    /// Quantity requested per product, summed across repeated lines.
    pub fn quantities(&self) -> HashMap<&str, i64> {
        let mut totals: HashMap<&str, i64> = HashMap::new();
        for line in &self.lines {
            *totals.entry(line.product_id.as_str()).or_default() += line.quantity;
        }
        totals
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Validates `request` against `catalog` and computes the sale.
///
/// ## Returns
/// * `Ok(BuiltSale)` - every rule passed
/// * `Err(CoreError)` - the first violation, in pipeline order
pub fn build_sale(request: &SaleRequest, catalog: &impl Catalog) -> CoreResult<BuiltSale> {
    validate_request(request)?;

    // Repeated lines for one product draw on the same shelf.
    let mut requested: HashMap<&str, i64> = HashMap::new();
    let mut lines = Vec::with_capacity(request.items.len());
    let mut total = Money::zero();

    for item in &request.items {
        let product = catalog
            .lookup(&item.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        if !product.active {
            return Err(CoreError::ProductInactive(item.product_id.clone()));
        }

        let wanted = requested.entry(item.product_id.as_str()).or_default();
        *wanted += item.quantity;
        if product.stock < *wanted {
            return Err(CoreError::InsufficientStock {
                product_id: item.product_id.clone(),
                available: product.stock,
                requested: *wanted,
            });
        }

        let line_total = product
            .price
            .checked_mul_quantity(item.quantity)
            .ok_or_else(|| overflow("total"))?;
        total = total.checked_add(line_total).ok_or_else(|| overflow("total"))?;
        lines.push(BuiltLine {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price: product.price,
            total: line_total,
        });
    }

    let discount = match (request.discount_percentage, request.discount) {
        (Some(pct), _) => total.percentage(Percentage::from_percentage(pct)),
        (None, Some(amount)) => amount,
        (None, None) => Money::zero(),
    };
    let tax = request.tax.unwrap_or_default();
    let final_total = total
        .checked_sub(discount)
        .and_then(|net| net.checked_add(tax))
        .ok_or_else(|| overflow("final_total"))?
        .floor_zero();

    let (amount_received, change) = match request.amount_received {
        Some(received) if request.payment_method.is_cash() => {
            if received < final_total {
                return Err(CoreError::InsufficientPayment {
                    received,
                    due: final_total,
                });
            }
            (Some(received), Some(received - final_total))
        }
        _ => (None, None),
    };

    Ok(BuiltSale {
        lines,
        payment_method: request.payment_method,
        total,
        discount,
        tax,
        final_total,
        amount_received,
        change,
    })
}

/// A sum that does not fit in i64 cents. Unreachable for requests that
/// pass [`validate_request`] against prices that passed `validate_price`.
fn overflow(field: &str) -> CoreError {
    ValidationError::TooLarge {
        field: field.to_string(),
        max: Money::from_cents(i64::MAX),
    }
    .into()
}

/// Step 1: everything that can be checked without the catalog.
///
/// Public so a caller can reject a malformed cart before it opens a
/// transaction; [`build_sale`] runs it again either way.
pub fn validate_request(request: &SaleRequest) -> CoreResult<()> {
    validate_cart_size(request.items.len())?;
    for item in &request.items {
        validate_quantity(item.quantity)?;
    }

    if let Some(pct) = request.discount_percentage {
        validate_discount_percentage(pct)?;
    }
    if let Some(discount) = request.discount {
        validate_non_negative("discount", discount)?;
    }
    if let Some(tax) = request.tax {
        validate_non_negative("tax", tax)?;
    }
    if let Some(received) = request.amount_received {
        validate_non_negative("amount_received", received)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::MAX_AMOUNT_CENTS;

    fn catalog() -> HashMap<String, ProductSnapshot> {
        let mut catalog = HashMap::new();
        catalog.insert(
            "water".to_string(),
            ProductSnapshot {
                price: Money::from_cents(350),
                active: true,
                stock: 10,
            },
        );
        catalog.insert(
            "bread".to_string(),
            ProductSnapshot {
                price: Money::from_cents(125),
                active: true,
                stock: 3,
            },
        );
        catalog.insert(
            "retired".to_string(),
            ProductSnapshot {
                price: Money::from_cents(999),
                active: false,
                stock: 50,
            },
        );
        catalog
    }

    fn request(items: &[(&str, i64)], method: PaymentMethod) -> SaleRequest {
        SaleRequest {
            items: items
                .iter()
                .map(|(id, qty)| SaleLine {
                    product_id: id.to_string(),
                    quantity: *qty,
                })
                .collect(),
            payment_method: method,
            discount_percentage: None,
            discount: None,
            tax: None,
            amount_received: None,
        }
    }

    #[test]
    fn test_cash_sale_computes_change() {
        let mut req = request(&[("water", 2)], PaymentMethod::Cash);
        req.amount_received = Some(Money::from_cents(1000));

        let sale = build_sale(&req, &catalog()).unwrap();

        assert_eq!(sale.total.cents(), 700);
        assert_eq!(sale.discount, Money::zero());
        assert_eq!(sale.tax, Money::zero());
        assert_eq!(sale.final_total.cents(), 700);
        assert_eq!(sale.amount_received, Some(Money::from_cents(1000)));
        assert_eq!(sale.change, Some(Money::from_cents(300)));
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(sale.lines[0].unit_price.cents(), 350);
        assert_eq!(sale.lines[0].total.cents(), 700);
    }

    #[test]
    fn test_percentage_discount() {
        let mut req = request(&[("water", 2)], PaymentMethod::Cash);
        req.amount_received = Some(Money::from_cents(1000));
        req.discount_percentage = Some(10.0);

        let sale = build_sale(&req, &catalog()).unwrap();

        assert_eq!(sale.discount.cents(), 70);
        assert_eq!(sale.final_total.cents(), 630);
        assert_eq!(sale.change, Some(Money::from_cents(370)));
    }

    #[test]
    fn test_percentage_takes_precedence_over_absolute_discount() {
        let mut req = request(&[("water", 2)], PaymentMethod::Pix);
        req.discount_percentage = Some(10.0);
        req.discount = Some(Money::from_cents(500));

        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.discount.cents(), 70);

        // A supplied zero percentage still wins.
        req.discount_percentage = Some(0.0);
        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.discount, Money::zero());

        req.discount_percentage = None;
        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.discount.cents(), 500);
    }

    #[test]
    fn test_tax_and_floor_at_zero() {
        let mut req = request(&[("bread", 1)], PaymentMethod::DebitCard);
        req.tax = Some(Money::from_cents(10));
        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.final_total.cents(), 135);

        req.tax = None;
        req.discount = Some(Money::from_cents(1000));
        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.total.cents(), 125);
        assert_eq!(sale.final_total, Money::zero());
    }

    #[test]
    fn test_non_cash_ignores_amount_received() {
        let mut req = request(&[("water", 2)], PaymentMethod::CreditCard);
        req.amount_received = Some(Money::from_cents(100));

        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.amount_received, None);
        assert_eq!(sale.change, None);
    }

    #[test]
    fn test_cash_without_amount_received_has_no_change() {
        let req = request(&[("water", 1)], PaymentMethod::Cash);
        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.amount_received, None);
        assert_eq!(sale.change, None);
    }

    #[test]
    fn test_insufficient_payment() {
        let mut req = request(&[("water", 2)], PaymentMethod::Cash);
        req.amount_received = Some(Money::from_cents(699));

        let err = build_sale(&req, &catalog()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientPayment);

        // Exact amount is fine and gives zero change.
        req.amount_received = Some(Money::from_cents(700));
        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.change, Some(Money::zero()));
    }

    #[test]
    fn test_catalog_rejections() {
        let err = build_sale(&request(&[("ghost", 1)], PaymentMethod::Cash), &catalog())
            .unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(ref id) if id == "ghost"));

        let err = build_sale(&request(&[("retired", 1)], PaymentMethod::Cash), &catalog())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductInactive);

        let err = build_sale(&request(&[("bread", 4)], PaymentMethod::Cash), &catalog())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_repeated_lines_share_stock() {
        let err = build_sale(
            &request(&[("bread", 2), ("bread", 2)], PaymentMethod::Cash),
            &catalog(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                requested: 4,
                ..
            }
        ));

        let sale = build_sale(
            &request(&[("bread", 1), ("water", 1), ("bread", 2)], PaymentMethod::Cash),
            &catalog(),
        )
        .unwrap();
        assert_eq!(sale.quantities()["bread"], 3);
        assert_eq!(sale.total.cents(), 3 * 125 + 350);
    }

    #[test]
    fn test_first_violation_wins() {
        // Validation runs before catalog lookups.
        let err = build_sale(
            &request(&[("ghost", 1), ("water", 0)], PaymentMethod::Cash),
            &catalog(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));

        // Catalog checks run in cart order.
        let err = build_sale(
            &request(&[("retired", 1), ("ghost", 1)], PaymentMethod::Cash),
            &catalog(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductInactive);
    }

    #[test]
    fn test_input_validation() {
        let err = build_sale(&request(&[], PaymentMethod::Cash), &catalog()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let mut req = request(&[("water", 1)], PaymentMethod::Cash);
        req.discount_percentage = Some(150.0);
        assert_eq!(build_sale(&req, &catalog()).unwrap_err().kind(), ErrorKind::ValidationError);

        let mut req = request(&[("water", 1)], PaymentMethod::Cash);
        req.tax = Some(Money::from_cents(-1));
        assert_eq!(build_sale(&req, &catalog()).unwrap_err().kind(), ErrorKind::ValidationError);
    }

    fn assert_too_large(err: CoreError, expected_field: &str) {
        assert!(
            matches!(
                err,
                CoreError::Validation(ValidationError::TooLarge { ref field, .. })
                    if field == expected_field
            ),
            "unexpected error for {expected_field}: {err:?}"
        );
    }

    #[test]
    fn test_huge_tax_is_rejected_before_any_arithmetic() {
        let mut req = request(&[("water", 2)], PaymentMethod::Pix);
        req.tax = Some(Money::from_cents(i64::MAX));
        assert_too_large(build_sale(&req, &catalog()).unwrap_err(), "tax");

        req.tax = Some(Money::from_cents(MAX_AMOUNT_CENTS));
        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.final_total.cents(), 700 + MAX_AMOUNT_CENTS);
    }

    #[test]
    fn test_huge_tax_in_json_never_reaches_the_builder() {
        // 92233720368547758.00 is exactly 2^63 cents once rounded.
        let json = r#"{
            "items": [{"product_id": "water", "quantity": 2}],
            "payment_method": "pix",
            "tax": 92233720368547758
        }"#;
        assert!(serde_json::from_str::<SaleRequest>(json).is_err());

        let json = r#"{
            "items": [{"product_id": "water", "quantity": 2}],
            "payment_method": "pix",
            "tax": 92233720368547
        }"#;
        let req: SaleRequest = serde_json::from_str(json).unwrap();
        assert_too_large(build_sale(&req, &catalog()).unwrap_err(), "tax");
    }

    #[test]
    fn test_huge_amount_received_and_discount_are_rejected() {
        let mut req = request(&[("water", 2)], PaymentMethod::Cash);
        req.amount_received = Some(Money::from_cents(i64::MAX));
        assert_too_large(build_sale(&req, &catalog()).unwrap_err(), "amount_received");

        let mut req = request(&[("water", 2)], PaymentMethod::Cash);
        req.discount = Some(Money::from_cents(MAX_AMOUNT_CENTS + 1));
        assert_too_large(build_sale(&req, &catalog()).unwrap_err(), "discount");
    }

    #[test]
    fn test_huge_price_times_quantity_reports_overflow() {
        let mut catalog = catalog();
        catalog.insert(
            "gold".to_string(),
            ProductSnapshot {
                price: Money::from_cents(i64::MAX / 2),
                active: true,
                stock: 1_000,
            },
        );

        let err = build_sale(&request(&[("gold", 999)], PaymentMethod::Pix), &catalog)
            .unwrap_err();
        assert_too_large(err, "total");

        // Two lines that each fit but overflow when summed.
        let err = build_sale(
            &request(&[("gold", 1), ("gold", 1), ("gold", 1)], PaymentMethod::Pix),
            &catalog,
        )
        .unwrap_err();
        assert_too_large(err, "total");
    }

    #[test]
    fn test_request_deserializes_from_api_json() {
        let json = r#"{
            "items": [{"product_id": "water", "quantity": 2}],
            "payment_method": "dinheiro",
            "discount_percentage": 10,
            "amount_received": 10.00
        }"#;
        let req: SaleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Cash);
        assert_eq!(req.amount_received, Some(Money::from_cents(1000)));
        assert_eq!(req.discount, None);

        let sale = build_sale(&req, &catalog()).unwrap();
        assert_eq!(sale.final_total.cents(), 630);
        assert_eq!(sale.change.unwrap().cents(), 370);
    }
}
