//! # Field Rules
//!
//! Checks that run on request data before anything touches the database.
//! Malformed JSON never gets this far (the axum extractor rejects it), and
//! the schema's CHECK and UNIQUE constraints back these up afterwards.
//!
//! Text lengths are counted in characters, so "Pão" is three long.
//!
//! ```rust
//! use pdv_core::validation::{validate_email, validate_quantity};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_email("ana@pdv.local").is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

pub type ValidationResult<T> = Result<T, ValidationError>;

const MIN_PASSWORD_CHARS: usize = 6;
const MAX_SEARCH_CHARS: usize = 100;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

// =============================================================================
// Text
// =============================================================================

/// Trimmed, non-empty and within `min..=max` characters.
fn text_in_range(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    match value.trim().chars().count() {
        0 => Err(required(field)),
        n if n < min => Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        }),
        n if n > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// 2 to 200 characters.
///
/// ```rust
/// use pdv_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Refrigerante 2L").is_ok());
/// assert!(validate_product_name("A").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    text_in_range("name", name, 2, 200)
}

pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    text_in_range("name", name, 2, 100)
}

pub fn validate_user_name(name: &str) -> ValidationResult<()> {
    text_in_range("name", name, 2, 100)
}

/// Shape check only: `local@domain.tld` with no spaces.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(required("email"));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        })
    }
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(required("password"));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_CHARS,
        });
    }
    Ok(())
}

/// Returns the trimmed term. Empty is allowed and means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    if query.chars().count() > MAX_SEARCH_CHARS {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_CHARS,
        });
    }
    Ok(query.to_string())
}

// =============================================================================
// Numbers
// =============================================================================

/// A sale line quantity: `1..=MAX_ITEM_QUANTITY`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Stock counts typed in by staff (initial stock, adjustments).
pub fn validate_stock_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn within_amount_ceiling(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: Money::from_cents(MAX_AMOUNT_CENTS),
        });
    }
    Ok(())
}

/// Selling price: above zero and at most `MAX_AMOUNT_CENTS`.
///
/// ```rust
/// use pdv_core::money::Money;
/// use pdv_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.cents() <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }
    within_amount_ceiling("price", price)
}

/// Discount, tax, cost price, amount received: `0..=MAX_AMOUNT_CENTS`.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    within_amount_ceiling(field, amount)
}

/// `0.0..=100.0`; NaN and infinities are rejected.
pub fn validate_discount_percentage(pct: f64) -> ValidationResult<()> {
    if pct.is_finite() && (0.0..=100.0).contains(&pct) {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        field: "discount_percentage".to_string(),
        min: 0,
        max: 100,
    })
}

/// A sale has between one and `MAX_CART_ITEMS` lines.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(required("items"));
    }
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }
    Ok(())
}
