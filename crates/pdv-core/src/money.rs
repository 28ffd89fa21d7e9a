//! # Money Module
//!
//! Provides the `Money` type for monetary values and `Percentage` for
//! discount rates.
//!
//! ## Integer Cents Internally, Decimals at the Edge
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  JSON request           pdv-core / pdv-db            JSON response      │
//! │                                                                         │
//! │  "amount_received":     Money(1000)                  "change": 3.0      │
//! │     10.00      ──────►  Money(700) total   ──────►   "total": 7.0       │
//! │                         Money(300) change                               │
//! │                                                                         │
//! │  Decimals are rounded to the nearest cent exactly once, on the way in. │
//! │  Every sum, discount and comparison after that is integer math.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pdv_core::money::Money;
//!
//! let price = Money::from_cents(350);          // 3.50
//! let line = price.multiply_quantity(2);       // 7.00
//! assert_eq!(line, Money::from_decimal(7.0).unwrap());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results such as `total - discount` may
///   dip below zero before being clamped
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - Serializes as raw cents; use [`decimal`] on API fields that must read
///   as `7.00`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount into cents, rounding to the nearest cent.
    ///
    /// Returns `None` for NaN, infinities and amounts that don't fit in i64
    /// cents. `i64::MAX as f64` rounds up to 2^63, so that value is out too.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(3.5).unwrap().cents(), 350);
    /// assert_eq!(Money::from_decimal(0.1 + 0.2).unwrap().cents(), 30);
    /// assert!(Money::from_decimal(f64::NAN).is_none());
    /// ```
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents >= i64::MAX as f64 || cents < i64::MIN as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns the value as a decimal number (for serialization only).
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-150).floor_zero(), Money::zero());
    /// assert_eq!(Money::from_cents(150).floor_zero().cents(), 150);
    /// ```
    #[inline]
    pub const fn floor_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `self + other`, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self - other`, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// [`Money::multiply_quantity`] that reports overflow instead of panicking.
    ///
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(350).checked_mul_quantity(2), Some(Money::from_cents(700)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_mul_quantity(999), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `rate` of this amount, rounded half-up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 provides the
    /// rounding (5000/10000 = 0.5). i128 prevents overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::money::{Money, Percentage};
    ///
    /// let total = Money::from_cents(700);
    /// let discount = total.percentage(Percentage::from_bps(1000)); // 10%
    /// assert_eq!(discount.cents(), 70);
    /// ```
    pub fn percentage(&self, rate: Percentage) -> Money {
        let amount = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(amount as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the plain decimal amount (`7.00`, `-5.50`).
///
/// ## Note
/// This is for logs and messages. Currency symbols and locale formatting
/// belong to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 10% = 1000 bps and 12.5% = 1250 bps.
/// Keeps discount math in integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Largest meaningful rate (100%).
    pub const FULL: Percentage = Percentage(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a rate from a percentage such as `10.0`.
    ///
    /// Callers validate the range first; see
    /// [`validate_discount_percentage`](crate::validation::validate_discount_percentage).
    pub fn from_percentage(pct: f64) -> Self {
        Percentage((pct * 100.0).round().clamp(0.0, u32::MAX as f64) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Decimal Serde Helpers
// =============================================================================

/// `#[serde(with = "decimal")]` for `Money` fields exposed as decimal numbers.
///
/// ```rust
/// use pdv_core::money::{self, Money};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Totals {
///     #[serde(with = "money::decimal")]
///     total: Money,
/// }
///
/// let json = serde_json::to_string(&Totals { total: Money::from_cents(700) }).unwrap();
/// assert_eq!(json, r#"{"total":7.0}"#);
/// ```
pub mod decimal {
    use super::Money;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.to_decimal())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::from_decimal(amount)
            .ok_or_else(|| D::Error::custom(format!("invalid monetary amount: {}", amount)))
    }

    /// Same as the parent module, for `Option<Money>` fields.
    ///
    /// Pair with `#[serde(default)]` so absent fields read as `None`.
    pub mod option {
        use super::Money;
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Money>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(money) => serializer.serialize_some(&money.to_decimal()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Money>, D::Error> {
            match Option::<f64>::deserialize(deserializer)? {
                Some(amount) => Money::from_decimal(amount).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("invalid monetary amount: {}", amount))
                }),
                None => Ok(None),
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
