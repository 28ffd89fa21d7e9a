//! # Repository Module
//!
//! Database repository implementations for the back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().get_by_barcode("7894900011517")                 │
//! │       ▼                                                                 │
//! │  ProductRepository / CategoryRepository / UserRepository               │
//! │  SaleRepository (read side) / ReportRepository                         │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories hold a pool clone and run one statement (or one short
//! transaction) per call. Writes that must share a transaction with other
//! writes (the sale engine) use the `pub(crate)` functions that take a
//! `&mut SqliteConnection` instead.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD, barcode lookup, stock adjust
//! - [`category::CategoryRepository`] - Category list/create
//! - [`user::UserRepository`] - Users and credentials
//! - [`sale::SaleRepository`] - Sale listing and detail
//! - [`report::ReportRepository`] - Dashboard and sales aggregates

pub mod category;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;

use chrono::{DateTime, Days, NaiveDate, Utc};

use pdv_core::ValidationError;

/// Inclusive range of whole days, both ends optional.
///
/// ```text
/// start = 2026-10-01, end = 2026-10-15
///   → created_at >= 2026-10-01T00:00:00Z AND created_at < 2026-10-16T00:00:00Z
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Parses `YYYY-MM-DD` query parameters.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        Ok(DateRange {
            start: start.map(|s| parse_day("start_date", s)).transpose()?,
            end: end.map(|s| parse_day("end_date", s)).transpose()?,
        })
    }

    /// Lower bound (inclusive) as a UTC timestamp.
    pub fn from(&self) -> Option<DateTime<Utc>> {
        self.start.map(start_of_day)
    }

    /// Upper bound (exclusive): midnight after the end day.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.end
            .map(|day| day.checked_add_days(Days::new(1)).unwrap_or(day))
            .map(start_of_day)
    }
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        }
    })
}

pub(crate) fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}
