//! # Storage Errors
//!
//! Everything below the sale engine speaks [`DbError`]. SQLite reports
//! constraint failures as plain text, so [`From<sqlx::Error>`] sorts them
//! into variants the API layer can turn into a 400 instead of a 500.
//!
//! ```text
//! sqlx::Error ──► DbError ──┬──► ApiError (repositories, reports)
//!                           └──► SaleError::Persistence ──► ApiError
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the given id, or an UPDATE by id matched nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Email, barcode or category name is already taken.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A `category_id` or `user_id` that points nowhere.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Delete refused because other rows still point at this one.
    #[error("{entity} {id} is still referenced by {dependents}")]
    InUse {
        entity: String,
        id: String,
        dependents: String,
    },

    /// A table CHECK rejected the row (negative stock, inconsistent totals).
    ///
    /// Callers validate before writing, so this is a bug in the caller.
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// The database file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN or COMMIT failed. A writer that waited past `busy_timeout`
    /// for the lock lands here.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// A uniqueness failure with the offending value filled in.
    ///
    /// SQLite only names the column, so repositories remap the generic
    /// [`DbError::UniqueViolation`] through this.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn in_use(
        entity: impl Into<String>,
        id: impl Into<String>,
        dependents: impl Into<String>,
    ) -> Self {
        DbError::InUse {
            entity: entity.into(),
            id: id.into(),
            dependents: dependents.into(),
        }
    }

    /// For `pool.begin()` / `tx.commit()` failures.
    pub fn transaction(err: sqlx::Error) -> Self {
        match DbError::from(err) {
            DbError::QueryFailed(msg) | DbError::Internal(msg) => DbError::TransactionFailed(msg),
            other => other,
        }
    }
}

/// Sorts a SQLite error message into a constraint variant.
///
/// Messages look like `UNIQUE constraint failed: products.barcode`.
fn classify_constraint(message: &str) -> DbError {
    const UNIQUE: &str = "UNIQUE constraint failed";

    if let Some(rest) = message.strip_prefix(UNIQUE) {
        let column = rest.trim_start_matches(':').trim();
        return DbError::UniqueViolation {
            field: if column.is_empty() { "unknown" } else { column }.to_string(),
            value: "unknown".to_string(),
        };
    }
    if message.starts_with("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: message.to_string(),
        };
    }
    if message.starts_with("CHECK constraint failed") {
        return DbError::CheckViolation {
            message: message.to_string(),
        };
    }
    DbError::QueryFailed(message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => classify_constraint(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_message_keeps_the_column() {
        let err = classify_constraint("UNIQUE constraint failed: products.barcode");
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "products.barcode"));
    }

    #[test]
    fn check_and_foreign_key_messages_are_recognised() {
        assert!(matches!(
            classify_constraint("CHECK constraint failed: stock >= 0"),
            DbError::CheckViolation { .. }
        ));
        assert!(matches!(
            classify_constraint("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(
            classify_constraint("database is locked"),
            DbError::QueryFailed(_)
        ));
    }
}
