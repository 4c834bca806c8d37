//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors. [`DbError`] converts into the core
//! [`StoreError`] so the attendance ledger can tell a duplicate join or
//! a missing event apart from any other failure.

use gather_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An update matched no row.
    #[error("not found: {0}")]
    NotFound(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Postgres(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Self::Duplicate
            }
            DbError::Postgres(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Self::NotFound(db.message().to_owned())
            }
            DbError::Postgres(sqlx::Error::RowNotFound) => Self::NotFound(String::from("row")),
            DbError::NotFound(what) => Self::NotFound(what),
            other => Self::Backend(other.to_string()),
        }
    }
}
