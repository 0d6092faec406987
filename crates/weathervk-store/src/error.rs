//! Store error types.

use thiserror::Error;
use weathervk_core::{AppError, DatabaseError, RusqliteErrorExt};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A city with this name is already saved.
    #[error("City already exists: {0}")]
    Conflict(String),

    /// No saved city with this name.
    #[error("City not found: {0}")]
    NotFound(String),

    /// The record cannot be stored as given (e.g. no place name).
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// Underlying SQLite failure.
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn not_found(city: impl Into<String>) -> Self {
        Self::NotFound(city.into())
    }

    /// True for a UNIQUE/foreign-key violation reported by SQLite
    pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(s) => AppError::Database(DatabaseError::Conflict(s)),
            StoreError::NotFound(s) => AppError::Database(DatabaseError::NotFound(s)),
            StoreError::Invalid(s) => AppError::Database(DatabaseError::QueryFailed(s)),
            StoreError::Sqlite(e) => AppError::Database(e.into_database_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn conflict_maps_to_duplicate_city_message() {
        let e: AppError = StoreError::Conflict("Moscow".into()).into();
        assert!(matches!(e, AppError::Database(DatabaseError::Conflict(_))));
        assert_eq!(e.user_message(), "This city is already in your list.");
    }

    #[test]
    fn invalid_record_is_a_failed_write() {
        let e: AppError = StoreError::Invalid("empty city name".into()).into();
        assert!(matches!(e, AppError::Database(DatabaseError::QueryFailed(_))));
    }

    #[test]
    fn missing_row_reads_as_unknown_city() {
        let e: AppError = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows).into();
        assert!(matches!(e, AppError::Database(DatabaseError::NotFound(_))));
    }
}
