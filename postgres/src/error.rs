//! Mapping of `sqlx` failures onto catalog and reservation errors.

use train_station_core::{CatalogError, ReservationError};

/// `lock_not_available`: `lock_timeout` expired.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `deadlock_detected`
const DEADLOCK_DETECTED: &str = "40P01";
/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";
/// `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// `check_violation`
const CHECK_VIOLATION: &str = "23514";

fn code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Whether the failure is lock contention the caller may retry.
pub(crate) fn is_contention(err: &sqlx::Error) -> bool {
    matches!(
        code(err).as_deref(),
        Some(LOCK_NOT_AVAILABLE | DEADLOCK_DETECTED | SERIALIZATION_FAILURE)
    ) || matches!(err, sqlx::Error::PoolTimedOut)
}

/// Map a failure during an order operation.
pub(crate) fn reservation_error(context: &str, err: sqlx::Error) -> ReservationError {
    if is_contention(&err) {
        tracing::warn!(error = %err, "{context}: contention");
        return ReservationError::Busy(format!("{context}: {err}"));
    }
    ReservationError::Storage(format!("{context}: {err}"))
}

/// Map a failure during a catalog operation.
pub(crate) fn catalog_error(context: &str, err: sqlx::Error) -> CatalogError {
    if is_contention(&err) {
        return CatalogError::Busy(format!("{context}: {err}"));
    }
    match code(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => CatalogError::Validation(format!("{context}: already exists")),
        Some(CHECK_VIOLATION | FOREIGN_KEY_VIOLATION) => {
            CatalogError::Validation(format!("{context}: {err}"))
        }
        _ => CatalogError::Storage(format!("{context}: {err}")),
    }
}

/// Whether the failure is a foreign key violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    code(err).as_deref() == Some(FOREIGN_KEY_VIOLATION)
}

/// Convert a stored integer column back to its domain type.
pub(crate) fn column_u32(column: &'static str, value: i32) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("column {column} holds negative value {value}"))
}

/// Convert a domain integer to its column type.
pub(crate) fn to_column(field: &'static str, value: u32) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("{field} {value} exceeds {}", i32::MAX))
}
