//! Helper utilities for database adapter implementations.
//!
//! Provides the driver error classification shared by the SQLite and
//! PostgreSQL adapters so both report failures with the same error kinds.

use crate::Result;
use crate::error::AdminError;

/// Extension trait for extracting typed values from PostgreSQL rows
/// with consistent error handling.
///
/// # Example
/// ```rust,ignore
/// use dbsteward_core::adapters::helpers::RowExt;
///
/// let name: String = row.get_field("column_name", Some("orders"))?;
/// ```
#[cfg(feature = "postgresql")]
pub trait RowExt {
    /// Extracts a typed field from the row with proper error context.
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;
}

#[cfg(feature = "postgresql")]
impl RowExt for sqlx::postgres::PgRow {
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        use sqlx::Row;

        self.try_get(field_name).map_err(|e| {
            let context = match table_context {
                Some(table) => format!("Failed to parse field '{}' for '{}'", field_name, table),
                None => format!("Failed to parse field '{}'", field_name),
            };
            AdminError::query_failed(context, e)
        })
    }
}

/// Converts a driver error into the matching [`AdminError`] kind.
///
/// - constraint failures reported as foreign-key violations become
///   `ForeignKeyViolation` on `table`
/// - pool, I/O and TLS failures become `Connection`
/// - everything else becomes `Query` with `context`
pub fn classify_sqlx_error(table: &str, context: impl Into<String>, error: sqlx::Error) -> AdminError {
    let context = context.into();

    if let sqlx::Error::Database(db_err) = &error
        && db_err.is_foreign_key_violation()
    {
        return AdminError::foreign_key_violation(table, context, error);
    }

    if is_connection_error(&error) {
        return AdminError::connection_failed(error);
    }

    AdminError::query_failed(context, error)
}

/// Whether the error means the database itself is unreachable.
pub fn is_connection_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

/// Maps errors raised while opening or pinging the database.
pub fn connection_error(error: sqlx::Error) -> AdminError {
    if let sqlx::Error::Configuration(_) = error {
        return AdminError::configuration(format!("Invalid connection settings: {}", error));
    }
    AdminError::connection_failed(error)
}
