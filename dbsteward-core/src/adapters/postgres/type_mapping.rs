//! PostgreSQL to [`ColumnType`] conversion.
//!
//! Works on the `data_type` and `udt_name` columns of
//! `information_schema.columns`.

use crate::models::ColumnType;

/// Maps a PostgreSQL `data_type` to a [`ColumnType`].
///
/// `numeric` columns map to [`ColumnType::Real`]: values are bound as
/// `f64` and cast by the server on assignment.
///
/// # Example
/// ```rust
/// use dbsteward_core::adapters::postgres::map_postgresql_type;
/// use dbsteward_core::models::ColumnType;
///
/// assert_eq!(map_postgresql_type("character varying", "varchar"), ColumnType::Text);
/// assert_eq!(
///     map_postgresql_type("timestamp without time zone", "timestamp"),
///     ColumnType::Timestamp
/// );
/// ```
pub fn map_postgresql_type(data_type: &str, udt_name: &str) -> ColumnType {
    match data_type.to_lowercase().as_str() {
        "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" => ColumnType::Integer,
        "real" | "float4" | "double precision" | "float8" | "numeric" | "decimal" => ColumnType::Real,
        "boolean" | "bool" => ColumnType::Boolean,
        "character varying" | "varchar" | "character" | "char" | "text" | "bpchar" | "name" => {
            ColumnType::Text
        }
        "date" => ColumnType::Date,
        "timestamp without time zone" | "timestamp with time zone" | "timestamp" | "timestamptz" => {
            ColumnType::Timestamp
        }
        "bytea" => ColumnType::Blob,
        // Enums, domains and arrays are reported under their underlying type name
        "user-defined" | "array" => ColumnType::Other(udt_name.to_string()),
        other => ColumnType::Other(other.to_string()),
    }
}
