//! SQLite declared types to [`ColumnType`] conversion.
//!
//! SQLite determines type affinity from declared type names:
//! 1. Contains "INT" -> INTEGER affinity
//! 2. Contains "CHAR", "CLOB", or "TEXT" -> TEXT affinity
//! 3. Contains "BLOB" or no type specified -> BLOB affinity
//! 4. Contains "REAL", "FLOA", or "DOUB" -> REAL affinity
//! 5. Otherwise -> NUMERIC affinity
//!
//! Conventional names with NUMERIC affinity (`BOOLEAN`, `DATE`, `TIMESTAMP`)
//! are recognized so their values can be coerced and decoded.

use crate::models::ColumnType;

/// Maps a SQLite declared type to a [`ColumnType`].
///
/// # Example
/// ```rust
/// use dbsteward_core::adapters::sqlite::map_sqlite_type;
/// use dbsteward_core::models::ColumnType;
///
/// assert_eq!(map_sqlite_type("VARCHAR(255)"), ColumnType::Text);
/// assert_eq!(map_sqlite_type("timestamp"), ColumnType::Timestamp);
/// ```
pub fn map_sqlite_type(sqlite_type: &str) -> ColumnType {
    let type_upper = sqlite_type.trim().to_uppercase();
    let base_type = type_upper
        .split('(')
        .next()
        .unwrap_or_default()
        .trim();

    // Untyped columns have BLOB affinity
    if base_type.is_empty() {
        return ColumnType::Blob;
    }

    if base_type.contains("INT") {
        return ColumnType::Integer;
    }

    if base_type.contains("CHAR") || base_type.contains("CLOB") || base_type.contains("TEXT") {
        return ColumnType::Text;
    }

    if base_type.contains("BLOB") {
        return ColumnType::Blob;
    }

    if base_type.contains("REAL") || base_type.contains("FLOA") || base_type.contains("DOUB") {
        return ColumnType::Real;
    }

    match base_type {
        "BOOLEAN" | "BOOL" => ColumnType::Boolean,
        "DATE" => ColumnType::Date,
        "DATETIME" | "TIMESTAMP" => ColumnType::Timestamp,
        "NUMERIC" | "DECIMAL" | "NUMBER" => ColumnType::Real,
        "STRING" => ColumnType::Text,
        _ => ColumnType::Other(sqlite_type.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_rules() {
        let test_cases = [
            ("INTEGER", ColumnType::Integer),
            ("bigint", ColumnType::Integer),
            ("UNSIGNED BIG INT", ColumnType::Integer),
            ("TEXT", ColumnType::Text),
            ("VARCHAR(100)", ColumnType::Text),
            ("NCHAR(55)", ColumnType::Text),
            ("BLOB", ColumnType::Blob),
            ("", ColumnType::Blob),
            ("REAL", ColumnType::Real),
            ("DOUBLE PRECISION", ColumnType::Real),
            ("FLOAT", ColumnType::Real),
            ("DECIMAL(10,2)", ColumnType::Real),
        ];

        for (declared, expected) in test_cases {
            assert_eq!(map_sqlite_type(declared), expected, "Failed for {}", declared);
        }
    }

    #[test]
    fn test_conventional_names() {
        assert_eq!(map_sqlite_type("BOOLEAN"), ColumnType::Boolean);
        assert_eq!(map_sqlite_type("date"), ColumnType::Date);
        assert_eq!(map_sqlite_type("DATETIME"), ColumnType::Timestamp);
        assert_eq!(map_sqlite_type("TIMESTAMP"), ColumnType::Timestamp);
    }

    #[test]
    fn test_unknown_types_are_preserved() {
        assert_eq!(
            map_sqlite_type("GEOMETRY"),
            ColumnType::Other("GEOMETRY".to_string())
        );
    }
}
