//! Dynamic SQL statement construction.
//!
//! Statements are assembled from introspected metadata only. Identifiers go
//! through [`quote_identifier`]; data values are never formatted into the
//! statement text and travel as bound [`Param`]s instead.

use crate::Result;
use crate::error::AdminError;
use crate::models::{ColumnInfo, ColumnType, DatabaseType, TableSchema, Value};

/// Placeholder syntax of the target engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `?` placeholders
    Sqlite,
    /// `$1`, `$2`, ... placeholders
    Postgres,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${}", index),
        }
    }
}

impl From<DatabaseType> for Dialect {
    fn from(database_type: DatabaseType) -> Self {
        match database_type {
            DatabaseType::SQLite => Dialect::Sqlite,
            DatabaseType::PostgreSQL => Dialect::Postgres,
        }
    }
}

/// Quotes an identifier for use in statement text.
///
/// Both supported engines follow the SQL standard: the identifier is wrapped
/// in double quotes and embedded double quotes are doubled.
///
/// # Errors
/// Rejects empty identifiers and identifiers containing NUL characters,
/// which no engine accepts.
///
/// # Example
/// ```rust
/// use dbsteward_core::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("orders").unwrap(), "\"orders\"");
/// assert_eq!(quote_identifier("we\"ird").unwrap(), "\"we\"\"ird\"");
/// ```
pub fn quote_identifier(identifier: &str) -> Result<String> {
    if identifier.is_empty() {
        return Err(AdminError::schema("identifier cannot be empty"));
    }
    if identifier.contains('\0') {
        return Err(AdminError::schema("identifier cannot contain NUL characters"));
    }
    Ok(format!("\"{}\"", identifier.replace('"', "\"\"")))
}

/// A bound parameter with the type of the column it targets.
///
/// The hint lets strictly typed engines bind `NULL` with the right type.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Bound value
    pub value: Value,
    /// Column type the value is bound as
    pub type_hint: ColumnType,
}

impl Param {
    /// Binds `value` as `type_hint`.
    pub fn new(value: Value, type_hint: ColumnType) -> Self {
        Self { value, type_hint }
    }

    /// Parameter bound against a known column.
    pub fn for_column(value: Value, column: &ColumnInfo) -> Self {
        Self::new(value, column.data_type.clone())
    }
}

/// Statement text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text with dialect placeholders
    pub sql: String,
    /// Values for the placeholders, in order
    pub params: Vec<Param>,
}

/// Builds CRUD statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    dialect: Dialect,
}

impl StatementBuilder {
    /// Builder for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Placeholder dialect in use.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `SELECT` of every column, in ordinal order, sorted by the primary key.
    pub fn select_all(&self, table: &TableSchema) -> Result<Statement> {
        let columns = table
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(AdminError::schema(format!(
                "table '{}' has no columns",
                table.name
            )));
        }
        let pk = table.primary_key_column()?;

        Ok(Statement {
            sql: format!(
                "SELECT {} FROM {} ORDER BY {}",
                columns.join(", "),
                quote_identifier(&table.name)?,
                quote_identifier(&pk.name)?
            ),
            params: Vec::new(),
        })
    }

    /// `INSERT` naming each of `columns` explicitly, returning `returning`.
    ///
    /// `values` must already be coerced and aligned with `columns`.
    pub fn insert(
        &self,
        table: &str,
        columns: &[&ColumnInfo],
        values: Vec<Value>,
        returning: &str,
    ) -> Result<Statement> {
        if columns.len() != values.len() {
            return Err(AdminError::validation(format!(
                "expected {} values for '{}', got {}",
                columns.len(),
                table,
                values.len()
            )));
        }

        let table_ident = quote_identifier(table)?;
        let returning_ident = quote_identifier(returning)?;

        if columns.is_empty() {
            return Ok(Statement {
                sql: format!(
                    "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                    table_ident, returning_ident
                ),
                params: Vec::new(),
            });
        }

        let names = columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Result<Vec<_>>>()?;
        let placeholders: Vec<String> = (1..=columns.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();
        let params = columns
            .iter()
            .zip(values)
            .map(|(column, value)| Param::for_column(value, column))
            .collect();

        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                table_ident,
                names.join(", "),
                placeholders.join(", "),
                returning_ident
            ),
            params,
        })
    }

    /// `UPDATE` of one column of the row matched by primary-key equality.
    pub fn update(
        &self,
        table: &str,
        column: &ColumnInfo,
        new_value: Value,
        key_column: &ColumnInfo,
        key: Value,
    ) -> Result<Statement> {
        Ok(Statement {
            sql: format!(
                "UPDATE {} SET {} = {} WHERE {} = {}",
                quote_identifier(table)?,
                quote_identifier(&column.name)?,
                self.dialect.placeholder(1),
                quote_identifier(&key_column.name)?,
                self.dialect.placeholder(2)
            ),
            params: vec![
                Param::for_column(new_value, column),
                Param::for_column(key, key_column),
            ],
        })
    }

    /// `DELETE` of the row matched by primary-key equality.
    pub fn delete_by_key(
        &self,
        table: &str,
        key_column: &ColumnInfo,
        key: Value,
    ) -> Result<Statement> {
        Ok(Statement {
            sql: format!(
                "DELETE FROM {} WHERE {} = {}",
                quote_identifier(table)?,
                quote_identifier(&key_column.name)?,
                self.dialect.placeholder(1)
            ),
            params: vec![Param::for_column(key, key_column)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, data_type: ColumnType, position: u32) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            declared_type: data_type.to_string(),
            data_type,
            is_nullable: true,
            is_primary_key: position == 1,
            is_auto_increment: position == 1,
            ordinal_position: position,
        }
    }

    fn customers() -> TableSchema {
        TableSchema {
            name: "customers".to_string(),
            columns: vec![
                col("customer_id", ColumnType::Integer, 1),
                col("name", ColumnType::Text, 2),
                col("is_premium", ColumnType::Boolean, 3),
            ],
            primary_key: vec!["customer_id".to_string()],
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("name").unwrap(), "\"name\"");
        assert_eq!(
            quote_identifier("x\"; DROP TABLE customers; --").unwrap(),
            "\"x\"\"; DROP TABLE customers; --\""
        );
    }

    #[test]
    fn test_quote_identifier_rejects_empty_and_nul() {
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("a\0b").is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }

    #[test]
    fn test_select_all_names_columns_in_order() {
        let stmt = StatementBuilder::new(Dialect::Sqlite)
            .select_all(&customers())
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"customer_id\", \"name\", \"is_premium\" FROM \"customers\" ORDER BY \"customer_id\""
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_insert_binds_every_value() {
        let table = customers();
        let columns: Vec<&ColumnInfo> = table.columns.iter().skip(1).collect();
        let stmt = StatementBuilder::new(Dialect::Postgres)
            .insert(
                "customers",
                &columns,
                vec![Value::from("Alice"), Value::Bool(true)],
                "customer_id",
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO \"customers\" (\"name\", \"is_premium\") VALUES ($1, $2) RETURNING \"customer_id\""
        );
        assert_eq!(stmt.params.len(), 2);
        assert_eq!(stmt.params[0].value, Value::from("Alice"));
        assert_eq!(stmt.params[1].type_hint, ColumnType::Boolean);
        assert!(!stmt.sql.contains("Alice"));
    }

    #[test]
    fn test_insert_rejects_misaligned_values() {
        let table = customers();
        let columns: Vec<&ColumnInfo> = table.columns.iter().collect();
        let result = StatementBuilder::new(Dialect::Sqlite).insert(
            "customers",
            &columns,
            vec![Value::Integer(1)],
            "customer_id",
        );
        assert!(matches!(result, Err(AdminError::Validation { .. })));
    }

    #[test]
    fn test_insert_with_only_generated_columns() {
        let stmt = StatementBuilder::new(Dialect::Sqlite)
            .insert("customers", &[], Vec::new(), "customer_id")
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"customers\" DEFAULT VALUES RETURNING \"customer_id\""
        );
    }

    #[test]
    fn test_update_targets_one_column_by_key() {
        let table = customers();
        let stmt = StatementBuilder::new(Dialect::Postgres)
            .update(
                "customers",
                &table.columns[1],
                Value::from("Bob"),
                &table.columns[0],
                Value::Integer(7),
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"customers\" SET \"name\" = $1 WHERE \"customer_id\" = $2"
        );
        assert_eq!(stmt.params[1].value, Value::Integer(7));
    }

    #[test]
    fn test_delete_by_key() {
        let table = customers();
        let stmt = StatementBuilder::new(Dialect::Sqlite)
            .delete_by_key("customers", &table.columns[0], Value::Integer(1))
            .unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"customers\" WHERE \"customer_id\" = ?");
    }
}
