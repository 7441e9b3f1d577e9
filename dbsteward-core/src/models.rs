//! Core data models for generic table administration.
//!
//! This module defines the engine-neutral structures exchanged between the
//! adapters and the [`DataAdmin`](crate::admin::DataAdmin) facade: table
//! metadata produced by introspection, dynamically typed cell values, tabular
//! results and the reports returned by mutating operations.

use crate::error::AdminError;
use crate::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize, Serializer};

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// Engine-neutral column type, used to coerce input values before binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Real,
    Boolean,
    Text,
    Date,
    Timestamp,
    Blob,
    /// Engine-specific type passed through without coercion
    Other(String),
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Real => write!(f, "real"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Blob => write!(f, "blob"),
            ColumnType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Database column information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name as declared
    pub name: String,
    /// Type name exactly as declared in the catalog
    pub declared_type: String,
    /// Declared type mapped to a portable kind
    pub data_type: ColumnType,
    /// Accepts NULL; false for primary-key columns
    pub is_nullable: bool,
    /// Part of the catalog's primary key
    pub is_primary_key: bool,
    /// The database assigns the value when it is omitted
    pub is_auto_increment: bool,
    /// Position in declaration order, starting at 1
    pub ordinal_position: u32,
}

/// Referential actions for foreign keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    /// Parses the rule names used by `information_schema` and SQLite pragmas.
    pub fn parse(rule: &str) -> Option<Self> {
        match rule.trim().to_uppercase().as_str() {
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "RESTRICT" => Some(Self::Restrict),
            "NO ACTION" => Some(Self::NoAction),
            _ => None,
        }
    }

    /// Whether a parent delete must remove the referencing rows first.
    ///
    /// `SET NULL` and `SET DEFAULT` keep the referencing row and only rewrite
    /// its column, which storage does on its own.
    pub fn removes_dependents(self) -> bool {
        !matches!(self, Self::SetNull | Self::SetDefault)
    }
}

/// Single-column foreign key declared on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referencing column on the owning table
    pub column: String,
    /// Parent table
    pub referenced_table: String,
    /// Parent column, usually its primary key
    pub referenced_column: String,
    /// Storage-level `ON DELETE` rule, if known
    pub on_delete: Option<ReferentialAction>,
}

/// Introspected table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Columns in ordinal declaration order
    pub columns: Vec<ColumnInfo>,
    /// Primary key columns as designated by the catalog
    pub primary_key: Vec<String>,
    /// Outgoing single-column foreign keys
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl TableSchema {
    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column, failing with a schema error when it is missing.
    pub fn require_column(&self, name: &str) -> Result<&ColumnInfo> {
        self.column(name)
            .ok_or_else(|| AdminError::unknown_column(&self.name, name))
    }

    /// Resolves the single primary-key column of the table.
    ///
    /// Uses the catalog designation; a table without one falls back to its
    /// first column. Composite keys are rejected.
    pub fn primary_key_column(&self) -> Result<&ColumnInfo> {
        match self.primary_key.as_slice() {
            [single] => self.require_column(single),
            [] => {
                let first = self.columns.first().ok_or_else(|| {
                    AdminError::schema(format!("table '{}' has no columns", self.name))
                })?;
                tracing::warn!(
                    "Table '{}' declares no primary key, using first column '{}'",
                    self.name,
                    first.name
                );
                Ok(first)
            }
            composite => Err(AdminError::schema(format!(
                "table '{}' has a composite primary key ({}), which is not supported",
                self.name,
                composite.join(", ")
            ))),
        }
    }

    /// Fails unless `column` is this table's primary key.
    pub fn require_primary_key(&self, column: &str) -> Result<&ColumnInfo> {
        let pk = self.primary_key_column()?;
        if pk.name != column {
            self.require_column(column)?;
            return Err(AdminError::validation(format!(
                "'{}' is not the primary key of '{}' (expected '{}')",
                column, self.name, pk.name
            )));
        }
        Ok(pk)
    }
}

/// Dynamically typed cell value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Blob(Vec<u8>),
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

impl Value {
    /// Interprets free-form input text: `NULL` (any case) becomes null, all
    /// else stays text until coerced against a column.
    pub fn from_input(input: &str) -> Self {
        if input.eq_ignore_ascii_case("null") {
            Value::Null
        } else {
            Value::Text(input.to_string())
        }
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to the representation expected by `column`.
    ///
    /// Empty text becomes null for every non-text column.
    pub fn coerce_to(self, column: &ColumnInfo) -> Result<Value> {
        let invalid = |value: &Value| {
            AdminError::validation(format!(
                "value '{}' is not a valid {} for column '{}'",
                value, column.data_type, column.name
            ))
        };

        if let Value::Text(text) = &self
            && text.trim().is_empty()
            && !matches!(column.data_type, ColumnType::Text | ColumnType::Other(_))
        {
            return Ok(Value::Null);
        }

        let coerced = match (&column.data_type, self) {
            (_, Value::Null) => Value::Null,
            (ColumnType::Other(_), value) => value,

            (ColumnType::Integer, Value::Integer(i)) => Value::Integer(i),
            (ColumnType::Integer, Value::Bool(b)) => Value::Integer(i64::from(b)),
            (ColumnType::Integer, Value::Real(r))
                if r.fract() == 0.0 && r >= i64::MIN as f64 && r <= i64::MAX as f64 =>
            {
                Value::Integer(r as i64)
            }
            (ColumnType::Integer, Value::Text(text)) => match text.trim().parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => return Err(invalid(&Value::Text(text))),
            },

            (ColumnType::Real, Value::Real(r)) => Value::Real(r),
            (ColumnType::Real, Value::Integer(i)) => Value::Real(i as f64),
            (ColumnType::Real, Value::Text(text)) => match text.trim().parse::<f64>() {
                Ok(r) if r.is_finite() => Value::Real(r),
                _ => return Err(invalid(&Value::Text(text))),
            },

            (ColumnType::Boolean, Value::Bool(b)) => Value::Bool(b),
            (ColumnType::Boolean, Value::Integer(0)) => Value::Bool(false),
            (ColumnType::Boolean, Value::Integer(1)) => Value::Bool(true),
            (ColumnType::Boolean, Value::Text(text)) => {
                match text.trim().to_lowercase().as_str() {
                    "true" | "t" | "yes" | "y" | "on" | "1" => Value::Bool(true),
                    "false" | "f" | "no" | "n" | "off" | "0" => Value::Bool(false),
                    _ => return Err(invalid(&Value::Text(text))),
                }
            }

            (ColumnType::Text, Value::Text(text)) => Value::Text(text),
            (ColumnType::Text, Value::Blob(bytes)) => return Err(invalid(&Value::Blob(bytes))),
            (ColumnType::Text, other) => Value::Text(other.to_string()),

            (ColumnType::Date, Value::Date(d)) => Value::Date(d),
            (ColumnType::Date, Value::Timestamp(ts)) => Value::Date(ts.date()),
            (ColumnType::Date, Value::Text(text)) => {
                match NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
                    Ok(d) => Value::Date(d),
                    Err(_) => match parse_timestamp(text.trim()) {
                        Some(ts) => Value::Date(ts.date()),
                        None => return Err(invalid(&Value::Text(text))),
                    },
                }
            }

            (ColumnType::Timestamp, Value::Timestamp(ts)) => Value::Timestamp(ts),
            (ColumnType::Timestamp, Value::Date(d)) => Value::Timestamp(d.and_time(NaiveTime::MIN)),
            (ColumnType::Timestamp, Value::Text(text)) => match parse_timestamp(text.trim()) {
                Some(ts) => Value::Timestamp(ts),
                None => return Err(invalid(&Value::Text(text))),
            },

            (ColumnType::Blob, Value::Blob(bytes)) => Value::Blob(bytes),
            (ColumnType::Blob, Value::Text(text)) => Value::Blob(text.into_bytes()),

            (_, other) => return Err(invalid(&other)),
        };

        Ok(coerced)
    }
}

/// Parses the timestamp spellings accepted from user input, including a bare date.
pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Blob(bytes) => {
                use base64::Engine;
                write!(
                    f,
                    "base64:{}",
                    base64::engine::general_purpose::STANDARD.encode(bytes)
                )
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::Text(s) => serializer.serialize_str(s),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Column names paired with positional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResult {
    /// Column names, also for empty results
    pub columns: Vec<String>,
    /// Positional rows aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    /// Pairs rows with their column names.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// True when no row came back.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` for the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// All values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        match self.column_index(column) {
            Some(index) => self.rows.iter().filter_map(|r| r.get(index)).collect(),
            None => Vec::new(),
        }
    }
}

/// Outcome of running an ad-hoc read-only statement.
///
/// Execution failures are reported as data so that callers can render
/// "error" differently from "no rows".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Rows(TabularResult),
    Failed { message: String },
}

impl QueryOutcome {
    /// True for [`QueryOutcome::Failed`].
    pub fn is_error(&self) -> bool {
        matches!(self, QueryOutcome::Failed { .. })
    }

    /// Rows of a successful query.
    pub fn rows(&self) -> Option<&TabularResult> {
        match self {
            QueryOutcome::Rows(result) => Some(result),
            QueryOutcome::Failed { .. } => None,
        }
    }

    /// Owned form of [`rows`](Self::rows).
    pub fn into_rows(self) -> Option<TabularResult> {
        match self {
            QueryOutcome::Rows(result) => Some(result),
            QueryOutcome::Failed { .. } => None,
        }
    }
}

/// Rows removed from one table during a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedRows {
    /// Table the rows were removed from
    pub table: String,
    /// Rows removed by one step
    pub rows: u64,
}

/// Result of a cascade-aware delete, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteReport {
    /// Table of the deleted row
    pub table: String,
    /// Its primary-key column
    pub key_column: String,
    /// Key of the deleted row
    pub key: Value,
    /// Dependents first, the target table last
    pub removed: Vec<RemovedRows>,
}

impl DeleteReport {
    /// Rows removed from dependent tables (everything but the target row).
    pub fn dependent_rows(&self) -> u64 {
        self.removed
            .iter()
            .take(self.removed.len().saturating_sub(1))
            .map(|r| r.rows)
            .sum()
    }

    /// Rows removed from a specific table, summed over all cascade paths.
    pub fn removed_from(&self, table: &str) -> u64 {
        self.removed
            .iter()
            .filter(|r| r.table == table)
            .map(|r| r.rows)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: ColumnType) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            declared_type: data_type.to_string(),
            data_type,
            is_nullable: true,
            is_primary_key: false,
            is_auto_increment: false,
            ordinal_position: 1,
        }
    }

    fn table(primary_key: &[&str]) -> TableSchema {
        TableSchema {
            name: "orders".to_string(),
            columns: vec![
                column("order_id", ColumnType::Integer),
                column("status", ColumnType::Text),
                column("line", ColumnType::Integer),
            ],
            primary_key: primary_key.iter().map(|s| s.to_string()).collect(),
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn test_primary_key_from_catalog() {
        let schema = table(&["line"]);
        assert_eq!(schema.primary_key_column().unwrap().name, "line");
    }

    #[test]
    fn test_primary_key_falls_back_to_first_column() {
        let schema = table(&[]);
        assert_eq!(schema.primary_key_column().unwrap().name, "order_id");
    }

    #[test]
    fn test_composite_primary_key_rejected() {
        let schema = table(&["order_id", "line"]);
        let err = schema.primary_key_column().unwrap_err();
        assert!(matches!(err, AdminError::Schema { .. }));
    }

    #[test]
    fn test_require_primary_key_mismatch() {
        let schema = table(&["order_id"]);
        assert!(matches!(
            schema.require_primary_key("status"),
            Err(AdminError::Validation { .. })
        ));
        assert!(matches!(
            schema.require_primary_key("missing"),
            Err(AdminError::Schema { .. })
        ));
        assert!(schema.require_primary_key("order_id").is_ok());
    }

    #[test]
    fn test_coerce_text_to_integer() {
        let col = column("total_orders", ColumnType::Integer);
        assert_eq!(
            Value::from(" 42 ").coerce_to(&col).unwrap(),
            Value::Integer(42)
        );
        assert!(matches!(
            Value::from("forty").coerce_to(&col),
            Err(AdminError::Validation { .. })
        ));
    }

    #[test]
    fn test_coerce_empty_text_is_null_except_for_text() {
        let int_col = column("total_orders", ColumnType::Integer);
        assert_eq!(Value::from("").coerce_to(&int_col).unwrap(), Value::Null);

        let text_col = column("name", ColumnType::Text);
        assert_eq!(
            Value::from("").coerce_to(&text_col).unwrap(),
            Value::Text(String::new())
        );
    }

    #[test]
    fn test_coerce_booleans() {
        let col = column("is_premium", ColumnType::Boolean);
        assert_eq!(Value::from("yes").coerce_to(&col).unwrap(), Value::Bool(true));
        assert_eq!(Value::from("F").coerce_to(&col).unwrap(), Value::Bool(false));
        assert_eq!(Value::Integer(1).coerce_to(&col).unwrap(), Value::Bool(true));
        assert!(Value::Integer(2).coerce_to(&col).is_err());
    }

    #[test]
    fn test_coerce_dates_and_timestamps() {
        let date_col = column("signup_date", ColumnType::Date);
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            Value::from("2024-03-09").coerce_to(&date_col).unwrap(),
            Value::Date(expected)
        );

        let ts_col = column("order_date", ColumnType::Timestamp);
        let parsed = Value::from("2024-03-09T12:30:00")
            .coerce_to(&ts_col)
            .unwrap();
        assert_eq!(
            parsed,
            Value::Timestamp(expected.and_hms_opt(12, 30, 0).unwrap())
        );
        assert_eq!(
            Value::from("2024-03-09").coerce_to(&ts_col).unwrap(),
            Value::Timestamp(expected.and_time(NaiveTime::MIN))
        );
        assert!(Value::from("yesterday").coerce_to(&ts_col).is_err());
    }

    #[test]
    fn test_coerce_real_accepts_integers_and_rejects_nan() {
        let col = column("total_amount", ColumnType::Real);
        assert_eq!(Value::Integer(3).coerce_to(&col).unwrap(), Value::Real(3.0));
        assert!(Value::from("NaN").coerce_to(&col).is_err());
    }

    #[test]
    fn test_from_input_recognizes_null() {
        assert_eq!(Value::from_input("NULL"), Value::Null);
        assert_eq!(Value::from_input("null"), Value::Null);
        assert_eq!(Value::from_input("Alice"), Value::Text("Alice".to_string()));
    }

    #[test]
    fn test_value_serializes_naturally() {
        let row = vec![
            Value::Integer(1),
            Value::Null,
            Value::Bool(true),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1,null,true,"2024-01-02"]"#);
    }

    #[test]
    fn test_query_outcome_distinguishes_error_from_empty() {
        let empty = QueryOutcome::Rows(TabularResult::new(vec!["n".to_string()], Vec::new()));
        assert!(!empty.is_error());
        assert!(empty.rows().unwrap().is_empty());

        let failed = QueryOutcome::Failed {
            message: "no such table".to_string(),
        };
        assert!(failed.is_error());
        assert!(failed.rows().is_none());
    }

    #[test]
    fn test_delete_report_totals() {
        let report = DeleteReport {
            table: "customers".to_string(),
            key_column: "customer_id".to_string(),
            key: Value::Integer(1),
            removed: vec![
                RemovedRows { table: "deliveries".to_string(), rows: 3 },
                RemovedRows { table: "orders".to_string(), rows: 2 },
                RemovedRows { table: "customers".to_string(), rows: 1 },
            ],
        };
        assert_eq!(report.dependent_rows(), 5);
        assert_eq!(report.removed_from("orders"), 2);
        assert_eq!(report.removed_from("restaurants"), 0);
    }

    #[test]
    fn test_tabular_lookup() {
        let result = TabularResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![Value::Integer(1), Value::from("Alice")]],
        );
        assert_eq!(result.get(0, "name"), Some(&Value::from("Alice")));
        assert_eq!(result.get(1, "name"), None);
        assert_eq!(result.column_values("id"), vec![&Value::Integer(1)]);
    }
}
