//! Conversion between [`Value`] and SQLite storage classes.
//!
//! SQLite stores every cell as NULL, INTEGER, REAL, TEXT or BLOB regardless of
//! the declared column type. Cells are read by storage class and then
//! reinterpreted with the column's [`ColumnType`]: booleans come back as
//! integers, dates and timestamps as text.

use crate::Result;
use crate::error::AdminError;
use crate::models::{ColumnType, Value, parse_timestamp};
use crate::sql::Param;
use chrono::NaiveDate;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};

/// Binds every parameter, in order.
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match &param.value {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(b) => query.bind(*b),
            Value::Integer(i) => query.bind(*i),
            Value::Real(r) => query.bind(*r),
            Value::Text(s) => query.bind(s.clone()),
            Value::Date(d) => query.bind(*d),
            Value::Timestamp(ts) => query.bind(*ts),
            Value::Blob(bytes) => query.bind(bytes.clone()),
        };
    }
    query
}

/// Decodes all cells of a row; `hints[i]` types column `i` when present.
pub(crate) fn decode_row(row: &SqliteRow, hints: &[ColumnType]) -> Result<Vec<Value>> {
    (0..row.len())
        .map(|index| decode_cell(row, index, hints.get(index)))
        .collect()
}

/// Decodes one cell by storage class, then applies the column type.
pub(crate) fn decode_cell(row: &SqliteRow, index: usize, hint: Option<&ColumnType>) -> Result<Value> {
    let decode_error = |e| AdminError::query_failed(format!("Failed to decode column {}", index), e);

    let storage_class = {
        let raw = row.try_get_raw(index).map_err(decode_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_uppercase()
    };

    let stored = if storage_class.contains("INT") || storage_class == "BOOLEAN" {
        Value::Integer(row.try_get_unchecked::<i64, _>(index).map_err(decode_error)?)
    } else if storage_class == "REAL" || storage_class.contains("FLOA") || storage_class == "NUMERIC" {
        Value::Real(row.try_get_unchecked::<f64, _>(index).map_err(decode_error)?)
    } else if storage_class == "BLOB" {
        Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(index).map_err(decode_error)?)
    } else {
        Value::Text(row.try_get_unchecked::<String, _>(index).map_err(decode_error)?)
    };

    Ok(reinterpret(stored, hint))
}

/// Applies the declared column type to a value read by storage class.
///
/// Values that do not parse are returned as stored.
fn reinterpret(stored: Value, hint: Option<&ColumnType>) -> Value {
    match (hint, stored) {
        (Some(ColumnType::Boolean), Value::Integer(i)) => Value::Bool(i != 0),
        (Some(ColumnType::Real), Value::Integer(i)) => Value::Real(i as f64),
        (Some(ColumnType::Date), Value::Text(text)) => {
            match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
                Ok(date) => Value::Date(date),
                Err(_) => match parse_timestamp(&text) {
                    Some(ts) => Value::Date(ts.date()),
                    None => Value::Text(text),
                },
            }
        }
        (Some(ColumnType::Timestamp), Value::Text(text)) => match parse_timestamp(&text) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Text(text),
        },
        (_, stored) => stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinterpret_booleans_and_reals() {
        assert_eq!(
            reinterpret(Value::Integer(1), Some(&ColumnType::Boolean)),
            Value::Bool(true)
        );
        assert_eq!(
            reinterpret(Value::Integer(0), Some(&ColumnType::Boolean)),
            Value::Bool(false)
        );
        assert_eq!(
            reinterpret(Value::Integer(4), Some(&ColumnType::Real)),
            Value::Real(4.0)
        );
        assert_eq!(reinterpret(Value::Integer(4), None), Value::Integer(4));
    }

    #[test]
    fn test_reinterpret_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            reinterpret(Value::from("2024-03-09"), Some(&ColumnType::Date)),
            Value::Date(date)
        );
        assert_eq!(
            reinterpret(Value::from("2024-03-09 18:45:10"), Some(&ColumnType::Timestamp)),
            Value::Timestamp(date.and_hms_opt(18, 45, 10).unwrap())
        );
        assert_eq!(
            reinterpret(Value::from("soon"), Some(&ColumnType::Timestamp)),
            Value::from("soon")
        );
    }
}
