//! Conversion between [`Value`] and PostgreSQL wire types.
//!
//! PostgreSQL checks parameter types strictly, so NULLs are bound with the
//! type of the column they target and cells are decoded by the type the
//! server reports for them.

use crate::Result;
use crate::error::AdminError;
use crate::models::{ColumnType, Value};
use crate::sql::Param;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Row, TypeInfo, ValueRef};

/// Binds every parameter, in order.
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Param],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match &param.value {
            Value::Null => bind_null(query, &param.type_hint),
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

fn bind_null<'q>(
    query: Query<'q, Postgres, PgArguments>,
    type_hint: &ColumnType,
) -> Query<'q, Postgres, PgArguments> {
    match type_hint {
        ColumnType::Integer => query.bind(None::<i64>),
        ColumnType::Real => query.bind(None::<f64>),
        ColumnType::Boolean => query.bind(None::<bool>),
        ColumnType::Date => query.bind(None::<NaiveDate>),
        ColumnType::Timestamp => query.bind(None::<NaiveDateTime>),
        ColumnType::Blob => query.bind(None::<Vec<u8>>),
        ColumnType::Text | ColumnType::Other(_) => query.bind(None::<String>),
    }
}

/// Decodes all cells of a row.
pub(crate) fn decode_row(row: &PgRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|index| decode_cell(row, index)).collect()
}

/// Decodes one cell by the type reported by the server.
///
/// Types without a [`Value`] counterpart decode to a `<type>` text marker.
pub(crate) fn decode_cell(row: &PgRow, index: usize) -> Result<Value> {
    let decode_error = |e| AdminError::query_failed(format!("Failed to decode column {}", index), e);

    let type_name = {
        let raw = row.try_get_raw(index).map_err(decode_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match type_name.as_str() {
        "INT2" => Value::Integer(i64::from(row.try_get::<i16, _>(index).map_err(decode_error)?)),
        "INT4" => Value::Integer(i64::from(row.try_get::<i32, _>(index).map_err(decode_error)?)),
        "INT8" => Value::Integer(row.try_get::<i64, _>(index).map_err(decode_error)?),
        "FLOAT4" => Value::Real(f64::from(row.try_get::<f32, _>(index).map_err(decode_error)?)),
        "FLOAT8" => Value::Real(row.try_get::<f64, _>(index).map_err(decode_error)?),
        "BOOL" => Value::Bool(row.try_get::<bool, _>(index).map_err(decode_error)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            Value::Text(row.try_get::<String, _>(index).map_err(decode_error)?)
        }
        "DATE" => Value::Date(row.try_get::<NaiveDate, _>(index).map_err(decode_error)?),
        "TIMESTAMP" => Value::Timestamp(row.try_get::<NaiveDateTime, _>(index).map_err(decode_error)?),
        "TIMESTAMPTZ" => Value::Timestamp(
            row.try_get::<DateTime<Utc>, _>(index)
                .map_err(decode_error)?
                .naive_utc(),
        ),
        "BYTEA" => Value::Blob(row.try_get::<Vec<u8>, _>(index).map_err(decode_error)?),
        "INTERVAL" => Value::Text(format_interval(
            &row.try_get::<PgInterval, _>(index).map_err(decode_error)?,
        )),
        other => {
            tracing::warn!("Column {} has unsupported type {}; shown as a marker", index, other);
            Value::Text(format!("<{}>", other.to_lowercase()))
        }
    };

    Ok(value)
}

/// Renders an interval the way `psql` does for the common cases.
fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    if interval.months != 0 {
        parts.push(format!("{} mons", interval.months));
    }
    if interval.days != 0 {
        parts.push(format!("{} days", interval.days));
    }

    let total_seconds = interval.microseconds / 1_000_000;
    let sign = if interval.microseconds < 0 { "-" } else { "" };
    let total_seconds = total_seconds.abs();
    if interval.microseconds != 0 || parts.is_empty() {
        parts.push(format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            total_seconds / 3600,
            (total_seconds % 3600) / 60,
            total_seconds % 60
        ));
    }

    parts.join(" ")
}
