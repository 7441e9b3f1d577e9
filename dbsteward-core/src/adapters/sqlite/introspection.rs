//! SQLite schema introspection.
//!
//! # SQLite System Tables
//! - `sqlite_master`: Contains schema definitions for all database objects
//! - `pragma_table_info()`: Returns column information for a table
//! - `pragma_foreign_key_list()`: Returns foreign key information
//!
//! The pragma table-valued functions take the table name as a bound
//! parameter, so no identifier is ever formatted into these queries.

use super::type_mapping::map_sqlite_type;
use crate::Result;
use crate::adapters::helpers::classify_sqlx_error;
use crate::error::AdminError;
use crate::models::{ColumnInfo, ForeignKeyRef, ReferentialAction, TableSchema};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

/// Lists user tables, excluding SQLite's internal `sqlite_%` tables.
pub(crate) async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let tables_query = r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table'
        AND name NOT LIKE 'sqlite_%'
        ORDER BY name
    "#;

    sqlx::query_scalar::<_, String>(tables_query)
        .fetch_all(pool)
        .await
        .map_err(|e| classify_sqlx_error("sqlite_master", "Failed to enumerate tables", e))
}

/// Collects columns, primary key and foreign keys of one table.
pub(crate) async fn describe_table(pool: &SqlitePool, table: &str) -> Result<TableSchema> {
    let columns = collect_table_columns(pool, table).await?;
    if columns.is_empty() {
        return Err(AdminError::unknown_table(table));
    }

    let mut pk_columns: Vec<(i64, String)> = Vec::new();
    let mut infos = Vec::with_capacity(columns.len());
    for (column, pk_position) in columns {
        if pk_position > 0 {
            pk_columns.push((pk_position, column.name.clone()));
        }
        infos.push(column);
    }
    pk_columns.sort();
    let primary_key: Vec<String> = pk_columns.into_iter().map(|(_, name)| name).collect();

    // INTEGER PRIMARY KEY aliases the rowid and is assigned automatically
    if let [pk] = primary_key.as_slice()
        && let Some(column) = infos.iter_mut().find(|c| &c.name == pk)
    {
        column.is_auto_increment = column.declared_type.eq_ignore_ascii_case("INTEGER");
    }

    let foreign_keys = collect_table_foreign_keys(pool, table).await?;

    tracing::debug!(
        "Described table '{}' with {} columns, {} foreign keys",
        table,
        infos.len(),
        foreign_keys.len()
    );

    Ok(TableSchema {
        name: table.to_string(),
        columns: infos,
        primary_key,
        foreign_keys,
    })
}

/// Collects column metadata in declaration order with each column's position
/// in the primary key (0 when not part of it).
async fn collect_table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<(ColumnInfo, i64)>> {
    let column_rows = sqlx::query(
        r#"SELECT cid, name, type, "notnull", pk FROM pragma_table_info(?) ORDER BY cid"#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        classify_sqlx_error(
            table,
            format!("Failed to collect columns for table '{}'", table),
            e,
        )
    })?;

    let mut columns = Vec::with_capacity(column_rows.len());
    for row in &column_rows {
        let parse = |e| classify_sqlx_error(table, "Failed to parse column metadata", e);
        let cid: i64 = row.try_get("cid").map_err(parse)?;
        let name: String = row.try_get("name").map_err(parse)?;
        let declared_type: String = row.try_get("type").map_err(parse)?;
        let notnull: i64 = row.try_get("notnull").map_err(parse)?;
        let pk: i64 = row.try_get("pk").map_err(parse)?;

        let column = ColumnInfo {
            name,
            data_type: map_sqlite_type(&declared_type),
            declared_type,
            // PRIMARY KEY columns are treated as NOT NULL even when the pragma says otherwise
            is_nullable: notnull == 0 && pk == 0,
            is_primary_key: pk > 0,
            is_auto_increment: false,
            ordinal_position: u32::try_from(cid + 1).unwrap_or(u32::MAX),
        };
        columns.push((column, pk));
    }

    Ok(columns)
}

/// Collects single-column foreign keys declared on `table`.
///
/// Composite foreign keys are skipped with a warning.
async fn collect_table_foreign_keys(pool: &SqlitePool, table: &str) -> Result<Vec<ForeignKeyRef>> {
    let fk_rows = sqlx::query(
        r#"SELECT id, seq, "table", "from", "to", on_delete
           FROM pragma_foreign_key_list(?)
           ORDER BY id, seq"#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        classify_sqlx_error(
            table,
            format!("Failed to collect foreign keys for table '{}'", table),
            e,
        )
    })?;

    let mut grouped: BTreeMap<i64, Vec<(String, String, Option<String>, String)>> = BTreeMap::new();
    for row in &fk_rows {
        let parse = |e| classify_sqlx_error(table, "Failed to parse foreign key metadata", e);
        let id: i64 = row.try_get("id").map_err(parse)?;
        let referenced_table: String = row.try_get("table").map_err(parse)?;
        let from_column: String = row.try_get("from").map_err(parse)?;
        let to_column: Option<String> = row.try_get("to").map_err(parse)?;
        let on_delete: String = row.try_get("on_delete").map_err(parse)?;
        grouped
            .entry(id)
            .or_default()
            .push((referenced_table, from_column, to_column, on_delete));
    }

    let mut foreign_keys = Vec::with_capacity(grouped.len());
    for (_, mut parts) in grouped {
        if parts.len() != 1 {
            tracing::warn!(
                "Skipping composite foreign key on '{}' ({} columns)",
                table,
                parts.len()
            );
            continue;
        }
        let Some((referenced_table, column, to_column, on_delete)) = parts.pop() else {
            continue;
        };

        // REFERENCES parent without a column list points at the parent's primary key
        let referenced_column = match to_column {
            Some(name) if !name.is_empty() => name,
            _ => referenced_primary_key(pool, &referenced_table).await?,
        };

        foreign_keys.push(ForeignKeyRef {
            column,
            referenced_table,
            referenced_column,
            on_delete: ReferentialAction::parse(&on_delete),
        });
    }

    Ok(foreign_keys)
}

async fn referenced_primary_key(pool: &SqlitePool, table: &str) -> Result<String> {
    sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?) WHERE pk = 1")
        .bind(table)
        .fetch_optional(pool)
        .await
        .map_err(|e| classify_sqlx_error(table, "Failed to resolve referenced key", e))?
        .ok_or_else(|| {
            AdminError::schema(format!(
                "foreign key references '{}', which has no primary key",
                table
            ))
        })
}
