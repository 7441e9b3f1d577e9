//! PostgreSQL schema introspection.
//!
//! Tables and columns come from `information_schema`; foreign keys come from
//! `pg_constraint` so that constraint columns are matched up by position.
//! Everything is scoped to the schema configured on the adapter.
//!
//! `information_schema` reports names as `sql_identifier`, so every name
//! column is cast to `text` before decoding.

use super::type_mapping::map_postgresql_type;
use crate::Result;
use crate::adapters::helpers::{RowExt, classify_sqlx_error};
use crate::error::AdminError;
use crate::models::{ColumnInfo, ForeignKeyRef, ReferentialAction, TableSchema};
use sqlx::PgPool;
use std::collections::BTreeMap;

/// Lists base tables of `schema`, sorted by name.
pub(crate) async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>> {
    let tables_query = r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = $1
        AND table_type = 'BASE TABLE'
        ORDER BY table_name
    "#;

    sqlx::query_scalar::<_, String>(tables_query)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            classify_sqlx_error(
                "information_schema.tables",
                format!("Failed to enumerate tables in schema '{}'", schema),
                e,
            )
        })
}

/// Collects columns, primary key and foreign keys of one table.
pub(crate) async fn describe_table(pool: &PgPool, schema: &str, table: &str) -> Result<TableSchema> {
    let mut columns = collect_table_columns(pool, schema, table).await?;
    if columns.is_empty() {
        return Err(AdminError::unknown_table(table));
    }

    let primary_key = collect_primary_key(pool, schema, table).await?;
    for column in &mut columns {
        column.is_primary_key = primary_key.contains(&column.name);
        if column.is_primary_key {
            column.is_nullable = false;
        }
    }

    let foreign_keys = collect_table_foreign_keys(pool, schema, table).await?;

    tracing::debug!(
        "Described table '{}.{}' with {} columns, {} foreign keys",
        schema,
        table,
        columns.len(),
        foreign_keys.len()
    );

    Ok(TableSchema {
        name: table.to_string(),
        columns,
        primary_key,
        foreign_keys,
    })
}

async fn collect_table_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
    let columns_query = r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            udt_name::text AS udt_name,
            (is_nullable = 'YES') AS is_nullable,
            COALESCE(column_default LIKE 'nextval(%' OR is_identity = 'YES', false) AS is_auto_increment,
            ordinal_position::integer AS ordinal_position
        FROM information_schema.columns
        WHERE table_name = $1
        AND table_schema = $2
        ORDER BY ordinal_position
    "#;

    let column_rows = sqlx::query(columns_query)
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            classify_sqlx_error(
                table,
                format!("Failed to collect columns for table '{}.{}'", schema, table),
                e,
            )
        })?;

    let mut columns = Vec::with_capacity(column_rows.len());
    for row in &column_rows {
        let name: String = row.get_field("column_name", Some(table))?;
        let data_type: String = row.get_field("data_type", Some(table))?;
        let udt_name: String = row.get_field("udt_name", Some(table))?;
        let is_nullable: bool = row.get_field("is_nullable", Some(table))?;
        let is_auto_increment: bool = row.get_field("is_auto_increment", Some(table))?;
        let ordinal_position: i32 = row.get_field("ordinal_position", Some(table))?;

        columns.push(ColumnInfo {
            name,
            data_type: map_postgresql_type(&data_type, &udt_name),
            declared_type: data_type,
            is_nullable,
            is_primary_key: false,
            is_auto_increment,
            ordinal_position: u32::try_from(ordinal_position).unwrap_or_default(),
        });
    }

    Ok(columns)
}

async fn collect_primary_key(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<String>> {
    let pk_query = r#"
        SELECT kcu.column_name::text
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
            AND tc.table_name = kcu.table_name
        WHERE tc.constraint_type = 'PRIMARY KEY'
        AND tc.table_name = $1
        AND tc.table_schema = $2
        ORDER BY kcu.ordinal_position
    "#;

    sqlx::query_scalar::<_, String>(pk_query)
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            classify_sqlx_error(
                table,
                format!("Failed to collect primary key for table '{}.{}'", schema, table),
                e,
            )
        })
}

/// Collects single-column foreign keys declared on `table`.
///
/// Composite foreign keys are skipped with a warning.
async fn collect_table_foreign_keys(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<ForeignKeyRef>> {
    let fk_query = r#"
        SELECT
            con.conname::text AS constraint_name,
            rc.delete_rule::text AS delete_rule,
            a.attname::text AS column_name,
            fcl.relname::text AS referenced_table_name,
            fa.attname::text AS referenced_column_name
        FROM pg_constraint con
        JOIN pg_class cl ON con.conrelid = cl.oid
        JOIN pg_namespace ns ON cl.relnamespace = ns.oid
        JOIN information_schema.referential_constraints rc
            ON con.conname = rc.constraint_name
            AND ns.nspname = rc.constraint_schema
        JOIN pg_class fcl ON con.confrelid = fcl.oid
        JOIN pg_attribute a ON a.attrelid = con.conrelid
        JOIN pg_attribute fa ON fa.attrelid = con.confrelid
        WHERE con.contype = 'f'
        AND cl.relname = $1
        AND ns.nspname = $2
        AND a.attnum = ANY(con.conkey)
        AND fa.attnum = ANY(con.confkey)
        AND array_position(con.conkey, a.attnum) = array_position(con.confkey, fa.attnum)
        ORDER BY con.conname, array_position(con.conkey, a.attnum)
    "#;

    let fk_rows = sqlx::query(fk_query)
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            classify_sqlx_error(
                table,
                format!("Failed to collect foreign keys for table '{}.{}'", schema, table),
                e,
            )
        })?;

    let mut fk_groups: BTreeMap<String, Vec<ForeignKeyRef>> = BTreeMap::new();
    for row in &fk_rows {
        let constraint_name: String = row.get_field("constraint_name", Some(table))?;
        let delete_rule: String = row.get_field("delete_rule", Some(table))?;
        fk_groups.entry(constraint_name).or_default().push(ForeignKeyRef {
            column: row.get_field("column_name", Some(table))?,
            referenced_table: row.get_field("referenced_table_name", Some(table))?,
            referenced_column: row.get_field("referenced_column_name", Some(table))?,
            on_delete: ReferentialAction::parse(&delete_rule),
        });
    }

    let mut foreign_keys = Vec::with_capacity(fk_groups.len());
    for (constraint_name, mut parts) in fk_groups {
        if parts.len() != 1 {
            tracing::warn!(
                "Skipping composite foreign key '{}' on '{}' ({} columns)",
                constraint_name,
                table,
                parts.len()
            );
            continue;
        }
        if let Some(foreign_key) = parts.pop() {
            foreign_keys.push(foreign_key);
        }
    }

    Ok(foreign_keys)
}
