//! Rendering of command results as aligned text or JSON.

use clap::ValueEnum;
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::{ContentArrangement, Table};
use dbsteward_core::error::AdminError;
use dbsteward_core::models::{DeleteReport, TableSchema, TabularResult};
use dbsteward_core::{Result, catalog::CannedQuery};
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Markdown-style text tables
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Serializes `value` as pretty JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AdminError::query_failed("JSON serialization", e))
}

/// Table with the markdown preset and the given header row.
fn markdown_table<H: ToString>(header: impl IntoIterator<Item = H>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_MARKDOWN)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(header.into_iter().map(|h| h.to_string()));
    table
}

fn push_table(out: &mut String, table: &Table) {
    out.push_str(&table.to_string());
    out.push('\n');
}

/// Renders rows under their column names, followed by a row count.
pub fn render_table(result: &TabularResult) -> String {
    let mut out = String::new();
    if !result.columns.is_empty() {
        let mut table = markdown_table(&result.columns);
        for row in &result.rows {
            table.add_row(row.iter().map(ToString::to_string));
        }
        push_table(&mut out, &table);
    }

    let noun = if result.len() == 1 { "row" } else { "rows" };
    out.push_str(&format!("({} {})\n", result.len(), noun));
    out
}

/// One row per column: name, declared type, and key/nullability markers.
pub fn render_schema(schema: &TableSchema) -> String {
    let mut table = markdown_table(["column", "type", "attributes"]);
    for column in &schema.columns {
        let mut markers = Vec::new();
        if column.is_primary_key {
            markers.push("PRIMARY KEY".to_string());
        }
        if column.is_auto_increment {
            markers.push("GENERATED".to_string());
        }
        if !column.is_nullable {
            markers.push("NOT NULL".to_string());
        }
        if let Some(fk) = schema.foreign_keys.iter().find(|fk| fk.column == column.name) {
            markers.push(format!("-> {}.{}", fk.referenced_table, fk.referenced_column));
        }
        table.add_row([
            column.name.clone(),
            column.declared_type.clone(),
            markers.join(", "),
        ]);
    }

    let mut out = String::new();
    push_table(&mut out, &table);
    out
}

/// Summary of a cascade delete, dependents first.
pub fn render_delete_report(report: &DeleteReport) -> String {
    let mut out = format!(
        "Deleted {} where {} = {}\n",
        report.table, report.key_column, report.key
    );
    let mut table = markdown_table(["table", "rows"]);
    for removed in &report.removed {
        table.add_row([removed.table.clone(), removed.rows.to_string()]);
    }
    push_table(&mut out, &table);
    out
}

/// Catalog listing entry.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub number: u32,
    pub name: &'static str,
    pub dialect_specific: bool,
}

impl From<&CannedQuery> for CatalogEntry {
    fn from(query: &CannedQuery) -> Self {
        Self {
            number: query.number,
            name: query.name,
            dialect_specific: query.is_dialect_specific(),
        }
    }
}
