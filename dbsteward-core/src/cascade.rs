//! Referential-integrity-aware delete planning.
//!
//! A [`DependencyGraph`] maps each table to the tables whose foreign keys
//! reference it. [`DependencyGraph::plan`] walks the graph depth-first and
//! emits one [`CascadeStep`] per dependency path, deepest first, so that no
//! row is deleted while another row still references it. The graph is
//! declarative: any table is handled the same way, and new tables need no
//! new code.
//!
//! Each step is scoped to the root row through nested sub-selects on the
//! owning foreign keys:
//!
//! ```text
//! DELETE FROM "deliveries" WHERE "order_id" IN (
//!     SELECT "order_id" FROM "orders" WHERE "customer_id" = ?)
//! DELETE FROM "orders" WHERE "customer_id" = ?
//! DELETE FROM "customers" WHERE "customer_id" = ?
//! ```

use crate::Result;
use crate::models::{ColumnInfo, TableSchema, Value};
use crate::sql::{Dialect, Param, Statement, quote_identifier};
use std::collections::BTreeMap;

/// One edge of the graph: `table.column` references `parent.referenced_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Dependent (child) table
    pub table: String,
    /// Referencing column on the dependent table
    pub column: String,
    /// Referenced column on the parent table
    pub referenced_column: String,
}

/// Declarative foreign-key dependency graph: parent table -> dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<Dependency>>,
}

impl DependencyGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from the foreign keys declared on `tables`.
    ///
    /// Keys declared `ON DELETE SET NULL` or `SET DEFAULT` add no edge: the
    /// referencing row outlives its parent.
    pub fn from_schemas(tables: &[TableSchema]) -> Self {
        let mut graph = Self::new();
        for table in tables {
            for fk in &table.foreign_keys {
                if fk.on_delete.is_some_and(|action| !action.removes_dependents()) {
                    tracing::debug!(
                        "{}.{} is ON DELETE {:?}, left to storage",
                        table.name,
                        fk.column,
                        fk.on_delete
                    );
                    continue;
                }
                graph.add_dependency(
                    &fk.referenced_table,
                    &table.name,
                    &fk.column,
                    &fk.referenced_column,
                );
            }
        }
        graph
    }

    /// Records that `child.column` references `parent.referenced_column`.
    ///
    /// Duplicate edges are ignored.
    pub fn add_dependency(
        &mut self,
        parent: &str,
        child: &str,
        column: &str,
        referenced_column: &str,
    ) {
        let dependency = Dependency {
            table: child.to_string(),
            column: column.to_string(),
            referenced_column: referenced_column.to_string(),
        };
        let dependents = self.edges.entry(parent.to_string()).or_default();
        if !dependents.contains(&dependency) {
            dependents.push(dependency);
        }
    }

    /// Builder form of [`add_dependency`](Self::add_dependency).
    pub fn with_dependency(
        mut self,
        parent: &str,
        child: &str,
        column: &str,
        referenced_column: &str,
    ) -> Self {
        self.add_dependency(parent, child, column, referenced_column);
        self
    }

    /// Direct dependents of `table`.
    pub fn dependents(&self, table: &str) -> &[Dependency] {
        self.edges.get(table).map_or(&[], Vec::as_slice)
    }

    /// Whether any table references `table`.
    pub fn is_dependency_root(&self, table: &str) -> bool {
        !self.dependents(table).is_empty()
    }

    /// Orders the dependent deletions needed before a row of `table` can go.
    pub fn plan(&self, table: &str) -> CascadePlan {
        let mut plan = CascadePlan {
            root: table.to_string(),
            steps: Vec::new(),
            skipped_cycles: Vec::new(),
        };
        let mut path = Vec::new();
        let mut visiting = vec![table.to_string()];
        self.visit(table, &mut path, &mut visiting, &mut plan);
        plan
    }

    fn visit(
        &self,
        table: &str,
        path: &mut Vec<Dependency>,
        visiting: &mut Vec<String>,
        plan: &mut CascadePlan,
    ) {
        for dependency in self.dependents(table) {
            if visiting.contains(&dependency.table) {
                tracing::warn!(
                    "Dependency cycle {} -> {} not followed while planning delete on '{}'",
                    table,
                    dependency.table,
                    plan.root
                );
                plan.skipped_cycles
                    .push(format!("{}.{}", dependency.table, dependency.column));
                continue;
            }

            path.push(dependency.clone());
            visiting.push(dependency.table.clone());

            self.visit(&dependency.table, path, visiting, plan);
            plan.steps.push(CascadeStep { path: path.clone() });

            visiting.pop();
            path.pop();
        }
    }
}

/// Deletion of the rows of one dependent table reachable from the root row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeStep {
    /// Edges from the root table down to the table being emptied
    pub path: Vec<Dependency>,
}

impl CascadeStep {
    /// Table whose rows this step deletes.
    pub fn table(&self) -> &str {
        self.path.last().map_or("", |d| d.table.as_str())
    }

    /// Renders the scoped `DELETE`, binding `key` once.
    pub fn statement(
        &self,
        dialect: Dialect,
        root_table: &str,
        key_column: &ColumnInfo,
        key: Value,
    ) -> Result<Statement> {
        let placeholder = dialect.placeholder(1);
        let root_condition = format!("{} = {}", quote_identifier(&key_column.name)?, placeholder);

        // Innermost condition first: rows of path[0] owned by the root row.
        let first = self
            .path
            .first()
            .ok_or_else(|| crate::error::AdminError::schema("empty cascade path"))?;
        let mut condition = if first.referenced_column == key_column.name {
            format!("{} = {}", quote_identifier(&first.column)?, placeholder)
        } else {
            format!(
                "{} IN (SELECT {} FROM {} WHERE {})",
                quote_identifier(&first.column)?,
                quote_identifier(&first.referenced_column)?,
                quote_identifier(root_table)?,
                root_condition
            )
        };

        for pair in self.path.windows(2) {
            let (parent, child) = (&pair[0], &pair[1]);
            condition = format!(
                "{} IN (SELECT {} FROM {} WHERE {})",
                quote_identifier(&child.column)?,
                quote_identifier(&child.referenced_column)?,
                quote_identifier(&parent.table)?,
                condition
            );
        }

        Ok(Statement {
            sql: format!(
                "DELETE FROM {} WHERE {}",
                quote_identifier(self.table())?,
                condition
            ),
            params: vec![Param::for_column(key, key_column)],
        })
    }
}

/// Ordered dependent deletions for one root table, deepest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePlan {
    /// Table the delete starts from
    pub root: String,
    /// Dependent deletions, deepest first
    pub steps: Vec<CascadeStep>,
    /// Edges not followed because they close a cycle, as `table.column`
    pub skipped_cycles: Vec<String>,
}

impl CascadePlan {
    /// Dependent tables in execution order (a table may appear once per path).
    pub fn tables(&self) -> Vec<&str> {
        self.steps.iter().map(CascadeStep::table).collect()
    }

    /// True when the root table has no dependents.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
