//! Generic table administration.
//!
//! [`DataAdmin`] reads, inserts, updates and deletes rows of any table using
//! nothing but introspected metadata. Deletes remove dependent rows first,
//! following a [`DependencyGraph`] built from the declared foreign keys (or a
//! fixed graph supplied by the caller), and run as a single unit of work.
//!
//! # Example
//! ```rust,no_run
//! use dbsteward_core::admin::DataAdmin;
//! use dbsteward_core::models::Value;
//!
//! # async fn example() -> dbsteward_core::Result<()> {
//! let admin = DataAdmin::connect("sqlite::memory:").await?;
//! dbsteward_core::demo::install_schema(admin.adapter()).await?;
//!
//! let report = admin
//!     .delete("customers", "customer_id", Value::Integer(1))
//!     .await?;
//! println!("removed {} dependent rows", report.dependent_rows());
//! # Ok(())
//! # }
//! ```

use crate::Result;
use crate::adapters::{
    DatabaseAdapter, Expectation, PlannedStatement, UnitOfWork, create_adapter,
};
use crate::cascade::DependencyGraph;
use crate::catalog::CannedQuery;
use crate::error::AdminError;
use crate::models::{
    ColumnInfo, ColumnType, DeleteReport, QueryOutcome, RemovedRows, TableSchema, TabularResult, Value,
};
use crate::sql::{Dialect, StatementBuilder};

/// Administration facade over one database.
pub struct DataAdmin {
    adapter: Box<dyn DatabaseAdapter>,
    graph: Option<DependencyGraph>,
}

impl std::fmt::Debug for DataAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAdmin")
            .field("database_type", &self.adapter.database_type())
            .field("config", &self.adapter.connection_config())
            .field("fixed_graph", &self.graph.is_some())
            .finish()
    }
}

impl DataAdmin {
    /// Opens the database named by `database_url`.
    ///
    /// # Errors
    /// Returns `Configuration` for an unsupported or malformed URL
    pub async fn connect(database_url: &str) -> Result<Self> {
        let adapter = create_adapter(database_url).await?;
        Ok(Self::new(adapter))
    }

    /// Wraps an already opened adapter.
    pub fn new(adapter: Box<dyn DatabaseAdapter>) -> Self {
        Self {
            adapter,
            graph: None,
        }
    }

    /// Uses `graph` for deletes instead of the introspected foreign keys.
    pub fn with_dependency_graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// The backend, for DDL and other raw access.
    pub fn adapter(&self) -> &dyn DatabaseAdapter {
        self.adapter.as_ref()
    }

    /// Placeholder dialect of the backend.
    pub fn dialect(&self) -> Dialect {
        self.adapter.dialect()
    }

    fn statements(&self) -> StatementBuilder {
        StatementBuilder::new(self.dialect())
    }

    /// Fails with `Connection` when the database cannot be reached.
    pub async fn test_connection(&self) -> Result<()> {
        self.adapter.test_connection().await
    }

    /// All user tables, sorted by name.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.adapter.list_tables().await
    }

    /// Column names of `table` in declaration order.
    ///
    /// Values passed to [`insert`](Self::insert) align with this order.
    pub async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.describe_table(table).await?.column_names())
    }

    /// Columns, keys and foreign keys of `table`; `Schema` if it does not exist.
    pub async fn describe_table(&self, table: &str) -> Result<TableSchema> {
        self.adapter.describe_table(table).await
    }

    /// Every row of `table`, ordered by primary key.
    pub async fn read(&self, table: &str) -> Result<TabularResult> {
        let schema = self.describe_table(table).await?;
        let statement = self.statements().select_all(&schema)?;
        let hints: Vec<ColumnType> = schema.columns.iter().map(|c| c.data_type.clone()).collect();

        let rows = self.adapter.fetch_rows(&statement, &hints).await?;
        tracing::debug!("Read {} rows from '{}'", rows.len(), table);

        Ok(TabularResult::new(schema.column_names(), rows))
    }

    /// Inserts one row and returns its primary-key value.
    ///
    /// `values` align with [`list_columns`](Self::list_columns). A null
    /// primary key on a generated key column is left for the database to
    /// assign.
    ///
    /// # Errors
    /// - `Validation` when the value count differs from the column count,
    ///   a value does not fit its column, or the key is null on a column the
    ///   database does not generate
    /// - `ForeignKeyViolation` when a referenced row is missing
    pub async fn insert(&self, table: &str, values: Vec<Value>) -> Result<Value> {
        let schema = self.describe_table(table).await?;
        if values.len() != schema.columns.len() {
            return Err(AdminError::validation(format!(
                "'{}' has {} columns, got {} values",
                table,
                schema.columns.len(),
                values.len()
            )));
        }
        let pk = schema.primary_key_column()?;

        let mut columns = Vec::with_capacity(values.len());
        let mut coerced = Vec::with_capacity(values.len());
        for (column, value) in schema.columns.iter().zip(values) {
            let value = value.coerce_to(column)?;
            if column.name == pk.name && value.is_null() {
                if column.is_auto_increment {
                    continue;
                }
                return Err(null_key(table, &pk.name));
            }
            columns.push(column);
            coerced.push(value);
        }

        let statement = self.statements().insert(table, &columns, coerced, &pk.name)?;
        let unit = UnitOfWork::new(format!("insert into {}", table)).with_step(PlannedStatement::new(
            table,
            statement,
            Expectation::ReturningValue {
                column_type: pk.data_type.clone(),
            },
        ));

        let outcomes = self.adapter.run_unit(&unit).await?;
        let key = outcomes
            .into_iter()
            .find_map(|outcome| outcome.returned)
            .ok_or_else(|| AdminError::validation(format!("insert into '{}' returned no key", table)))?;

        tracing::info!("Inserted row into '{}' with {} = {}", table, pk.name, key);
        Ok(key)
    }

    /// Sets `column` of the row whose primary key equals `pk_value`.
    ///
    /// Returns the number of rows changed (1).
    ///
    /// # Errors
    /// - `Schema` when `column` does not exist
    /// - `Validation` when `pk_column` is not the primary key, `pk_value` is
    ///   null, or a value does not fit its column
    /// - `NotFound` when no row has that key
    pub async fn update(
        &self,
        table: &str,
        pk_column: &str,
        pk_value: Value,
        column: &str,
        new_value: Value,
    ) -> Result<u64> {
        let schema = self.describe_table(table).await?;
        let pk = schema.require_primary_key(pk_column)?;
        let target = schema.require_column(column)?;

        let key = lookup_key(table, pk, pk_value)?;
        let new_value = new_value.coerce_to(target)?;

        let statement = self
            .statements()
            .update(table, target, new_value, pk, key.clone())?;
        let unit = UnitOfWork::new(format!("update {}.{}", table, column)).with_step(
            PlannedStatement::new(
                table,
                statement,
                Expectation::AtLeastOneRow {
                    column: pk.name.clone(),
                    value: key.clone(),
                },
            ),
        );

        let outcomes = self.adapter.run_unit(&unit).await?;
        let rows_affected = outcomes.iter().map(|o| o.rows_affected).sum();

        tracing::info!("Updated '{}'.{} where {} = {}", table, column, pk.name, key);
        Ok(rows_affected)
    }

    /// Deletes one row together with every row that depends on it.
    ///
    /// Dependents are removed deepest first, then the row itself, all in one
    /// transaction. Nothing is removed if any step fails.
    ///
    /// # Errors
    /// - `Validation` when `pk_column` is not the primary key or `pk_value`
    ///   is null
    /// - `ForeignKeyViolation` when a dependency outside the graph still
    ///   references the row
    /// - `NotFound` when no row has that key
    pub async fn delete(&self, table: &str, pk_column: &str, pk_value: Value) -> Result<DeleteReport> {
        let schema = self.describe_table(table).await?;
        let pk = schema.require_primary_key(pk_column)?;
        let key = lookup_key(table, pk, pk_value)?;

        let graph = self.dependency_graph().await?;
        let plan = graph.plan(table);
        let dialect = self.dialect();

        let mut unit = UnitOfWork::new(format!("delete from {}", table));
        for step in &plan.steps {
            unit.push(PlannedStatement::new(
                step.table(),
                step.statement(dialect, table, pk, key.clone())?,
                Expectation::Any,
            ));
        }
        unit.push(PlannedStatement::new(
            table,
            self.statements().delete_by_key(table, pk, key.clone())?,
            Expectation::AtLeastOneRow {
                column: pk.name.clone(),
                value: key.clone(),
            },
        ));

        let outcomes = self.adapter.run_unit(&unit).await?;
        let report = DeleteReport {
            table: table.to_string(),
            key_column: pk.name.clone(),
            key,
            removed: outcomes
                .into_iter()
                .map(|outcome| RemovedRows {
                    table: outcome.table,
                    rows: outcome.rows_affected,
                })
                .collect(),
        };

        tracing::info!(
            "Deleted '{}' where {} = {} ({} dependent rows)",
            table,
            report.key_column,
            report.key,
            report.dependent_rows()
        );
        Ok(report)
    }

    /// The graph used to plan deletes.
    ///
    /// Without a fixed graph, every table is introspected and the graph is
    /// built from their foreign keys.
    pub async fn dependency_graph(&self) -> Result<DependencyGraph> {
        if let Some(graph) = &self.graph {
            return Ok(graph.clone());
        }

        let mut schemas = Vec::new();
        for table in self.list_tables().await? {
            schemas.push(self.describe_table(&table).await?);
        }
        Ok(DependencyGraph::from_schemas(&schemas))
    }

    /// Runs caller-supplied SQL without committing anything.
    ///
    /// Failures come back as [`QueryOutcome::Failed`] rather than as errors.
    pub async fn execute(&self, sql: &str) -> QueryOutcome {
        match self.adapter.run_query(sql).await {
            Ok(result) => {
                tracing::debug!("Query returned {} rows", result.len());
                QueryOutcome::Rows(result)
            }
            Err(e) => {
                tracing::warn!("Query failed: {}", e);
                QueryOutcome::Failed {
                    message: e.full_message(),
                }
            }
        }
    }

    /// Runs a catalog query in this database's dialect.
    pub async fn run_catalog_query(&self, query: &CannedQuery) -> QueryOutcome {
        tracing::debug!("Running catalog query {}", query);
        self.execute(query.sql_for(self.dialect())).await
    }

    /// Closes the backend's pool.
    pub async fn close(&self) {
        self.adapter.close().await;
    }
}

fn null_key(table: &str, column: &str) -> AdminError {
    AdminError::validation(format!("primary key '{}' of '{}' cannot be NULL", column, table))
}

/// Coerces a key used to find a row; null never matches one.
fn lookup_key(table: &str, pk: &ColumnInfo, value: Value) -> Result<Value> {
    let key = value.coerce_to(pk)?;
    if key.is_null() {
        return Err(null_key(table, &pk.name));
    }
    Ok(key)
}
