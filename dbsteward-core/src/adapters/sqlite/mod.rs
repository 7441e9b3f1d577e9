//! SQLite backend.
//!
//! File and in-memory databases share one code path. The pool holds a single
//! connection, so operations are serialized, and `PRAGMA foreign_keys` is on
//! for it. Tables, columns and foreign keys come from `sqlite_master` and the
//! `table_info`/`foreign_key_list` pragmas.

pub mod connection;
mod execution;
mod introspection;
pub mod type_mapping;
mod values;


use super::{ConnectionConfig, DatabaseAdapter, StepOutcome, UnitOfWork};
use crate::Result;
use crate::models::{ColumnType, DatabaseType, TableSchema, TabularResult, Value};
use crate::sql::Statement;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub use type_mapping::map_sqlite_type;

/// SQLite backend over a single pooled connection.
pub struct SqliteAdapter {
    /// Single-connection pool
    pub pool: SqlitePool,
    pub config: ConnectionConfig,
    /// As given by the caller; kept out of `Debug`
    pub(crate) connection_string: String,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("config", &self.config)
            .field("is_in_memory", &self.is_in_memory())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn test_connection(&self) -> Result<()> {
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::AdminError::connection_failed)?;
        tracing::trace!("Connectivity check returned {}", one);
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        introspection::list_tables(&self.pool).await
    }

    async fn describe_table(&self, table: &str) -> Result<TableSchema> {
        introspection::describe_table(&self.pool, table).await
    }

    async fn fetch_rows(
        &self,
        statement: &Statement,
        hints: &[ColumnType],
    ) -> Result<Vec<Vec<Value>>> {
        execution::fetch_rows(&self.pool, statement, hints).await
    }

    async fn run_unit(&self, unit: &UnitOfWork) -> Result<Vec<StepOutcome>> {
        execution::run_unit(&self.pool, unit).await
    }

    async fn run_query(&self, sql: &str) -> Result<TabularResult> {
        execution::run_query(&self.pool, sql).await
    }

    async fn execute_script(&self, statements: &[&str]) -> Result<()> {
        execution::execute_script(&self.pool, statements).await
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
