//! PostgreSQL database adapter with connection pooling.
//!
//! # Module Structure
//! - `connection`: Connection pool management and URL parameter handling
//! - `type_mapping`: PostgreSQL to `ColumnType` conversion
//! - `introspection`: Table, column and foreign key discovery
//! - `values`: Typed binding and decoding
//! - `execution`: Reads, transactional units of work and ad-hoc queries
//!
//! # Session Guarantees
//! - Every pooled connection has `statement_timeout`, `search_path` and a UTC
//!   time zone applied before first use
//! - Connection strings are redacted in error messages

mod connection;
mod execution;
mod introspection;
mod type_mapping;
mod values;


use super::{ConnectionConfig, DatabaseAdapter, StepOutcome, UnitOfWork};
use crate::Result;
use crate::models::{ColumnType, DatabaseType, TableSchema, TabularResult, Value};
use crate::sql::Statement;
use async_trait::async_trait;
use sqlx::PgPool;

pub use connection::{parse_connection_config, validate_connection_string};
pub use type_mapping::map_postgresql_type;

/// PostgreSQL database adapter with connection pooling
pub struct PostgresAdapter {
    pub pool: PgPool,
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    async fn test_connection(&self) -> Result<()> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::AdminError::connection_failed)?;
        tracing::trace!("Connectivity check returned {}", one);
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        introspection::list_tables(&self.pool, &self.config.schema).await
    }

    async fn describe_table(&self, table: &str) -> Result<TableSchema> {
        introspection::describe_table(&self.pool, &self.config.schema, table).await
    }

    async fn fetch_rows(
        &self,
        statement: &Statement,
        _hints: &[ColumnType],
    ) -> Result<Vec<Vec<Value>>> {
        // Cells carry their server-side type, so hints are not needed
        execution::fetch_rows(&self.pool, statement).await
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
        DatabaseType::PostgreSQL
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
