//! Storage backends behind one object-safe trait.
//!
//! [`DataAdmin`](crate::admin::DataAdmin) talks only to [`DatabaseAdapter`];
//! `sqlite` and `postgres` implement it, each behind its cargo feature.
//! `helpers` holds the driver error classification both share.

use crate::Result;
use crate::models::{ColumnType, DatabaseType, TableSchema, TabularResult, Value};
use crate::sql::{Dialect, Statement};
use async_trait::async_trait;

pub mod config;

pub use config::{ConnectionConfig, DEFAULT_SCHEMA, MAX_POOL_SIZE};

/// What a planned statement must achieve for its unit of work to commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Any number of affected rows, including none
    Any,
    /// At least one row must be affected; otherwise the unit rolls back with
    /// `NotFound` naming `column = value`
    AtLeastOneRow { column: String, value: Value },
    /// The statement has a `RETURNING` clause; its single value, of
    /// `column_type`, is captured and the unit rolls back with `Validation`
    /// if no row comes back
    ReturningValue { column_type: ColumnType },
}

/// One statement of a unit of work, tagged with the table it touches.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStatement {
    /// Table the statement touches
    pub table: String,
    /// Parameterized SQL
    pub statement: Statement,
    /// Condition checked before the unit may commit
    pub expect: Expectation,
}

impl PlannedStatement {
    /// Tags `statement` with `table` and its expectation.
    pub fn new(table: impl Into<String>, statement: Statement, expect: Expectation) -> Self {
        Self {
            table: table.into(),
            statement,
            expect,
        }
    }
}

/// Statements executed in order inside a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOfWork {
    /// Short description used in logs
    pub label: String,
    /// Executed in order
    pub steps: Vec<PlannedStatement>,
}

impl UnitOfWork {
    /// Unit with no steps yet.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn push(&mut self, step: PlannedStatement) {
        self.steps.push(step);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_step(mut self, step: PlannedStatement) -> Self {
        self.push(step);
        self
    }
}

/// Result of one committed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Table named by the step
    pub table: String,
    /// Rows the statement changed
    pub rows_affected: u64,
    /// Value captured by a [`Expectation::ReturningValue`] step
    pub returned: Option<Value>,
}

/// Operations every backend provides.
///
/// # Transactions
/// Every mutating call runs inside its own transaction, which is committed
/// only when all of its statements succeed. Dropping an uncommitted
/// transaction rolls it back, so no partial effect survives an error.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Round-trips `SELECT 1`.
    ///
    /// # Errors
    /// `Connection` if the database cannot be reached
    async fn test_connection(&self) -> Result<()>;

    /// Names of all user tables, sorted by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns, primary key and foreign keys of one table.
    ///
    /// # Errors
    /// Returns `Schema` if the table does not exist
    async fn describe_table(&self, table: &str) -> Result<TableSchema>;

    /// Runs a `SELECT`, decoding column `i` with `hints[i]` when present.
    async fn fetch_rows(&self, statement: &Statement, hints: &[ColumnType])
    -> Result<Vec<Vec<Value>>>;

    /// Executes all steps atomically, in order.
    ///
    /// # Errors
    /// - `NotFound` when an [`Expectation::AtLeastOneRow`] step affects nothing
    /// - `ForeignKeyViolation` when referential integrity rejects a step
    /// - `Query` for any other statement failure
    ///
    /// In every error case nothing is committed.
    async fn run_unit(&self, unit: &UnitOfWork) -> Result<Vec<StepOutcome>>;

    /// Runs caller-supplied SQL inside a transaction that is always rolled back.
    async fn run_query(&self, sql: &str) -> Result<TabularResult>;

    /// Executes unparameterized statements (DDL) in one transaction.
    async fn execute_script(&self, statements: &[&str]) -> Result<()>;

    fn database_type(&self) -> DatabaseType;

    /// Placeholder dialect of this adapter.
    fn dialect(&self) -> Dialect {
        Dialect::from(self.database_type())
    }

    /// Configuration in effect; never contains a password.
    fn connection_config(&self) -> ConnectionConfig;

    /// Waits for in-flight work, then closes the pool.
    async fn close(&self);
}

/// Opens the backend matching the URL scheme.
///
/// The URL is redacted before it is logged or placed in an error.
///
/// # Errors
/// `Configuration` for an unrecognized URL or a backend whose cargo feature
/// is disabled; otherwise whatever the backend's constructor reports
pub async fn create_adapter(connection_string: &str) -> Result<Box<dyn DatabaseAdapter>> {
    let database_type = detect_database_type(connection_string)?;
    tracing::debug!(
        "Connecting to {} database at {}",
        database_type,
        redact_database_url(connection_string)
    );

    let adapter: Box<dyn DatabaseAdapter> = match database_type {
        #[cfg(feature = "postgresql")]
        DatabaseType::PostgreSQL => Box::new(postgres::PostgresAdapter::new(connection_string).await?),
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => Box::new(sqlite::SqliteAdapter::new(connection_string).await?),
        #[allow(unreachable_patterns)]
        disabled => {
            return Err(crate::error::AdminError::configuration(format!(
                "{} support not compiled in; rebuild with the matching cargo feature",
                disabled
            )));
        }
    };
    Ok(adapter)
}

/// See [`crate::error::redact_database_url`].
#[inline]
pub fn redact_database_url(url: &str) -> String {
    crate::error::redact_database_url(url)
}

/// Backend named by a connection string's scheme or file extension.
///
/// # Errors
/// `Configuration` when neither backend recognizes the string
pub fn detect_database_type(connection_string: &str) -> Result<DatabaseType> {
    const POSTGRES_SCHEMES: [&str; 2] = ["postgres://", "postgresql://"];
    const SQLITE_EXTENSIONS: [&str; 3] = [".db", ".sqlite", ".sqlite3"];

    if POSTGRES_SCHEMES.iter().any(|scheme| connection_string.starts_with(scheme)) {
        return Ok(DatabaseType::PostgreSQL);
    }
    if connection_string.starts_with("sqlite:")
        || connection_string == ":memory:"
        || SQLITE_EXTENSIONS.iter().any(|ext| connection_string.ends_with(ext))
    {
        return Ok(DatabaseType::SQLite);
    }
    Err(crate::error::AdminError::configuration(
        "Unrecognized database connection string format",
    ))
}

#[cfg(any(feature = "sqlite", feature = "postgresql"))]
pub mod helpers;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;
