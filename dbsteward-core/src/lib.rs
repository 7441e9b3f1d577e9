//! Core library for DBSteward.
//!
//! Generic administration of relational tables: introspect a schema, read and
//! modify rows of any table through parameterized statements built from the
//! catalog metadata, and delete rows together with everything that depends on
//! them.
//!
//! # Guarantees
//! - Data values are always bound as parameters; identifiers are always quoted
//! - Every operation runs in its own transaction and commits all or nothing
//! - Dependent rows are deleted before the rows they reference
//! - Connection strings are redacted in logs and error messages
//!
//! # Architecture
//! - [`adapters`]: one [`DatabaseAdapter`] per backend, created by a factory
//!   from the connection URL
//! - [`cascade`]: the foreign-key dependency graph and delete planning
//! - [`admin`]: the [`DataAdmin`] facade tying introspection, statement
//!   building and execution together

pub mod adapters;
pub mod admin;
pub mod cascade;
pub mod catalog;
pub mod demo;
pub mod error;
pub mod generator;
pub mod logging;
pub mod models;
pub mod sql;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, DatabaseAdapter};
pub use admin::DataAdmin;
pub use cascade::{CascadePlan, DependencyGraph};
pub use error::{AdminError, Result};
pub use generator::{GeneratorConfig, SyntheticDataGenerator};
pub use models::{
    ColumnInfo, ColumnType, DatabaseType, DeleteReport, QueryOutcome, TableSchema, TabularResult,
    Value,
};
