//! Pool sizing and timeouts shared by every adapter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AdminError;

/// Schema used by PostgreSQL when the URL does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Upper bound for `max_connections`.
pub const MAX_POOL_SIZE: u32 = 100;

/// Where and how an adapter connects.
///
/// Carries no password: credentials only ever live in the connection URL
/// handed to the driver.
///
/// # Example
/// ```rust
/// use dbsteward_core::adapters::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost")
///     .with_port(5432)
///     .with_database("delivery")
///     .with_username("admin");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.schema, "public");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host; `localhost` for SQLite
    pub host: String,
    /// Server port, when the URL names one
    pub port: Option<u16>,
    /// Database name, or the SQLite file name
    pub database: Option<String>,
    pub username: Option<String>,
    /// Schema searched for tables (PostgreSQL only)
    pub schema: String,
    /// Pool acquire timeout
    pub connect_timeout: Duration,
    /// PostgreSQL `statement_timeout`, SQLite busy timeout
    pub statement_timeout: Duration,
    /// Pool size; always 1 for SQLite
    pub max_connections: u32,
    /// `None` keeps idle connections forever
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            schema: DEFAULT_SCHEMA.to_string(),
            connect_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(30),
            max_connections: 10,
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// `host[:port][/database]`; the username is left out.
impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(database) = &self.database {
            write!(f, "/{}", database)?;
        }
        Ok(())
    }
}

impl ConnectionConfig {
    /// Defaults for everything but `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Sets the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the login role.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the schema searched for tables.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Sets the per-statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Sets the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Checks every field against its allowed range.
    ///
    /// # Errors
    /// Returns `Configuration` naming the first offending field
    pub fn validate(&self) -> crate::Result<()> {
        let problem = if self.host.is_empty() {
            Some("host cannot be empty")
        } else if self.port == Some(0) {
            Some("port must be greater than 0")
        } else if self.schema.is_empty() {
            Some("schema cannot be empty")
        } else if !(1..=MAX_POOL_SIZE).contains(&self.max_connections) {
            Some("max_connections must be between 1 and 100")
        } else if self.connect_timeout.is_zero() {
            Some("connect_timeout must be greater than 0")
        } else if self.statement_timeout.is_zero() {
            Some("statement_timeout must be greater than 0")
        } else {
            None
        };

        match problem {
            Some(message) => Err(AdminError::configuration(message)),
            None => Ok(()),
        }
    }
}
