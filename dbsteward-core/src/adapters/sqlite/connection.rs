//! Opening SQLite databases.
//!
//! Accepted forms:
//! - `sqlite::memory:`, `sqlite://:memory:`, `:memory:` or any URL with `mode=memory`
//! - `sqlite:///abs/path.db`, `sqlite://./relative.db`, `sqlite:relative.db`
//! - a bare path ending in `.db`, `.sqlite` or `.sqlite3`
//!
//! Foreign keys are switched on for every connection.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::{ConnectionConfig, SqliteAdapter};
use crate::Result;
use crate::adapters::helpers::connection_error;
use crate::error::AdminError;

const FILE_EXTENSIONS: [&str; 3] = [".db", ".sqlite", ".sqlite3"];

/// What a connection string points at.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SqliteTarget {
    Memory,
    /// Driver URL (always `sqlite:`-prefixed) and the file name shown in logs
    File { url: String, file_name: String },
}

impl SqliteTarget {
    fn parse(connection_string: &str) -> Result<Self> {
        if connection_string == ":memory:"
            || connection_string.contains(":memory:")
            || connection_string.contains("mode=memory")
        {
            return Ok(Self::Memory);
        }

        let url = if connection_string.starts_with("sqlite:") {
            connection_string.to_string()
        } else if FILE_EXTENSIONS.iter().any(|ext| connection_string.ends_with(ext)) {
            format!("sqlite://{}", connection_string)
        } else {
            return Err(invalid_format());
        };

        let path = url
            .trim_start_matches("sqlite:")
            .trim_start_matches("//")
            .split('?')
            .next()
            .unwrap_or_default();
        let file_name = match path.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "main".to_string(),
        };

        Ok(Self::File { url, file_name })
    }

    fn database_name(&self) -> &str {
        match self {
            Self::Memory => ":memory:",
            Self::File { file_name, .. } => file_name,
        }
    }

    fn driver_url(&self) -> &str {
        match self {
            Self::Memory => "sqlite::memory:",
            Self::File { url, .. } => url,
        }
    }

    fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    async fn open(&self, config: &ConnectionConfig) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(self.driver_url())
            .map_err(|e| {
                AdminError::configuration(format!("Invalid SQLite connection string: {}", e))
            })?
            .foreign_keys(true)
            .busy_timeout(config.statement_timeout)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout);

        // An in-memory database dies with its last connection
        let pool = if self.is_memory() {
            pool.min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            pool.idle_timeout(config.idle_timeout)
        };

        pool.connect_with(options).await.map_err(connection_error)
    }
}

fn invalid_format() -> AdminError {
    AdminError::configuration(
        "Invalid SQLite connection string format: expected sqlite:// URL, file path, or :memory:",
    )
}

impl SqliteAdapter {
    /// Opens the database named by `connection_string`, creating a missing file.
    ///
    /// # Errors
    /// `Configuration` for an unrecognized string, `Connection` when the
    /// file cannot be opened
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_sqlite_connection_config(connection_string)?;
        Self::with_config(connection_string, config).await
    }

    /// Like [`SqliteAdapter::new`] with caller-supplied timeouts.
    ///
    /// The pool always holds exactly one connection.
    pub async fn with_config(connection_string: &str, mut config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let target = SqliteTarget::parse(connection_string)?;
        config.max_connections = 1;

        let pool = target.open(&config).await?;
        tracing::debug!("Opened SQLite database '{}'", target.database_name());

        Ok(Self {
            pool,
            config,
            connection_string: connection_string.to_string(),
        })
    }

    /// Whether the database lives only in this process.
    pub fn is_in_memory(&self) -> bool {
        SqliteTarget::parse(&self.connection_string).is_ok_and(|target| target.is_memory())
    }
}

/// Builds the adapter configuration for a SQLite connection string.
pub fn parse_sqlite_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    let target = SqliteTarget::parse(connection_string)?;
    Ok(ConnectionConfig::new("localhost")
        .with_database(target.database_name())
        .with_max_connections(1))
}

/// Checks that `connection_string` names a SQLite database.
///
/// # Errors
/// Returns `Configuration` for anything else
pub fn validate_sqlite_connection_string(connection_string: &str) -> Result<()> {
    SqliteTarget::parse(connection_string).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(connection_string: &str) -> (String, String) {
        match SqliteTarget::parse(connection_string).unwrap() {
            SqliteTarget::File { url, file_name } => (url, file_name),
            SqliteTarget::Memory => panic!("{} parsed as in-memory", connection_string),
        }
    }

    #[test]
    fn test_memory_forms() {
        for form in [":memory:", "sqlite::memory:", "sqlite://:memory:", "sqlite://x?mode=memory"] {
            let target = SqliteTarget::parse(form).unwrap();
            assert_eq!(target, SqliteTarget::Memory, "{}", form);
            assert_eq!(target.driver_url(), "sqlite::memory:");
            assert_eq!(target.database_name(), ":memory:");
        }
    }

    #[test]
    fn test_file_forms() {
        assert_eq!(
            file("sqlite:///path/to/delivery.sqlite"),
            ("sqlite:///path/to/delivery.sqlite".to_string(), "delivery.sqlite".to_string())
        );
        assert_eq!(file("sqlite://./delivery.db?mode=rwc").1, "delivery.db");
        assert_eq!(
            file("/var/data/app.db"),
            ("sqlite:///var/data/app.db".to_string(), "app.db".to_string())
        );
        assert_eq!(file("data.sqlite3").0, "sqlite://data.sqlite3");
        assert_eq!(file("sqlite:local.db").0, "sqlite:local.db");
    }

    #[test]
    fn test_rejects_other_strings() {
        for bad in ["postgres://localhost/db", "invalid", "notes.txt"] {
            let error = validate_sqlite_connection_string(bad).unwrap_err();
            assert_eq!(error.kind(), "configuration", "{}", bad);
        }
    }

    #[test]
    fn test_parse_sqlite_connection_config() {
        let config = parse_sqlite_connection_config("sqlite:///path/to/delivery.db").unwrap();
        assert_eq!(config.database.as_deref(), Some("delivery.db"));
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.port, None);
    }
}
