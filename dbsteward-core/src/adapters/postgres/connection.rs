//! Pool construction and URL handling for PostgreSQL.
//!
//! A few query parameters are read by the adapter and removed before the URL
//! reaches the driver:
//!
//! | Parameter           | Meaning                                  | Range        |
//! |---------------------|------------------------------------------|--------------|
//! | `connect_timeout`   | Pool acquire timeout in seconds          | 1..=300      |
//! | `statement_timeout` | Per-statement timeout in milliseconds    | 1..=300000   |
//! | `pool_max_conns`    | Maximum pooled connections               | 1..=100      |
//! | `schema`            | Schema searched for tables               | any name     |
//!
//! Values outside the range are ignored, except a `statement_timeout` above
//! five minutes, which is rejected.

use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Executor, PgConnection};
use url::Url;

use super::{ConnectionConfig, PostgresAdapter};
use crate::Result;
use crate::adapters::{MAX_POOL_SIZE, redact_database_url};
use crate::error::AdminError;
use crate::sql::quote_identifier;

const DEFAULT_PORT: u16 = 5432;

/// PostgreSQL's identifier limit (NAMEDATALEN - 1).
const MAX_NAME_LEN: usize = 63;

const CONNECT_TIMEOUT_SECS: RangeInclusive<u64> = 1..=300;
const STATEMENT_TIMEOUT_MS: RangeInclusive<u64> = 1..=300_000;

const ADAPTER_PARAMETERS: [&str; 4] = ["connect_timeout", "statement_timeout", "pool_max_conns", "schema"];

impl PostgresAdapter {
    /// Builds an adapter whose pool connects on first use.
    ///
    /// An unreachable server therefore surfaces from the first operation,
    /// normally [`test_connection`](crate::adapters::DatabaseAdapter::test_connection).
    ///
    /// # Errors
    /// `Configuration` when the URL or its adapter parameters are invalid
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_connection_config(connection_string)?;
        let pool = create_connection_pool(connection_string, &config)?;
        tracing::debug!("Created PostgreSQL pool for {}", config);
        Ok(Self { pool, config })
    }

    /// Like [`PostgresAdapter::new`] but with the caller's configuration.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let pool = create_connection_pool(connection_string, &config)?;
        Ok(Self { pool, config })
    }
}

fn parse_url(connection_string: &str) -> Result<Url> {
    let url = Url::parse(connection_string).map_err(|e| {
        AdminError::configuration(format!("Invalid PostgreSQL connection string format: {}", e))
    })?;

    if url.scheme() != "postgres" && url.scheme() != "postgresql" {
        return Err(AdminError::configuration(
            "Connection string must use postgres:// or postgresql:// scheme",
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AdminError::configuration("Connection string must specify a host"));
    }
    Ok(url)
}

/// Parses `value` and keeps it only when it falls inside `range`.
fn bounded<T: FromStr + PartialOrd>(value: &str, range: RangeInclusive<T>) -> Option<T> {
    value.parse().ok().filter(|parsed| range.contains(parsed))
}

fn checked_name(kind: &str, name: &str) -> Result<Option<String>> {
    match name.len() {
        0 => Ok(None),
        len if len > MAX_NAME_LEN => Err(AdminError::configuration(format!(
            "{} too long: maximum {} characters",
            kind, MAX_NAME_LEN
        ))),
        _ => Ok(Some(name.to_string())),
    }
}

/// Reads host, port, database, user and the adapter parameters from a URL.
///
/// # Errors
/// `Configuration` for a malformed URL, a foreign scheme, a missing host,
/// an overlong database or user name, or a configuration that fails
/// [`ConnectionConfig::validate`]
pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    validate_connection_string(connection_string)?;
    let url = parse_url(connection_string)?;

    let mut config = ConnectionConfig::new(url.host_str().unwrap_or("localhost"))
        .with_port(url.port().unwrap_or(DEFAULT_PORT));
    config.database = checked_name("Database name", url.path().trim_start_matches('/'))?;
    config.username = checked_name("Username", url.username())?;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "connect_timeout" => {
                if let Some(secs) = bounded(&value, CONNECT_TIMEOUT_SECS) {
                    config.connect_timeout = Duration::from_secs(secs);
                }
            }
            "statement_timeout" => {
                if let Some(ms) = bounded(&value, STATEMENT_TIMEOUT_MS) {
                    config.statement_timeout = Duration::from_millis(ms);
                }
            }
            "pool_max_conns" => {
                if let Some(max) = bounded(&value, 1..=MAX_POOL_SIZE) {
                    config.max_connections = max;
                }
            }
            "schema" if !value.is_empty() => config.schema = value.into_owned(),
            _ => {}
        }
    }

    config.validate()?;
    Ok(config)
}

/// Checks that `connection_string` is a usable PostgreSQL URL.
///
/// # Errors
/// `Configuration` for a malformed URL, a foreign scheme, a missing host or a
/// `statement_timeout` above five minutes
pub fn validate_connection_string(connection_string: &str) -> Result<()> {
    let url = parse_url(connection_string)?;

    let too_slow = url.query_pairs().any(|(key, value)| {
        key == "statement_timeout"
            && value
                .parse::<u64>()
                .is_ok_and(|ms| ms > *STATEMENT_TIMEOUT_MS.end())
    });
    if too_slow {
        return Err(AdminError::configuration(
            "statement_timeout should not exceed 300 seconds",
        ));
    }

    Ok(())
}

/// The URL with adapter parameters removed, as handed to the driver.
pub(crate) fn driver_connection_string(connection_string: &str) -> Result<String> {
    let mut url = parse_url(connection_string)?;

    let driver_pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !ADAPTER_PARAMETERS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_query(None);
    if !driver_pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(driver_pairs);
    }
    Ok(url.to_string())
}

/// Statements run on every new pooled connection before it is handed out.
fn session_statements(config: &ConnectionConfig) -> Result<Vec<String>> {
    Ok(vec![
        format!("SET statement_timeout = {}", config.statement_timeout.as_millis()),
        format!("SET search_path TO {}", quote_identifier(&config.schema)?),
        "SET timezone = 'UTC'".to_string(),
        format!("SET application_name = 'dbsteward-{}'", env!("CARGO_PKG_VERSION")),
    ])
}

async fn prepare_session(conn: &mut PgConnection, statements: &[String]) -> sqlx::Result<()> {
    for statement in statements {
        conn.execute(statement.as_str()).await?;
    }
    Ok(())
}

/// Builds a lazily connecting pool that applies the session settings.
pub(crate) fn create_connection_pool(connection_string: &str, config: &ConnectionConfig) -> Result<PgPool> {
    validate_connection_string(connection_string)?;
    let driver_url = driver_connection_string(connection_string)?;
    let statements = session_statements(config)?;

    PgPoolOptions::new()
        .max_connections(config.max_connections.min(MAX_POOL_SIZE))
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            let statements = statements.clone();
            Box::pin(async move { prepare_session(conn, &statements).await })
        })
        .connect_lazy(&driver_url)
        .map_err(|e| {
            AdminError::configuration(format!(
                "Failed to create PostgreSQL connection pool to {}: {}",
                redact_database_url(connection_string),
                e
            ))
        })
}
