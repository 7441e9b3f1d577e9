//! Logging setup shared by the binary and tests.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::Result;
use crate::error::AdminError;

/// Level selected by the `-v`/`-q` flags.
///
/// `quiet` beats any number of `-v`.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Directive string for the subscriber filter.
///
/// `RUST_LOG` (passed as `env`) replaces the flag level unless `quiet` is set.
fn filter_directives(verbose: u8, quiet: bool, env: Option<&str>) -> String {
    match env {
        Some(directives) if !quiet && !directives.trim().is_empty() => directives.to_string(),
        _ => level_for(verbose, quiet).to_string().to_lowercase(),
    }
}

/// Installs the global `tracing` subscriber writing to stderr.
///
/// stdout is left for command output.
///
/// # Example
/// ```rust,no_run
/// use dbsteward_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
///
/// # Errors
/// `Configuration` if `RUST_LOG` cannot be parsed or a subscriber is already set
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(filter_directives(verbose, quiet, env.as_deref()))
        .map_err(|e| AdminError::configuration(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AdminError::configuration(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let cases = [
            (0, true, Level::ERROR),
            (5, true, Level::ERROR),
            (0, false, Level::INFO),
            (1, false, Level::DEBUG),
            (2, false, Level::TRACE),
            (10, false, Level::TRACE),
        ];

        for (verbose, quiet, expected) in cases {
            assert_eq!(level_for(verbose, quiet), expected, "-v x{} quiet={}", verbose, quiet);
        }
    }

    #[test]
    fn test_rust_log_overrides_flags() {
        assert_eq!(filter_directives(0, false, None), "info");
        assert_eq!(filter_directives(2, false, Some("  ")), "trace");
        assert_eq!(
            filter_directives(0, false, Some("dbsteward_core=debug")),
            "dbsteward_core=debug"
        );
        assert_eq!(filter_directives(0, true, Some("debug")), "error");
    }
}
