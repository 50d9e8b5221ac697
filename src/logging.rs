use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::{GeneratorError, Result};

/// Initializes the application's logging system with the specified log level
///
/// `RUST_LOG` takes precedence over `log_level` when it is set. Output goes
/// to stderr so generated documents can be piped from stdout.
/// Valid log levels are: error, warn, info, debug, trace
pub fn init(log_level: &str) -> Result<()> {
    let level = parse_log_level(log_level).as_str().to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("readmegen={level},tower_http={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| GeneratorError::Config(format!("Failed to initialize logging: {}", e)))
}

/// Parses a log level string, defaulting to `INFO` for unknown values
pub fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}
