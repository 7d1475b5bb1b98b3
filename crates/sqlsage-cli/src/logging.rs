//! Logging setup for the command-line shell
//!
//! Reports go to stdout, so every log line is written to stderr. `RUST_LOG`
//! takes precedence over the filter derived from the command-line flags.

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,

    /// Whether to include file/line information in logs
    pub include_location: bool,

    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn".to_string(),
            include_location: false,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Quiet by default; `--verbose` turns on the engine's debug events
    pub fn for_verbosity(verbose: bool) -> Self {
        let default_filter = if verbose {
            "info,sqlsage=debug,sqlsage_core=debug,sqlsage_schema=debug,sqlsage_query=debug,sqlsage_analyzer=debug"
        } else {
            "warn"
        };
        Self {
            default_filter: default_filter.to_string(),
            include_location: verbose && cfg!(debug_assertions),
            ..Self::default()
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let layer = if config.json {
        fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_ansi(false)
            .json()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).try_init()?;

    tracing::debug!(
        filter = %config.default_filter,
        json = config.json,
        "Logging initialized"
    );

    Ok(())
}
