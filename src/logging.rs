//! Structured logging.
//!
//! Installs the `tracing` subscriber with pretty or JSON output and
//! `RUST_LOG` filtering. Everything goes to stderr so stdout stays clean
//! for CLI output such as CSV exports.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable output for local runs
    Pretty,
    /// JSON lines for log aggregation
    Json,
}

/// Initialize the global subscriber. Call once, early in `main()`.
///
/// `RUST_LOG` overrides `default_level` when set, e.g.
/// `RUST_LOG=bankapp=debug,tower_http=info`.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init(),
    };

    // A second init (tests, embedding) keeps the first subscriber
    if result.is_ok() {
        tracing::debug!(?format, "logging initialized");
    }
}
