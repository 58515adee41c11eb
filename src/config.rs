// ⚙️ Configuration - flags with environment fallbacks
//
// Shared by both binaries. Nothing here is a secret by default: when no
// session secret is configured the server generates one at startup.

use crate::db::StoreOptions;
use crate::logging::LogFormat;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "bank.db";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Store and logging settings every binary needs
#[derive(Args, Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file (created on first use)
    #[arg(long, env = "BANK_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// How long a write waits for the database lock, in milliseconds
    #[arg(long, env = "BANK_BUSY_TIMEOUT_MS", default_value_t = 5_000)]
    pub busy_timeout_ms: u64,

    /// Log output format
    #[arg(long, env = "BANK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "BANK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl StoreConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

/// Web server settings
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Address to listen on
    #[arg(long, env = "BANK_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Directory served under /static
    #[arg(long, env = "BANK_STATIC_DIR", default_value = DEFAULT_STATIC_DIR)]
    pub static_dir: PathBuf,

    /// Secret used to sign session cookies (random per process when unset)
    #[arg(long, env = "BANK_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime in seconds
    #[arg(long, env = "BANK_SESSION_TTL_SECS", default_value_t = crate::session::DEFAULT_SESSION_TTL_SECS)]
    pub session_ttl_secs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        server: ServerConfig,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["test"]);
        let config = cli.server;

        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.static_dir, PathBuf::from(DEFAULT_STATIC_DIR));
        assert_eq!(config.store.log_format, LogFormat::Pretty);
        assert_eq!(config.store.store_options().busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_flags_override() {
        let cli = TestCli::parse_from([
            "test",
            "--db",
            "/tmp/other.db",
            "--busy-timeout-ms",
            "250",
            "--log-format",
            "json",
            "--bind",
            "127.0.0.1:9000",
            "--session-secret",
            "s3cret",
        ]);
        let config = cli.server;

        assert_eq!(config.store.db, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.store.store_options().busy_timeout, Duration::from_millis(250));
        assert_eq!(config.store.log_format, LogFormat::Json);
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.session_secret.as_deref(), Some("s3cret"));
    }
}
