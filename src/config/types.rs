//! Configuration types and CLI options.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{DB_PATH, ENRICHMENT_WORKERS, RETRY_BACKOFF, SHUTDOWN_GRACE};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Monitor configuration.
///
/// Doubles as the CLI definition for the binary; library callers construct it
/// programmatically and rely on `Default` for anything they don't care about.
#[derive(Debug, Clone, Parser)]
#[command(name = "domain_watch", version, about)]
pub struct Config {
    /// Query log to replay ("-" reads query names from stdin, one per line)
    pub file: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Database path (SQLite file holding the append-only event log)
    #[arg(long, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Maximum concurrent enrichment tasks
    #[arg(long, default_value_t = ENRICHMENT_WORKERS)]
    pub max_concurrency: usize,

    /// Skip WHOIS organization lookups (IP and safety checks still run)
    #[arg(long)]
    pub skip_whois: bool,

    /// Google Safe Browsing API key for reputation checks
    #[arg(long, env = "GOOGLE_SAFE_BROWSING_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Seconds to wait before retrying a failed safety check (retried once)
    #[arg(long, default_value_t = RETRY_BACKOFF.as_secs())]
    pub retry_backoff_seconds: u64,

    /// Grace period in seconds for in-flight enrichment during shutdown
    #[arg(long, default_value_t = SHUTDOWN_GRACE.as_secs())]
    pub shutdown_grace_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from("-"),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            max_concurrency: ENRICHMENT_WORKERS,
            skip_whois: false,
            api_key: None,
            retry_backoff_seconds: RETRY_BACKOFF.as_secs(),
            shutdown_grace_seconds: SHUTDOWN_GRACE.as_secs(),
        }
    }
}

impl Config {
    /// Fixed backoff before the single safety-check retry.
    pub fn retry_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retry_backoff_seconds)
    }

    /// Grace period for draining enrichment tasks on shutdown.
    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_grace_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.max_concurrency, ENRICHMENT_WORKERS);
        assert_eq!(config.db_path, PathBuf::from(DB_PATH));
        assert!(!config.skip_whois);
        assert!(config.api_key.is_none());
        assert_eq!(config.retry_backoff().as_secs(), 5);
    }

    #[test]
    fn test_cli_parsing_overrides() {
        let config = Config::parse_from([
            "domain_watch",
            "queries.log",
            "--db-path",
            "/tmp/test.db",
            "--max-concurrency",
            "2",
            "--skip-whois",
        ]);
        assert_eq!(config.file, PathBuf::from("queries.log"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.max_concurrency, 2);
        assert!(config.skip_whois);
    }
}
