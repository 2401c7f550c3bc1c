//! Server configuration from flags and environment.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Pivot association admin server.
#[derive(Debug, Clone, Parser)]
#[command(name = "pivot_server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// SQLite database file; in-memory when absent
    #[arg(long, env = "PIVOT_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "PIVOT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Model metadata JSON file
    #[arg(long, env = "PIVOT_METADATA")]
    pub metadata: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "PIVOT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute log directory; file logging is off when absent
    #[arg(long, env = "PIVOT_LOG_DIR")]
    pub log_dir: Option<String>,
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or(pivot_core::default_log_level())
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use clap::Parser;

    #[test]
    fn defaults_bind_to_localhost_and_memory_db() {
        let config = Config::try_parse_from(["pivot_server"]).unwrap();
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
        assert!(config.db_path.is_none());
        assert_eq!(config.log_level(), pivot_core::default_log_level());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "pivot_server",
            "--db-path",
            "/tmp/pivot.db",
            "--bind",
            "0.0.0.0:9000",
            "--log-level",
            "warn",
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.log_level(), "warn");
        assert!(config.db_path.is_some());
    }
}
