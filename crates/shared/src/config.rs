//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Ledger behaviour switches.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    50051
}

/// Storage engine selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// SQLite file under the data directory.
    #[default]
    Sqlite,
    /// SQLite in-memory database, gone when the process exits.
    Memory,
    /// PostgreSQL reached through `database.url`.
    Postgres,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Which storage engine to open.
    #[serde(default)]
    pub backend: DatabaseBackend,
    /// Directory holding the SQLite ledger file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Connection URL, required for the postgres backend.
    #[serde(default)]
    pub url: Option<String>,
    /// Remove the stored ledger before opening it.
    #[serde(default)]
    pub clear_on_start: bool,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl DatabaseConfig {
    /// Configuration for a throwaway in-memory ledger.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: DatabaseBackend::Memory,
            ..Self::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            data_dir: default_data_dir(),
            url: None,
            clear_on_start: false,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".tally")
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger behaviour switches.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Deleting an unknown transaction fails with not-found when set,
    /// otherwise it succeeds without touching storage.
    #[serde(default = "default_strict_delete")]
    pub strict_delete: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            strict_delete: default_strict_delete(),
        }
    }
}

fn default_strict_delete() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of the human readable format.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
