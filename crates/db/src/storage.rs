//! Opening the ledger store.
//!
//! The backend comes from [`DatabaseConfig`]: an on-disk SQLite file under
//! `{data_dir}/ledgerdata`, a private in-memory SQLite database, or a
//! PostgreSQL URL. The schema is migrated before the connection is returned.

use std::path::PathBuf;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tally_shared::config::{DatabaseBackend, DatabaseConfig};
use tracing::{info, warn};

use crate::migration::Migrator;

/// Directory below `data_dir` holding the SQLite file.
pub const LEDGER_DIR: &str = "ledgerdata";

/// SQLite file name.
pub const LEDGER_FILE: &str = "ledger.db";

/// URL of a private in-memory SQLite database.
const MEMORY_URL: &str = "sqlite::memory:";

/// Pool connections of an SQLite store never expire; an in-memory database
/// lives exactly as long as its one connection.
const SQLITE_CONNECTION_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Error types for opening the store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem error while preparing the data directory.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PostgreSQL backend selected without a URL.
    #[error("database.url is required for the postgres backend")]
    MissingUrl,

    /// Database error while connecting or migrating.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Path of the SQLite file for a data directory.
#[must_use]
pub fn ledger_path(config: &DatabaseConfig) -> PathBuf {
    config.data_dir.join(LEDGER_DIR).join(LEDGER_FILE)
}

/// Opens the configured store and applies pending migrations.
///
/// With `clear_on_start`, the SQLite data directory is removed (or, for
/// PostgreSQL, every table is dropped) before the schema is created.
///
/// # Errors
///
/// Returns an error if the data directory cannot be prepared, the database
/// is unreachable, or a migration fails.
pub async fn open(config: &DatabaseConfig) -> Result<DatabaseConnection, StorageError> {
    let db = match config.backend {
        DatabaseBackend::Sqlite => {
            let dir = config.data_dir.join(LEDGER_DIR);
            if config.clear_on_start && dir.exists() {
                warn!(path = %dir.display(), "Clearing ledger data directory");
                std::fs::remove_dir_all(&dir)?;
            }
            std::fs::create_dir_all(&dir)?;

            let url = format!("sqlite://{}?mode=rwc", ledger_path(config).display());
            Database::connect(sqlite_options(url)).await?
        }
        DatabaseBackend::Memory => Database::connect(sqlite_options(MEMORY_URL.to_string())).await?,
        DatabaseBackend::Postgres => {
            let url = config.url.clone().ok_or(StorageError::MissingUrl)?;
            let mut options = ConnectOptions::new(url);
            options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .sqlx_logging(false);
            let db = Database::connect(options).await?;
            if config.clear_on_start {
                warn!("Dropping all ledger tables");
                Migrator::fresh(&db).await?;
            }
            db
        }
    };

    Migrator::up(&db, None).await?;
    info!(backend = ?config.backend, "Ledger store ready");
    Ok(db)
}

/// SQLite serializes writers, so the pool holds a single long-lived
/// connection.
fn sqlite_options(url: String) -> ConnectOptions {
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(SQLITE_CONNECTION_LIFETIME)
        .max_lifetime(SQLITE_CONNECTION_LIFETIME)
        .sqlx_logging(false);
    options
}
