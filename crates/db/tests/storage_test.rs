//! Store bootstrap tests for the on-disk SQLite backend.

mod common;

use rust_decimal_macros::dec;
use tally_db::storage::ledger_path;
use tally_db::{StorageError, TransactionRepository};
use tally_shared::config::{DatabaseBackend, DatabaseConfig};

use common::transfer;

fn file_config(dir: &tempfile::TempDir, clear_on_start: bool) -> DatabaseConfig {
    DatabaseConfig {
        backend: DatabaseBackend::Sqlite,
        data_dir: dir.path().to_path_buf(),
        clear_on_start,
        ..DatabaseConfig::default()
    }
}

#[tokio::test]
async fn test_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let db = tally_db::open(&file_config(&dir, false)).await.unwrap();
    TransactionRepository::new(db.clone())
        .commit(&transfer("T1", "alice", "1000", "2000", dec!(10)))
        .await
        .unwrap();
    db.close().await.unwrap();

    assert!(ledger_path(&file_config(&dir, false)).exists());

    let db = tally_db::open(&file_config(&dir, false)).await.unwrap();
    let view = TransactionRepository::new(db).get("T1").await.unwrap();
    assert_eq!(view.splits.len(), 2);
}

#[tokio::test]
async fn test_clear_on_start_wipes_ledger() {
    let dir = tempfile::tempdir().unwrap();

    let db = tally_db::open(&file_config(&dir, false)).await.unwrap();
    TransactionRepository::new(db.clone())
        .commit(&transfer("T1", "alice", "1000", "2000", dec!(10)))
        .await
        .unwrap();
    db.close().await.unwrap();

    let db = tally_db::open(&file_config(&dir, true)).await.unwrap();
    let repo = TransactionRepository::new(db);
    assert!(repo.get("T1").await.is_err());
    assert!(repo.registry().find_user("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_postgres_requires_url() {
    let config = DatabaseConfig {
        backend: DatabaseBackend::Postgres,
        url: None,
        ..DatabaseConfig::default()
    };
    assert!(matches!(
        tally_db::open(&config).await,
        Err(StorageError::MissingUrl)
    ));
}
