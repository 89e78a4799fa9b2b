//! Ledger storage with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the ledger tables
//! - The embedded schema migration
//! - The entity registry and the transaction commit coordinator

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod storage;

pub use repositories::{
    CommittedTransaction, DeletePolicy, EntityRegistry, RegistryError, SplitView,
    TransactionError, TransactionRepository, TransactionView,
};
pub use storage::{StorageError, open};
