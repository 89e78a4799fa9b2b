//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod registry;
pub mod transaction;

pub use registry::{EntityRegistry, RegistryError};
pub use transaction::{
    CommittedTransaction, DeletePolicy, SplitView, TransactionError, TransactionRepository,
    TransactionView,
};
