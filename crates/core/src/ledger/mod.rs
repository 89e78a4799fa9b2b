//! Double-entry bookkeeping logic.
//!
//! This module implements the pure half of the commit pipeline:
//! - Domain types for transaction submission
//! - Structural and balance validation
//! - Derivation of the distinct users, currencies and accounts a
//!   transaction references
//! - Validation error types

pub mod error;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::ValidationError;
pub use service::LedgerService;
pub use types::{
    CurrencyInput, DEFAULT_ACCOUNT_TAG, DEFAULT_DECIMALS, ReferencedEntities, SplitInput,
    TransactionInput,
};
pub use validation::validate_transaction;
