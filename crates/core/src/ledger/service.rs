//! Ledger service for transaction validation and entity derivation.
//!
//! This module provides the pure steps of the commit pipeline that run
//! before any storage is touched.

use super::error::ValidationError;
use super::types::{CurrencyInput, ReferencedEntities, TransactionInput};
use super::validation::validate_transaction;

/// Ledger service for transaction validation and entity derivation.
///
/// This service contains pure business logic with no database dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Validates a transaction and returns the entities it references.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any rule fails.
    pub fn prepare(tx: &TransactionInput) -> Result<ReferencedEntities, ValidationError> {
        validate_transaction(tx)?;
        Ok(Self::referenced_entities(tx))
    }

    /// Collects the distinct poster, currencies and accounts of a transaction.
    ///
    /// Each natural key appears once, in order of first appearance. A
    /// currency keeps the precision declared by the first split naming it.
    #[must_use]
    pub fn referenced_entities(tx: &TransactionInput) -> ReferencedEntities {
        let mut currencies: Vec<CurrencyInput> = Vec::new();
        let mut accounts: Vec<String> = Vec::new();

        for split in &tx.splits {
            if !currencies.iter().any(|c| c.name == split.currency.name) {
                currencies.push(split.currency.clone());
            }
            for account in &split.accounts {
                if !accounts.contains(account) {
                    accounts.push(account.clone());
                }
            }
        }

        ReferencedEntities {
            poster: tx.poster.clone(),
            currencies,
            accounts,
        }
    }
}
