//! Business rule validation for submitted transactions.
//!
//! Rules are checked in order and the first failure is returned:
//! 1. header fields present
//! 2. at least one split
//! 3. each split well formed (one currency, one or more accounts)
//! 4. per currency, the signed amounts sum to zero at the currency's precision

use std::collections::HashSet;

use rust_decimal::Decimal;
use tally_shared::types::{MAX_DECIMALS, to_minor_units};

use super::error::ValidationError;
use super::types::{SplitInput, TransactionInput};

/// Validates a transaction before anything is persisted.
///
/// # Errors
///
/// Returns the first rule the transaction breaks.
pub fn validate_transaction(tx: &TransactionInput) -> Result<(), ValidationError> {
    validate_header(tx)?;

    if tx.splits.is_empty() {
        return Err(ValidationError::NoSplits);
    }

    let mut split_ids = HashSet::with_capacity(tx.splits.len());
    for (index, split) in tx.splits.iter().enumerate() {
        validate_split(index, split)?;
        if !split_ids.insert(split.id.as_str()) {
            return Err(ValidationError::DuplicateSplitId {
                split: index,
                id: split.id.clone(),
            });
        }
    }

    validate_balance(&tx.splits)
}

fn validate_header(tx: &TransactionInput) -> Result<(), ValidationError> {
    if tx.id.trim().is_empty() {
        return Err(ValidationError::MissingTransactionId);
    }
    if tx.postdate.is_none() {
        return Err(ValidationError::MissingPostDate);
    }
    if tx.poster.trim().is_empty() {
        return Err(ValidationError::MissingPoster);
    }
    Ok(())
}

fn validate_split(index: usize, split: &SplitInput) -> Result<(), ValidationError> {
    if split.id.trim().is_empty() {
        return Err(ValidationError::MissingSplitId { split: index });
    }
    if split.currency.name.trim().is_empty() {
        return Err(ValidationError::MissingCurrency { split: index });
    }
    if split.currency.decimals > MAX_DECIMALS {
        return Err(ValidationError::InvalidPrecision {
            split: index,
            currency: split.currency.name.clone(),
            decimals: split.currency.decimals,
        });
    }
    if split.accounts.is_empty() {
        return Err(ValidationError::NoAccounts { split: index });
    }

    let mut seen = HashSet::with_capacity(split.accounts.len());
    for account in &split.accounts {
        if account.trim().is_empty() {
            return Err(ValidationError::EmptyAccountCode { split: index });
        }
        if account.trim() != account {
            return Err(ValidationError::PaddedAccountCode {
                split: index,
                account: account.clone(),
            });
        }
        if !seen.insert(account.as_str()) {
            return Err(ValidationError::DuplicateAccount {
                split: index,
                account: account.clone(),
            });
        }
    }
    Ok(())
}

/// Running total for one currency; the precision is the one declared first.
struct CurrencyTotal<'a> {
    name: &'a str,
    decimals: u32,
    sum: Decimal,
}

fn validate_balance(splits: &[SplitInput]) -> Result<(), ValidationError> {
    let mut totals: Vec<CurrencyTotal<'_>> = Vec::new();

    for (index, split) in splits.iter().enumerate() {
        let name = split.currency.name.as_str();
        let position = match totals.iter().position(|t| t.name == name) {
            Some(position) => position,
            None => {
                totals.push(CurrencyTotal {
                    name,
                    decimals: split.currency.decimals,
                    sum: Decimal::ZERO,
                });
                totals.len() - 1
            }
        };
        let total = &mut totals[position];

        to_minor_units(split.amount, total.decimals)
            .map_err(|err| ValidationError::from_money(index, name, err))?;

        total.sum = total
            .sum
            .checked_add(split.amount)
            .ok_or(ValidationError::AmountOutOfRange {
                split: index,
                amount: split.amount,
            })?;
    }

    match totals.into_iter().find(|t| !t.sum.is_zero()) {
        Some(total) => Err(ValidationError::Unbalanced {
            currency: total.name.to_string(),
            sum: total.sum,
        }),
        None => Ok(()),
    }
}
