//! Ledger domain types for transaction submission.
//!
//! These are the parsed shapes the transport hands to the commit pipeline.
//! They carry natural keys only (usernames, currency names, account codes);
//! surrogate identifiers are assigned by the storage layer.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Tag attached to every account the ledger creates.
pub const DEFAULT_ACCOUNT_TAG: &str = "main";

/// Currency precision assumed when a request does not declare one.
pub const DEFAULT_DECIMALS: u32 = 2;

/// Currency reference carried by a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyInput {
    /// Currency name, e.g. an ISO 4217 code.
    pub name: String,
    /// Number of decimal places the currency uses.
    pub decimals: u32,
}

impl CurrencyInput {
    /// Creates a currency reference.
    pub fn new(name: impl Into<String>, decimals: u32) -> Self {
        Self {
            name: name.into(),
            decimals,
        }
    }
}

/// One line item of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInput {
    /// Split identifier, unique across the ledger.
    pub id: String,
    /// Date of the line item.
    pub date: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// The single currency this split moves.
    pub currency: CurrencyInput,
    /// Codes of the accounts the amount moves through (at least one).
    pub accounts: Vec<String>,
    /// Signed amount; debits positive, credits negative.
    pub amount: Decimal,
}

/// A transaction as submitted by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInput {
    /// Transaction identifier, unique across the ledger.
    pub id: String,
    /// Post date; required, kept optional so a missing date is reported as a
    /// validation failure instead of a parse failure.
    pub postdate: Option<NaiveDate>,
    /// Free-text description.
    pub description: String,
    /// Username of the poster.
    pub poster: String,
    /// Ordered line items.
    pub splits: Vec<SplitInput>,
}

/// Distinct entities referenced by one transaction, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedEntities {
    /// Username of the poster.
    pub poster: String,
    /// Currencies, each with the precision declared on its first appearance.
    pub currencies: Vec<CurrencyInput>,
    /// Account codes.
    pub accounts: Vec<String>,
}
