//! Ledger validation errors.
//!
//! Each variant corresponds to one validation rule and, where it applies,
//! names the zero-based index of the split that failed it.

use rust_decimal::Decimal;
use tally_shared::types::MoneyError;
use thiserror::Error;

/// Reasons a submitted transaction is rejected before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // ========== Rule 1: header ==========
    /// Transaction identifier is empty.
    #[error("Transaction identifier is required")]
    MissingTransactionId,

    /// Post date is missing.
    #[error("Transaction post date is required")]
    MissingPostDate,

    /// Poster username is empty.
    #[error("Transaction poster is required")]
    MissingPoster,

    // ========== Rule 2: splits present ==========
    /// Transaction has no splits.
    #[error("Transaction must have at least one split")]
    NoSplits,

    // ========== Rule 3: split structure ==========
    /// Split identifier is empty.
    #[error("Split {split} has no identifier")]
    MissingSplitId {
        /// Index of the split.
        split: usize,
    },

    /// Split identifier repeats within the transaction.
    #[error("Split {split} reuses identifier '{id}'")]
    DuplicateSplitId {
        /// Index of the split.
        split: usize,
        /// The repeated identifier.
        id: String,
    },

    /// Split does not name a currency.
    #[error("Split {split} must reference exactly one currency")]
    MissingCurrency {
        /// Index of the split.
        split: usize,
    },

    /// Split names no account.
    #[error("Split {split} must reference at least one account")]
    NoAccounts {
        /// Index of the split.
        split: usize,
    },

    /// Split names an empty account code.
    #[error("Split {split} references an empty account code")]
    EmptyAccountCode {
        /// Index of the split.
        split: usize,
    },

    /// Split names an account code with surrounding whitespace.
    #[error("Split {split} references account '{account}' with surrounding whitespace")]
    PaddedAccountCode {
        /// Index of the split.
        split: usize,
        /// The padded account code.
        account: String,
    },

    /// Split names the same account twice.
    #[error("Split {split} references account '{account}' more than once")]
    DuplicateAccount {
        /// Index of the split.
        split: usize,
        /// The repeated account code.
        account: String,
    },

    /// Currency precision outside the supported range.
    #[error("Split {split}: currency {currency} declares unsupported precision {decimals}")]
    InvalidPrecision {
        /// Index of the split.
        split: usize,
        /// Currency name.
        currency: String,
        /// Declared precision.
        decimals: u32,
    },

    // ========== Rule 4: balance ==========
    /// Amount has more fractional digits than its currency allows.
    #[error("Split {split}: amount {amount} exceeds the {decimals} decimal places of {currency}")]
    PrecisionExceeded {
        /// Index of the split.
        split: usize,
        /// Currency name.
        currency: String,
        /// The offending amount.
        amount: Decimal,
        /// Precision of the currency.
        decimals: u32,
    },

    /// Amount cannot be stored.
    #[error("Split {split}: amount {amount} is out of range")]
    AmountOutOfRange {
        /// Index of the split.
        split: usize,
        /// The offending amount.
        amount: Decimal,
    },

    /// Signed amounts of a currency do not sum to zero.
    #[error("Transaction is not balanced in {currency}: splits sum to {sum}")]
    Unbalanced {
        /// Currency name.
        currency: String,
        /// Sum of the signed amounts.
        sum: Decimal,
    },
}

impl ValidationError {
    /// Builds the error for an amount of split `split` that failed minor-unit conversion.
    #[must_use]
    pub fn from_money(split: usize, currency: &str, err: MoneyError) -> Self {
        match err {
            MoneyError::PrecisionExceeded { amount, decimals } => Self::PrecisionExceeded {
                split,
                currency: currency.to_string(),
                amount,
                decimals,
            },
            MoneyError::PrecisionTooLarge(decimals) => Self::InvalidPrecision {
                split,
                currency: currency.to_string(),
                decimals,
            },
            MoneyError::OutOfRange(amount) => Self::AmountOutOfRange { split, amount },
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingTransactionId => "MISSING_TRANSACTION_ID",
            Self::MissingPostDate => "MISSING_POST_DATE",
            Self::MissingPoster => "MISSING_POSTER",
            Self::NoSplits => "NO_SPLITS",
            Self::MissingSplitId { .. } => "MISSING_SPLIT_ID",
            Self::DuplicateSplitId { .. } => "DUPLICATE_SPLIT_ID",
            Self::MissingCurrency { .. } => "MISSING_CURRENCY",
            Self::NoAccounts { .. } => "NO_ACCOUNTS",
            Self::EmptyAccountCode { .. } => "EMPTY_ACCOUNT_CODE",
            Self::PaddedAccountCode { .. } => "PADDED_ACCOUNT_CODE",
            Self::DuplicateAccount { .. } => "DUPLICATE_ACCOUNT",
            Self::InvalidPrecision { .. } => "INVALID_PRECISION",
            Self::PrecisionExceeded { .. } => "PRECISION_EXCEEDED",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::Unbalanced { .. } => "UNBALANCED_TRANSACTION",
        }
    }

    /// Returns the number of the validation rule that failed (1 to 4).
    #[must_use]
    pub fn rule(&self) -> u8 {
        match self {
            Self::MissingTransactionId | Self::MissingPostDate | Self::MissingPoster => 1,
            Self::NoSplits => 2,
            Self::MissingSplitId { .. }
            | Self::DuplicateSplitId { .. }
            | Self::MissingCurrency { .. }
            | Self::NoAccounts { .. }
            | Self::EmptyAccountCode { .. }
            | Self::PaddedAccountCode { .. }
            | Self::DuplicateAccount { .. }
            | Self::InvalidPrecision { .. } => 3,
            Self::PrecisionExceeded { .. }
            | Self::AmountOutOfRange { .. }
            | Self::Unbalanced { .. } => 4,
        }
    }

    /// Returns the index of the failing split, if the failure is tied to one.
    #[must_use]
    pub fn split_index(&self) -> Option<usize> {
        match self {
            Self::MissingSplitId { split }
            | Self::DuplicateSplitId { split, .. }
            | Self::MissingCurrency { split }
            | Self::NoAccounts { split }
            | Self::EmptyAccountCode { split }
            | Self::PaddedAccountCode { split, .. }
            | Self::DuplicateAccount { split, .. }
            | Self::InvalidPrecision { split, .. }
            | Self::PrecisionExceeded { split, .. }
            | Self::AmountOutOfRange { split, .. } => Some(*split),
            Self::MissingTransactionId
            | Self::MissingPostDate
            | Self::MissingPoster
            | Self::NoSplits
            | Self::Unbalanced { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_error_codes() {
        assert_eq!(ValidationError::NoSplits.error_code(), "NO_SPLITS");
        assert_eq!(
            ValidationError::Unbalanced {
                currency: "USD".to_string(),
                sum: Decimal::new(100, 2),
            }
            .error_code(),
            "UNBALANCED_TRANSACTION"
        );
        assert_eq!(
            ValidationError::NoAccounts { split: 0 }.error_code(),
            "NO_ACCOUNTS"
        );
    }

    #[rstest]
    #[case::header(ValidationError::MissingPostDate, 1)]
    #[case::no_splits(ValidationError::NoSplits, 2)]
    #[case::structure(ValidationError::MissingCurrency { split: 3 }, 3)]
    #[case::padded_account(ValidationError::PaddedAccountCode { split: 0, account: " 1000".to_string() }, 3)]
    #[case::duplicate_split(ValidationError::DuplicateSplitId { split: 1, id: "S1".to_string() }, 3)]
    #[case::precision(ValidationError::PrecisionExceeded {
        split: 0,
        currency: "JPY".to_string(),
        amount: Decimal::new(15, 1),
        decimals: 0,
    }, 4)]
    #[case::balance(ValidationError::Unbalanced { currency: "EUR".to_string(), sum: Decimal::ONE }, 4)]
    fn test_rules(#[case] err: ValidationError, #[case] rule: u8) {
        assert_eq!(err.rule(), rule);
    }

    #[test]
    fn test_split_index() {
        assert_eq!(
            ValidationError::NoAccounts { split: 2 }.split_index(),
            Some(2)
        );
        assert_eq!(ValidationError::MissingTransactionId.split_index(), None);
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::Unbalanced {
            currency: "USD".to_string(),
            sum: Decimal::new(-2550, 2),
        };
        assert_eq!(
            err.to_string(),
            "Transaction is not balanced in USD: splits sum to -25.50"
        );

        let err = ValidationError::PrecisionExceeded {
            split: 1,
            currency: "JPY".to_string(),
            amount: Decimal::new(15, 1),
            decimals: 0,
        };
        assert_eq!(
            err.to_string(),
            "Split 1: amount 1.5 exceeds the 0 decimal places of JPY"
        );
    }
}
