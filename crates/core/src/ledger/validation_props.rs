//! Property-based tests for transaction validation.
//!
//! Balanced transactions are generated by pairing every debit with an
//! equal credit; the properties then check acceptance, rejection of any
//! perturbation, and precision handling.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::ValidationError;
use super::service::LedgerService;
use super::types::{CurrencyInput, SplitInput, TransactionInput};
use super::validation::validate_transaction;

/// Strategy to generate a non-zero amount with two decimal places.
fn cents_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate currency codes.
fn currency_code() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("USD".to_string()),
        Just("EUR".to_string()),
        Just("GBP".to_string()),
    ]
}

fn make_split(index: usize, currency: &str, account: &str, amount: Decimal) -> SplitInput {
    SplitInput {
        id: format!("S{index}"),
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        description: String::new(),
        currency: CurrencyInput::new(currency, 2),
        accounts: vec![account.to_string()],
        amount,
    }
}

/// Builds a balanced transaction: each (currency, amount) pair becomes a
/// debit on 1000 and a matching credit on 2000.
fn balanced(legs: &[(String, Decimal)]) -> TransactionInput {
    let mut splits = Vec::with_capacity(legs.len() * 2);
    for (currency, amount) in legs {
        splits.push(make_split(splits.len(), currency, "1000", *amount));
        splits.push(make_split(splits.len(), currency, "2000", -*amount));
    }
    TransactionInput {
        id: "T1".to_string(),
        postdate: NaiveDate::from_ymd_opt(2024, 1, 1),
        description: String::new(),
        poster: "alice".to_string(),
        splits,
    }
}

fn legs() -> impl Strategy<Value = Vec<(String, Decimal)>> {
    prop::collection::vec((currency_code(), cents_amount()), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* set of matched debit/credit pairs, validation SHALL succeed.
    #[test]
    fn prop_balanced_transactions_accepted(legs in legs()) {
        let tx = balanced(&legs);
        prop_assert!(validate_transaction(&tx).is_ok());
    }

    /// *For any* balanced transaction, nudging one amount SHALL make its
    /// currency unbalanced by exactly the nudge.
    #[test]
    fn prop_perturbed_transactions_rejected(
        legs in legs(),
        nudge in cents_amount(),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut tx = balanced(&legs);
        let index = pick.index(tx.splits.len());
        tx.splits[index].amount += nudge;
        let currency = tx.splits[index].currency.name.clone();

        match validate_transaction(&tx) {
            Err(ValidationError::Unbalanced { currency: c, sum }) => {
                prop_assert_eq!(c, currency);
                prop_assert_eq!(sum, nudge);
            }
            other => prop_assert!(false, "expected Unbalanced, got {:?}", other),
        }
    }

    /// *For any* amount with a sub-cent remainder, a two-decimal currency
    /// SHALL reject it even when the transaction balances.
    #[test]
    fn prop_excess_precision_rejected(cents in 1i64..1_000_000i64, mills in 1i64..10i64) {
        let amount = Decimal::new(cents * 10 + mills, 3);
        let tx = balanced(&[("USD".to_string(), amount)]);
        let rejected = matches!(
            validate_transaction(&tx),
            Err(ValidationError::PrecisionExceeded { split: 0, .. })
        );
        prop_assert!(rejected);
    }

    /// *For any* transaction, derived accounts and currencies SHALL be
    /// distinct.
    #[test]
    fn prop_referenced_entities_distinct(legs in legs()) {
        let refs = LedgerService::referenced_entities(&balanced(&legs));
        prop_assert_eq!(refs.accounts.len(), 2);
        let mut names: Vec<_> = refs.currencies.iter().map(|c| c.name.clone()).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        prop_assert_eq!(names.len(), before);
    }
}
