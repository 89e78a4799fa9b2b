//! Fixtures shared by the storage integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tally_core::ledger::{CurrencyInput, SplitInput, TransactionInput};
use tally_shared::config::DatabaseConfig;

/// Opens a fresh, migrated in-memory ledger.
pub async fn memory_db() -> DatabaseConnection {
    tally_db::open(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory ledger should open")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn split(
    id: &str,
    currency: (&str, u32),
    accounts: &[&str],
    amount: Decimal,
) -> SplitInput {
    SplitInput {
        id: id.to_string(),
        date: date(2024, 1, 15),
        description: format!("split {id}"),
        currency: CurrencyInput::new(currency.0, currency.1),
        accounts: accounts.iter().map(ToString::to_string).collect(),
        amount,
    }
}

pub fn transaction(id: &str, poster: &str, splits: Vec<SplitInput>) -> TransactionInput {
    TransactionInput {
        id: id.to_string(),
        postdate: Some(date(2024, 1, 15)),
        description: format!("transaction {id}"),
        poster: poster.to_string(),
        splits,
    }
}

/// A two-split USD transfer from `credit` to `debit`.
pub fn transfer(id: &str, poster: &str, debit: &str, credit: &str, amount: Decimal) -> TransactionInput {
    transaction(
        id,
        poster,
        vec![
            split(&format!("{id}-1"), ("USD", 2), &[debit], amount),
            split(&format!("{id}-2"), ("USD", 2), &[credit], -amount),
        ],
    )
}
