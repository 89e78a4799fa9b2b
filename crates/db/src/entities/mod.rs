//! `SeaORM` entities for the ledger tables.

pub mod account_tags;
pub mod accounts;
pub mod currencies;
pub mod split_accounts;
pub mod splits;
pub mod transactions;
pub mod users;
