//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Submitted transactions are described, validated and broken down into the
//! entities they reference here; persistence lives in `tally-db`.
//!
//! # Modules
//!
//! - `ledger` - Double-entry transaction input, validation and entity derivation

pub mod ledger;
