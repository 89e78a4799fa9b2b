//! Common types used across the application.

pub mod money;

pub use money::{MAX_DECIMALS, MoneyError, from_minor_units, to_minor_units};
