//! Conversion between decimal amounts and integer minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts travel as `rust_decimal::Decimal` and are stored as `i64`
//! scaled by `10^decimals` of their currency.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Largest currency precision whose minor units always fit an `i64`.
pub const MAX_DECIMALS: u32 = 18;

/// Errors raised while converting amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Currency precision is above [`MAX_DECIMALS`].
    #[error("Precision {0} exceeds the supported maximum of {MAX_DECIMALS} decimals")]
    PrecisionTooLarge(u32),

    /// Amount carries more fractional digits than its currency allows.
    #[error("Amount {amount} has more than {decimals} decimal places")]
    PrecisionExceeded {
        /// The offending amount.
        amount: Decimal,
        /// Precision of the currency.
        decimals: u32,
    },

    /// Amount does not fit into 64-bit minor units.
    #[error("Amount {0} is out of range")]
    OutOfRange(Decimal),
}

/// Returns true if `amount` has no more than `decimals` significant fractional digits.
#[must_use]
pub fn is_representable(amount: Decimal, decimals: u32) -> bool {
    amount.normalize().scale() <= decimals
}

/// Converts `amount` to minor units of a currency with `decimals` precision.
///
/// `12.34` at precision 2 becomes `1234`. Trailing zeros do not count
/// against the precision, so `5.10` is valid at precision 1.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> Result<i64, MoneyError> {
    if decimals > MAX_DECIMALS {
        return Err(MoneyError::PrecisionTooLarge(decimals));
    }
    if !is_representable(amount, decimals) {
        return Err(MoneyError::PrecisionExceeded { amount, decimals });
    }

    let factor = Decimal::from(10_i64.pow(decimals));
    amount
        .checked_mul(factor)
        .and_then(|scaled| scaled.to_i64())
        .ok_or(MoneyError::OutOfRange(amount))
}

/// Converts stored minor units back into a decimal amount.
pub fn from_minor_units(minor: i64, decimals: u32) -> Result<Decimal, MoneyError> {
    if decimals > MAX_DECIMALS {
        return Err(MoneyError::PrecisionTooLarge(decimals));
    }
    Decimal::try_new(minor, decimals).map_err(|_| MoneyError::PrecisionTooLarge(decimals))
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
