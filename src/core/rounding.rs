//! Rounding rules shared by conversion, valuation and tax computation.
//!
//! Every local-currency figure is an integer obtained with
//! round-half-away-from-zero: `2.5 -> 3`, `-2.5 -> -3`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// A computed amount that cannot be represented as local-currency units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("amount {0} exceeds the representable range of local-currency units")]
pub struct AmountOverflow(pub String);

/// Round to the nearest integer, halves away from zero.
pub fn round_half_away(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to `scale` decimal places, halves away from zero.
pub fn round_scaled(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Round and narrow to whole local-currency units.
pub fn to_local_units(value: Decimal) -> Result<i64, AmountOverflow> {
    round_half_away(value)
        .to_i64()
        .ok_or_else(|| AmountOverflow(value.to_string()))
}

/// `a * b`, reporting overflow instead of panicking.
pub fn checked_product(a: Decimal, b: Decimal) -> Result<Decimal, AmountOverflow> {
    a.checked_mul(b)
        .ok_or_else(|| AmountOverflow(format!("{a} * {b}")))
}

/// `a + b`, reporting overflow instead of panicking.
pub fn checked_total(a: Decimal, b: Decimal) -> Result<Decimal, AmountOverflow> {
    a.checked_add(b)
        .ok_or_else(|| AmountOverflow(format!("{a} + {b}")))
}

/// Sum of whole local-currency amounts, reporting overflow instead of
/// panicking.
pub fn checked_units_sum<I>(amounts: I) -> Result<i64, AmountOverflow>
where
    I: IntoIterator<Item = i64>,
{
    amounts.into_iter().try_fold(0i64, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| AmountOverflow(format!("{acc} + {amount}")))
    })
}
