//! Money rounding rules.
//!
//! Every monetary value in the ledger is a [`Decimal`] with two fractional
//! digits. Each computed field is rounded individually (round half up) so
//! totals never drift from what was persisted.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Smallest representable currency unit; loan invariants are checked to
/// within one of these.
pub const CENT: Decimal = dec!(0.01);

/// Round to two decimal places, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
