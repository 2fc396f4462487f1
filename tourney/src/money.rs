//! Conversion between external decimal amounts and stored minor units.
//!
//! Balances, deposits and prize pools are stored as integer minor units
//! (hundredths). Callers pass and receive decimal major units.
//!
//! - Inbound amounts are rounded half-to-even to two decimal places.
//! - Outbound amounts are exact: `5` minor units is `0.05`.

use crate::errors::{TourneyError, TourneyResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Minor units per major unit
pub const SCALE: i64 = 100;

/// Decimal places represented by [`SCALE`]
pub const SCALE_DIGITS: u32 = 2;

/// Convert a major-unit amount to minor units.
///
/// # Errors
///
/// * `TourneyError::InvalidAmount` - negative, or too large for `i64` minor units
pub fn to_minor(major: Decimal) -> TourneyResult<i64> {
    let rounded =
        major.round_dp_with_strategy(SCALE_DIGITS, RoundingStrategy::MidpointNearestEven);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        return Err(TourneyError::InvalidAmount(format!(
            "{major} is negative"
        )));
    }

    rounded
        .checked_mul(Decimal::from(SCALE))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| TourneyError::InvalidAmount(format!("{major} is out of range")))
}

/// Convert minor units to an exact major-unit amount.
pub fn to_major(minor: i64) -> Decimal {
    Decimal::new(minor, SCALE_DIGITS)
}
