//! Fixed-point price and size representation.
//!
//! Exchange payloads carry prices and sizes as decimal strings. Both are
//! stored as `i64` values scaled by [`FIXED_SCALE`]; the same scale is
//! applied to prices and sizes so a single parse path serves both.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Fixed-point price.
pub type Px = i64;

/// Fixed-point size.
pub type Sz = i64;

/// Scale applied to decimal strings: 10^8.
pub const FIXED_SCALE: i64 = 100_000_000;

/// Parses a decimal string into a scaled fixed-point value.
///
/// The string is decoded as an exact decimal, multiplied by
/// [`FIXED_SCALE`] and rounded to the nearest integer (midpoints away
/// from zero). Returns `None` when the string is not a decimal or the
/// scaled value overflows `i64`.
pub fn parse_fixed(s: &str) -> Option<i64> {
    let value = Decimal::from_str(s).ok()?;
    value
        .checked_mul(Decimal::from(FIXED_SCALE))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Renders a fixed-point value back to a decimal string for logs.
pub fn format_fixed(v: i64) -> String {
    Decimal::from_i128_with_scale(i128::from(v), 8)
        .normalize()
        .to_string()
}
