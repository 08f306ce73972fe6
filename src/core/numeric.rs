//! Exact decimal rounding and bounded random draws.
//!
//! Everything here works on [`Decimal`]; money never passes through a float.

use crate::errors::{Error, Result};
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use std::str::FromStr;

/// Money is always kept at two decimal places.
pub const MONEY_PRECISION: u32 = 2;

/// Most fraction digits an amount may be rounded or shown at.
pub const MAX_MONEY_PRECISION: u32 = 2;

/// Accepts a money precision in `0..=MAX_MONEY_PRECISION`.
///
/// # Errors
/// Returns [`Error::InvalidPrecision`] for anything larger.
pub fn check_precision(precision: u32) -> Result<u32> {
    if precision > MAX_MONEY_PRECISION {
        return Err(Error::InvalidPrecision {
            precision,
            max: MAX_MONEY_PRECISION,
        });
    }
    Ok(precision)
}

/// Smallest allowed unit price.
#[must_use]
pub fn min_price() -> Decimal {
    Decimal::new(1, 2)
}

/// Rounds `value` to `precision` fractional digits, half-up.
#[must_use]
pub fn round_to(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

fn scale_factor(precision: u32) -> Decimal {
    let mut factor = Decimal::ONE;
    for _ in 0..precision {
        factor *= Decimal::TEN;
    }
    factor
}

/// Draws a value uniformly from the values representable at `precision` within
/// `[min, max]`. Inverted bounds are swapped.
///
/// When the interval holds no representable value (it is narrower than one unit at this
/// precision), the rounded lower bound is returned.
pub fn random_in_range<R: Rng + ?Sized>(
    rng: &mut R,
    min: Decimal,
    max: Decimal,
    precision: u32,
) -> Decimal {
    let (low, high) = if max < min { (max, min) } else { (min, max) };
    let factor = scale_factor(precision);
    let low_units = (low * factor).ceil().to_i64();
    let high_units = (high * factor).floor().to_i64();

    match (low_units, high_units) {
        (Some(lo), Some(hi)) if lo <= hi => {
            let units = rng.gen_range(lo..=hi);
            Decimal::new(units, precision)
        }
        _ => round_to(low, precision),
    }
}

/// Snaps `value` to the nearest multiple of `step`, half-up. A non-positive step leaves
/// the value untouched.
#[must_use]
pub fn step_quantize(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    (value / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
}

/// Smallest multiple of `step` that is `>= value`.
#[must_use]
pub fn ceil_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    (value / step).ceil() * step
}

/// Largest multiple of `step` that is `<= value`.
#[must_use]
pub fn floor_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    (value / step).floor() * step
}

/// Number of fractional digits a step needs (0.1 → 1, 1 → 0, 0.25 → 2).
#[must_use]
pub fn step_precision(step: Decimal) -> u32 {
    step.normalize().scale()
}

/// Draws a quantity uniformly among the step multiples inside `[min, max]`.
///
/// Falls back to a plain random draw at `fallback_precision` when the step is not positive
/// or no multiple of it fits in the interval.
pub fn random_quantity<R: Rng + ?Sized>(
    rng: &mut R,
    min: Decimal,
    max: Decimal,
    step: Decimal,
    fallback_precision: u32,
) -> Decimal {
    if step <= Decimal::ZERO {
        return random_in_range(rng, min, max, fallback_precision);
    }
    let min_steps = (min / step).ceil().to_i64();
    let max_steps = (max / step).floor().to_i64();
    match (min_steps, max_steps) {
        (Some(lo), Some(hi)) if lo <= hi => step * Decimal::from(rng.gen_range(lo..=hi)),
        _ => random_in_range(rng, min, max, fallback_precision),
    }
}

/// Parses a decimal kept as text in `column`.
///
/// # Errors
/// Returns [`Error::InvalidDecimal`] when the text is not a decimal number.
pub fn parse_stored(column: &'static str, text: &str) -> Result<Decimal> {
    Decimal::from_str(text.trim()).map_err(|_| Error::InvalidDecimal {
        column,
        value: text.to_string(),
    })
}

/// Parses an optional stored decimal.
///
/// # Errors
/// Same conditions as [`parse_stored`].
pub fn parse_stored_opt(column: &'static str, text: Option<&str>) -> Result<Option<Decimal>> {
    text.map(|t| parse_stored(column, t)).transpose()
}
