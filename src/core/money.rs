//! Money calculation utilities using `rust_decimal` for precision.
//!
//! Amounts are stored as `f64` dollars. Every calculation converts to
//! `Decimal`, works there, and converts back rounded to cents.

use crate::errors::{Error, Result};
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// One cent
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest single amount, cost or quantity accepted from a request
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// Largest proposal subtotal pricing will store
pub const MAX_TOTAL: f64 = 1_000_000_000_000.0;

fn too_large(field: &str, limit: f64) -> Error {
    Error::AmountTooLarge {
        field: field.to_string(),
        limit,
    }
}

/// Convert a stored f64 to Decimal for calculation.
///
/// Stored amounts went through the validators below or through pricing, so
/// they are always within range.
#[inline]
#[must_use]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert an unchecked f64 to Decimal, failing instead of losing the value.
pub fn try_to_decimal(value: f64, field_name: &str) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(Error::validation(format!(
            "{field_name} must be a finite number, got {value}"
        )));
    }
    Decimal::from_f64(value).ok_or_else(|| too_large(field_name, MAX_TOTAL))
}

/// `a + b`, reporting `field_name` on overflow
pub fn checked_add(a: Decimal, b: Decimal, field_name: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| too_large(field_name, MAX_TOTAL))
}

/// `a × b`, reporting `field_name` on overflow
pub fn checked_mul(a: Decimal, b: Decimal, field_name: &str) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(|| too_large(field_name, MAX_TOTAL))
}

/// Round a Decimal to cents
#[inline]
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
#[must_use]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

/// Percentage of an amount: `amount × percent / 100`
pub fn percent_of(amount: Decimal, percent: f64, field_name: &str) -> Result<Decimal> {
    let rate = try_to_decimal(percent, field_name)?;
    Ok(checked_mul(amount, rate, field_name)? / Decimal::ONE_HUNDRED)
}

/// Validate that a value is finite, not negative and at most [`MAX_AMOUNT`]
pub fn require_non_negative(value: f64, field_name: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::validation(format!(
            "{field_name} must be a finite number, got {value}"
        )));
    }
    if value < 0.0 {
        return Err(Error::validation(format!(
            "{field_name} must be non-negative, got {value}"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(too_large(field_name, MAX_AMOUNT));
    }
    Ok(())
}

/// Validate that a percentage lies in [0, 100]
pub fn require_percentage(value: f64, field_name: &str) -> Result<()> {
    require_non_negative(value, field_name)?;
    if value > 100.0 {
        return Err(Error::validation(format!(
            "{field_name} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}

/// Validate a payment amount: finite, strictly positive and at most [`MAX_AMOUNT`]
pub fn require_payment_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    if amount > MAX_AMOUNT {
        return Err(too_large("amount", MAX_AMOUNT));
    }
    Ok(())
}

/// Split `total` into `parts` cent-exact shares.
///
/// Leftover cents go one each to the first shares, so the result always sums
/// to `round_money(total)`.
#[must_use]
pub fn split_evenly(total: Decimal, parts: usize) -> Vec<Decimal> {
    if parts == 0 {
        return Vec::new();
    }

    let total_cents = (round_money(total) / CENT).trunc();
    let count = Decimal::from(parts);
    let base_cents = (total_cents / count).trunc();
    let leftover = total_cents - base_cents * count;
    let leftover = leftover.to_usize().unwrap_or_default();

    (0..parts)
        .map(|i| {
            let cents = if i < leftover {
                base_cents + Decimal::ONE
            } else {
                base_cents
            };
            cents * CENT
        })
        .collect()
}
