//! Display helpers for evaluator results.

use serde::Serialize;
use std::fmt;

/// A result value, kept integral when it has no fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl fmt::Display for Number {
    /// Always fixed notation, never an exponent.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{}", value),
            Number::Decimal(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Decimal(value)
    }
}

/// Converts `5.0` into `5`; anything with a fractional part stays a decimal.
///
/// Values outside the `i64` range (and non-finite values) stay decimals.
///
/// ```rust
/// use quickcalc::format::{remove_trailing_zero, Number};
///
/// assert_eq!(remove_trailing_zero(5.0), Number::Integer(5));
/// assert_eq!(remove_trailing_zero(5.5), Number::Decimal(5.5));
/// ```
pub fn remove_trailing_zero(value: f64) -> Number {
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    if value.is_finite() && value.fract() == 0.0 && value >= -I64_BOUND && value < I64_BOUND {
        Number::Integer(value as i64)
    } else {
        Number::Decimal(value)
    }
}

/// Adds commas as a thousands separator to the integer digits.
///
/// The sign stays in front and the fractional digits are appended unchanged.
///
/// ```rust
/// use quickcalc::format::{format_number, Number};
///
/// assert_eq!(format_number(Number::Integer(1234567)), "1,234,567");
/// assert_eq!(format_number(Number::Decimal(1234567.89)), "1,234,567.89");
/// ```
pub fn format_number(number: Number) -> String {
    let text = number.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut formatted = String::with_capacity(text.len() + integer.len() / 3);
    formatted.push_str(sign);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(digit);
    }
    if let Some(fraction) = fraction {
        formatted.push('.');
        formatted.push_str(fraction);
    }
    formatted
}
