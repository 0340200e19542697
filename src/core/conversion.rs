//! Derives the displayed conversion from an amount and a resolved rate.

use anyhow::{Result, anyhow, bail};
use std::fmt;

/// Literal shown in place of a value when no rate is available.
pub const ERROR_INDICATOR: &str = "Error";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Converted amount, already rounded to two decimal places.
    Value(f64),
    Error,
}

impl Conversion {
    pub fn value(&self) -> Option<f64> {
        match self {
            Conversion::Value(v) => Some(*v),
            Conversion::Error => None,
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Value(v) => write!(f, "{v:.2}"),
            Conversion::Error => f.write_str(ERROR_INDICATOR),
        }
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a user-entered amount, rejecting `NaN` and infinities.
pub fn parse_amount(value: &str) -> Result<f64> {
    let amount: f64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid amount: {value}"))?;
    if !amount.is_finite() {
        bail!("Invalid amount: {value}");
    }
    Ok(amount)
}

/// A missing rate or a non-finite product both present as [`Conversion::Error`].
pub fn convert(amount: f64, rate: Option<f64>) -> Conversion {
    match rate.map(|rate| amount * rate) {
        Some(product) if product.is_finite() => Conversion::Value(round_to_cents(product)),
        _ => Conversion::Error,
    }
}
