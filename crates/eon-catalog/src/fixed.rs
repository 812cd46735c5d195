//! Fixed-point decimal arithmetic for on-chain parameters.
//!
//! # Scale
//!
//! A *mantissa* is a value scaled by 1e18 and stored as `u128`.
//! `0.8` is `Mantissa(800_000_000_000_000_000)`. Other scales (token
//! decimals, exchange-rate precision) go through [`parse_units`] with an
//! explicit decimal count.
//!
//! # Exactness
//!
//! Parsing never passes through floating point. Inputs are decimal strings
//! exactly as authored in the catalog; a fraction with more significant
//! digits than the target scale is rejected rather than rounded. Only
//! [`rate_per_block`] rounds (half-up at the 18th digit), because dividing by
//! the block count has no exact representation.
//!
//! All arithmetic is checked; overflow of `u128` is an error, never a wrap.

use eon_config::{ConfigError, SECONDS_PER_YEAR};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MANTISSA_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedPointError {
    #[error("malformed decimal {0:?}")]
    Malformed(String),

    #[error("fractional component of {value:?} exceeds {decimals} decimals")]
    TooPrecise { value: String, decimals: u32 },

    #[error("{0:?} overflows 128-bit fixed point")]
    Overflow(String),

    #[error("negative decimal scale {0}")]
    NegativeScale(i64),

    #[error("division by zero")]
    DivisionByZero,
}

impl FixedPointError {
    /// Attach the name of the configuration field that failed to parse.
    pub fn for_field(self, field: impl Into<String>) -> ConfigError {
        ConfigError::InvalidNumber {
            field: field.into(),
            reason: self.to_string(),
        }
    }
}

impl From<FixedPointError> for ConfigError {
    fn from(e: FixedPointError) -> Self {
        e.for_field("value")
    }
}

/// A value scaled by 1e18.
///
/// No `From<u128>`: construct with [`Mantissa::new`] when the raw integer is
/// known to be at mantissa scale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mantissa(u128);

impl Mantissa {
    pub const ZERO: Mantissa = Mantissa(0);
    pub const ONE: Mantissa = Mantissa(1_000_000_000_000_000_000);

    #[inline]
    pub const fn new(raw: u128) -> Self {
        Mantissa(raw)
    }

    #[inline]
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// `"0.8"` → `0.8 × 1e18`.
    pub fn parse(value: &str) -> Result<Mantissa, FixedPointError> {
        parse_units(value, MANTISSA_DECIMALS).map(Mantissa)
    }

    /// Human form, e.g. `0.8` (always at least one fractional digit).
    pub fn to_decimal_string(self) -> String {
        format_units(self.0, MANTISSA_DECIMALS)
    }
}

/// Raw integer form, which is what chains and logs carry.
impl fmt::Display for Mantissa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn pow10(exp: u32) -> Result<u128, FixedPointError> {
    10u128
        .checked_pow(exp)
        .ok_or_else(|| FixedPointError::Overflow(format!("1e{exp}")))
}

/// Parse a non-negative decimal string into an integer scaled by `10^decimals`.
///
/// Trailing fractional zeros are ignored, so `"0.50"` parses at 1 decimal.
pub fn parse_units(value: &str, decimals: u32) -> Result<u128, FixedPointError> {
    let t = value.trim();
    let malformed = || FixedPointError::Malformed(value.to_string());

    let (int_part, frac_part) = t.split_once('.').unwrap_or((t, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(malformed());
    }

    let frac = frac_part.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(FixedPointError::TooPrecise {
            value: value.to_string(),
            decimals,
        });
    }

    let overflow = || FixedPointError::Overflow(value.to_string());
    let scale = pow10(decimals)?;

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };

    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        let padding = pow10(decimals - frac.len() as u32)?;
        let digits: u128 = frac.parse().map_err(|_| overflow())?;
        digits.checked_mul(padding).ok_or_else(overflow)?
    };

    int_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(overflow)
}

/// Inverse of [`parse_units`] for display: `format_units(8e17, 18) == "0.8"`.
pub fn format_units(raw: u128, decimals: u32) -> String {
    let digits = raw.to_string();
    let d = decimals as usize;
    let (int_part, frac_part) = if digits.len() > d {
        let split = digits.len() - d;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = d))
    };

    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        format!("{int_part}.0")
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Initial exchange-rate mantissa of a market:
/// `rate × 10^(underlying_decimals + 18 − market_decimals)`.
///
/// The exchange rate is always carried at 18-decimal precision relative to
/// the underlying, so the exponent compensates for both tokens' decimals.
pub fn exchange_rate_mantissa(
    initial_rate: &str,
    underlying_decimals: u8,
    market_decimals: u8,
) -> Result<u128, FixedPointError> {
    let exp = i64::from(underlying_decimals) + i64::from(MANTISSA_DECIMALS) - i64::from(market_decimals);
    if exp < 0 {
        return Err(FixedPointError::NegativeScale(exp));
    }
    parse_units(initial_rate, exp as u32)
}

/// Per-block mantissa of an annual rate:
/// `annual_rate / (SECONDS_PER_YEAR / seconds_per_block)`, rounded half-up
/// at 18 fractional digits.
pub fn rate_per_block(annual_rate: &str, seconds_per_block: &str) -> Result<Mantissa, FixedPointError> {
    let annual = parse_units(annual_rate, MANTISSA_DECIMALS)?;
    let spb = parse_units(seconds_per_block, MANTISSA_DECIMALS)?;
    if spb == 0 {
        return Err(FixedPointError::DivisionByZero);
    }

    // annual and spb are both 1e18-scaled, so the product carries 1e36;
    // dividing by (1e18 × SPY) leaves a 1e18-scaled per-block rate.
    let overflow = || FixedPointError::Overflow(format!("{annual_rate} × {seconds_per_block}"));
    let numerator = annual.checked_mul(spb).ok_or_else(overflow)?;
    let denominator = Mantissa::ONE
        .raw()
        .checked_mul(u128::from(SECONDS_PER_YEAR))
        .ok_or_else(overflow)?;

    let rounded = numerator
        .checked_add(denominator / 2)
        .ok_or_else(overflow)?
        / denominator;
    Ok(Mantissa(rounded))
}

/// `floor(SECONDS_PER_YEAR / seconds_per_block)`.
pub fn blocks_per_year(seconds_per_block: &str) -> Result<u64, FixedPointError> {
    let spb = parse_units(seconds_per_block, MANTISSA_DECIMALS)?;
    if spb == 0 {
        return Err(FixedPointError::DivisionByZero);
    }
    let year = u128::from(SECONDS_PER_YEAR) * Mantissa::ONE.raw();
    u64::try_from(year / spb).map_err(|_| FixedPointError::Overflow(seconds_per_block.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units_basic() {
        assert_eq!(parse_units("0.8", 18).unwrap(), 800_000_000_000_000_000);
        assert_eq!(parse_units("1", 6).unwrap(), 1_000_000);
        assert_eq!(parse_units(".5", 1).unwrap(), 5);
        assert_eq!(parse_units("0.50", 1).unwrap(), 5);
        assert_eq!(parse_units("0", 18).unwrap(), 0);
    }

    #[test]
    fn parse_units_rejects_garbage() {
        assert!(matches!(parse_units("", 18), Err(FixedPointError::Malformed(_))));
        assert!(matches!(parse_units(".", 18), Err(FixedPointError::Malformed(_))));
        assert!(matches!(parse_units("-1", 18), Err(FixedPointError::Malformed(_))));
        assert!(matches!(parse_units("1e18", 18), Err(FixedPointError::Malformed(_))));
        assert!(matches!(parse_units("1.2.3", 18), Err(FixedPointError::Malformed(_))));
    }

    #[test]
    fn parse_units_rejects_excess_precision() {
        assert_eq!(
            parse_units("0.123", 2),
            Err(FixedPointError::TooPrecise {
                value: "0.123".to_string(),
                decimals: 2
            })
        );
    }

    #[test]
    fn parse_units_detects_overflow() {
        assert!(matches!(
            parse_units("340282366920938463463374607431768211456", 0),
            Err(FixedPointError::Overflow(_))
        ));
        assert!(matches!(parse_units("1", 39), Err(FixedPointError::Overflow(_))));
    }

    #[test]
    fn format_units_trims() {
        assert_eq!(format_units(800_000_000_000_000_000, 18), "0.8");
        assert_eq!(format_units(1_000_000_000_000_000_000, 18), "1.0");
        assert_eq!(format_units(1_080_000_000_000_000_000, 18), "1.08");
        assert_eq!(format_units(5, 3), "0.005");
        assert_eq!(format_units(0, 18), "0.0");
    }

    #[test]
    fn negative_exchange_rate_scale_is_rejected() {
        assert_eq!(
            exchange_rate_mantissa("0.02", 0, 20),
            Err(FixedPointError::NegativeScale(-2))
        );
    }

    #[test]
    fn blocks_per_year_floors() {
        assert_eq!(blocks_per_year("3").unwrap(), 10_512_000);
        assert_eq!(blocks_per_year("7").unwrap(), 4_505_142);
        assert_eq!(blocks_per_year("0"), Err(FixedPointError::DivisionByZero));
    }
}
