//! Treasury fractional-32nd price codec.
//!
//! Source text carries prices as `PPP-XYz`: `PPP` whole points, `XY` 32nds
//! (00..31), `z` eighths of a 32nd (0..7, `+` meaning 4). The decoded value
//! is `PPP + XY/32 + z/256`, which is always exact on a 1/256 grid.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::Price;

/// Number of 1/256 ticks per whole point.
const TICKS_PER_POINT: i64 = 256;

/// Failures raised while moving prices in or out of `PPP-XYz` text.
#[derive(Debug, Error, PartialEq)]
pub enum PriceFormatError {
    #[error("price '{0}' is not in PPP-XYz form")]
    Malformed(String),
    #[error("32nds field '{0}' out of range (expected 00..31)")]
    ThirtySecondsOutOfRange(String),
    #[error("eighths digit '{0}' out of range (expected 0..7 or '+')")]
    EighthsOutOfRange(char),
    #[error("price {0} does not sit on the 1/256 grid")]
    OffGrid(Decimal),
    #[error("price {0} is negative")]
    Negative(Decimal),
}

/// Decode a fractional-32nd string into a real price.
pub fn parse_price32(text: &str) -> Result<Price, PriceFormatError> {
    let text = text.trim();
    let (points, frac) = text
        .split_once('-')
        .ok_or_else(|| PriceFormatError::Malformed(text.into()))?;
    let points: i64 = points
        .parse()
        .map_err(|_| PriceFormatError::Malformed(text.into()))?;
    let mut chars = frac.chars();
    let (x, y, z) = match (chars.next(), chars.next(), chars.next(), chars.next()) {
        (Some(x), Some(y), Some(z), None) => (x, y, z),
        _ => return Err(PriceFormatError::Malformed(text.into())),
    };
    let thirty_seconds = match (x.to_digit(10), y.to_digit(10)) {
        (Some(x), Some(y)) => i64::from(x * 10 + y),
        _ => return Err(PriceFormatError::Malformed(text.into())),
    };
    if thirty_seconds > 31 {
        return Err(PriceFormatError::ThirtySecondsOutOfRange(frac[..2].into()));
    }
    let eighths = match z {
        '+' => 4,
        digit => {
            let value = digit
                .to_digit(10)
                .ok_or(PriceFormatError::EighthsOutOfRange(digit))?;
            if value > 7 {
                return Err(PriceFormatError::EighthsOutOfRange(digit));
            }
            i64::from(value)
        }
    };
    let ticks = points * TICKS_PER_POINT + thirty_seconds * 8 + eighths;
    Ok(price_from_ticks(ticks))
}

/// Encode a real price back into fractional-32nd text. The price must be
/// non-negative and sit on the 1/256 grid.
pub fn format_price32(price: Price) -> Result<String, PriceFormatError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(PriceFormatError::Negative(price));
    }
    let scaled = price * Decimal::from(TICKS_PER_POINT);
    if scaled.fract() != Decimal::ZERO {
        return Err(PriceFormatError::OffGrid(price));
    }
    let ticks = scaled.to_i64().ok_or(PriceFormatError::OffGrid(price))?;
    let points = ticks / TICKS_PER_POINT;
    let remainder = ticks % TICKS_PER_POINT;
    let thirty_seconds = remainder / 8;
    let eighths = remainder % 8;
    let z = if eighths == 4 {
        "+".to_string()
    } else {
        eighths.to_string()
    };
    Ok(format!("{points}-{thirty_seconds:02}{z}"))
}

/// Price at a whole number of 1/256 ticks above zero.
#[must_use]
pub fn price_from_ticks(ticks: i64) -> Price {
    Decimal::from(ticks) / Decimal::from(TICKS_PER_POINT)
}
