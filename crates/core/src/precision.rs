//! Decimal precision helpers for sensor values.
//!
//! Values are stored as `f64`. Rounding scales by `10^digits`, rounds half
//! away from zero (`f64::round`), and scales back, so a value that already
//! sits at the configured precision is returned unchanged.

/// Largest supported number of decimal digits.
pub const MAX_PRECISION: u8 = 4;

/// Above this magnitude every `f64` is already an integer.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Round `value` to `digits` decimal places, half away from zero.
///
/// Values whose scaled magnitude exceeds 2^53 carry no fractional digits,
/// so they are returned as-is instead of overflowing to infinity.
pub fn round_to_precision(value: f64, digits: u8) -> f64 {
    let factor = 10f64.powi(i32::from(digits));
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() > EXACT_INTEGER_LIMIT {
        return value;
    }
    scaled.round() / factor
}
