use crate::entities::*;

/// Number of decimal digits used to quantize the bounds of a pin query.
pub const DEFAULT_FETCH_PRECISION: u8 = 3;

/// Number of decimal digits used to format cache keys.
pub const DEFAULT_KEY_PRECISION: u8 = 5;

const KEY_PREFIX: &str = "bbox";

fn scale(precision: u8) -> f64 {
    10_f64.powi(i32::from(precision))
}

fn round_coord(deg: f64, precision: u8) -> i64 {
    // `f64::round` rounds half-way cases away from zero
    (deg * scale(precision)).round() as i64
}

/// Quantizes `bounds` to `precision` decimal digits.
///
/// Ties are rounded away from zero, e.g. `1.0625` becomes `1.063`
/// and `-1.0625` becomes `-1.063` with a precision of 3.
/// Precisions above [`MAX_PRECISION`] are clamped.
pub fn round_bounds(bounds: &MapBounds, precision: u8) -> RoundedBounds {
    let precision = precision.min(MAX_PRECISION);
    let MapBounds {
        north,
        south,
        east,
        west,
    } = *bounds;
    RoundedBounds::from_units(
        precision,
        round_coord(west, precision),
        round_coord(south, precision),
        round_coord(east, precision),
        round_coord(north, precision),
    )
}

/// Formats a quantized coordinate with exactly `precision` decimal digits.
fn format_units(units: i64, precision: u8) -> String {
    let sign = if units < 0 { "-" } else { "" };
    let abs = units.unsigned_abs();
    if precision == 0 {
        return format!("{sign}{abs}");
    }
    let divisor = 10_u64.pow(u32::from(precision));
    let int = abs / divisor;
    let frac = abs % divisor;
    let width = usize::from(precision);
    format!("{sign}{int}.{frac:0width$}")
}

/// Derives the cache key `bbox:<west>:<south>:<east>:<north>`.
///
/// The coordinates are written with `key_precision` decimal digits, but
/// never with fewer digits than `rounded` carries. Hence distinct rounded
/// bounds always produce distinct keys and equal ones identical keys.
pub fn derive_key(rounded: &RoundedBounds, key_precision: u8) -> CacheKey {
    let digits = key_precision.min(MAX_PRECISION).max(rounded.precision());
    let factor = 10_i64.pow(u32::from(digits - rounded.precision()));
    let (west, south, east, north) = rounded.units();
    let fmt = |units: i64| format_units(units * factor, digits);
    format!(
        "{KEY_PREFIX}:{}:{}:{}:{}",
        fmt(west),
        fmt(south),
        fmt(east),
        fmt(north)
    )
    .into()
}
