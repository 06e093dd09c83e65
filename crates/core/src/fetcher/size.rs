//! Human-readable size parsing.

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;
const MAX_SIZE: u64 = i64::MAX as u64;

/// Convert a size such as `"600.44 MB"` or `"1.5 GB"` to bytes.
///
/// Units are base-1024. Only `MB` and `GB` are recognized; any other unit or
/// a malformed value yields 0. Fractional bytes are truncated, and the result
/// saturates at `i64::MAX` so every size fits a signed 64-bit column.
pub fn parse_size(size: &str) -> u64 {
    let normalized = size.replace('\u{a0}', " ");
    let mut parts = normalized.split_whitespace();

    let (Some(number), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return 0;
    };

    let Ok(number) = number.parse::<f64>() else {
        return 0;
    };

    if !number.is_finite() || number < 0.0 {
        return 0;
    }

    let multiplier = match unit {
        "MB" => MIB,
        "GB" => GIB,
        _ => return 0,
    };

    ((number * multiplier) as u64).min(MAX_SIZE)
}
