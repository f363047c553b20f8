//! Duration expressions such as `300ms`, `1.5h` or `2h45m`.
//!
//! A value is an optionally signed sequence of decimal numbers, each with an
//! optional fraction and a mandatory unit suffix. Valid units are `ns`, `us`
//! (or `µs`), `ms`, `s`, `m` and `h`. The bare string `0` is also accepted.
//! Negative durations cannot be represented by [`Duration`] and are rejected,
//! except for a signed zero.

use std::time::Duration;

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Fraction digits beyond this do not change the result at nanosecond
/// resolution and would overflow the scale.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration expression. Returns `None` for anything malformed.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map_or(rest.len(), |(i, _)| i);
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        total = total.checked_add(whole.checked_mul(scale)?)?;

        if !frac_part.is_empty() {
            let digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
            let frac: u128 = digits.parse().ok()?;
            let divisor = 10u128.pow(digits.len() as u32);
            total = total.checked_add(frac * scale / divisor)?;
        }

        if total > u64::MAX as u128 {
            return None;
        }
    }

    if negative && total != 0 {
        return None;
    }
    Some(Duration::from_nanos(total as u64))
}
