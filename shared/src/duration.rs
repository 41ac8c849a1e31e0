use crate::{Error, Result};
use std::time::Duration;

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

// Fraction digits past this point cannot change a nanosecond count.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration string such as "30s", "1.5h" or "1h30m".
///
/// Accepts a sequence of decimal numbers, each with an optional fraction and
/// a mandatory unit suffix (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`). The bare
/// string `"0"` is also accepted. Negative durations are rejected.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let invalid = || Error::Config(format!("invalid duration {s:?}"));

    let mut rest = s.trim();
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    if rest.starts_with('-') {
        return Err(Error::Config(format!("negative duration {s:?}")));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (int_part, after_int) = rest.split_at(int_end);

        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_end = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                after_dot.split_at(frac_end)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_end = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, next) = after_number.split_at(unit_end);
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| {
                if unit.is_empty() {
                    Error::Config(format!("missing unit in duration {s:?}"))
                } else {
                    Error::Config(format!("unknown unit {unit:?} in duration {s:?}"))
                }
            })?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut value = whole.checked_mul(scale).ok_or_else(invalid)?;

        let frac_digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
        if !frac_digits.is_empty() {
            let numerator: u128 = frac_digits.parse().map_err(|_| invalid())?;
            let denominator = 10u128.pow(frac_digits.len() as u32);
            value = value
                .checked_add(numerator * scale / denominator)
                .ok_or_else(invalid)?;
        }

        total = total.checked_add(value).ok_or_else(invalid)?;
        rest = next;
    }

    let nanos = u64::try_from(total).map_err(|_| invalid())?;
    Ok(Duration::from_nanos(nanos))
}
