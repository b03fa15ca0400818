//! Price text normalization.
//!
//! Storefronts format the same number as `2 500`, `2.500,00`, `2,500.00` or
//! `2500 ₽`. Everything except digits and the two separator characters is
//! dropped, then the decimal separator is picked by position:
//!
//! - both `,` and `.` present: whichever occurs last is the decimal
//!   separator, the other kind is a thousands separator;
//! - one kind present once: it is the decimal separator;
//! - one kind present several times: they are thousands separators.

use crate::error::NormalizeError;

/// Normalizes raw price text into a number.
///
/// # Errors
///
/// Returns [`NormalizeError::Empty`] when the text has no digits, and
/// [`NormalizeError::NotNumeric`] when the digits overflow `f64`.
pub fn normalize_price(raw: &str) -> Result<f64, NormalizeError> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let kept = kept.trim_matches(|c| c == ',' || c == '.');

    if kept.is_empty() {
        return Err(NormalizeError::Empty {
            raw: raw.to_owned(),
        });
    }

    let canonical = match (kept.rfind(','), kept.rfind('.')) {
        (Some(comma), Some(dot)) => {
            let (decimal, thousands) = if comma > dot { (',', '.') } else { ('.', ',') };
            keep_last_as_decimal(&kept.replace(thousands, ""), decimal)
        }
        (Some(_), None) => single_separator_kind(kept, ','),
        (None, Some(_)) => single_separator_kind(kept, '.'),
        (None, None) => kept.to_owned(),
    };

    match canonical.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(NormalizeError::NotNumeric {
            raw: raw.to_owned(),
            normalized: canonical,
        }),
    }
}

fn single_separator_kind(s: &str, sep: char) -> String {
    if s.matches(sep).count() == 1 {
        s.replace(sep, ".")
    } else {
        s.replace(sep, "")
    }
}

/// Drops every `decimal` except the last one, which becomes `.`.
fn keep_last_as_decimal(s: &str, decimal: char) -> String {
    let Some(last) = s.rfind(decimal) else {
        return s.to_owned();
    };
    let mut out = String::with_capacity(s.len());
    for (idx, c) in s.char_indices() {
        if c == decimal {
            if idx == last {
                out.push('.');
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
