//! Conversion between monetary text and amounts.
//!
//! Parsing is best-effort: input comes from hand-edited spreadsheets, so any
//! text that cannot be read as a number becomes `0.0` instead of an error.

use crate::config::CurrencyFormat;
use log::warn;
use num_format::{Locale, ToFormattedString};
use regex::Regex;
use std::sync::LazyLock;

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d,.\-]").expect("static pattern is valid"));

/// Reads an amount such as `"R$ 1.234,56"`, `"1,234.56"`, `"1234,56"` or the
/// accounting-negative `"(1.234,56)"`.
///
/// When both `,` and `.` appear, the rightmost one is the decimal mark. A lone
/// `,` is a decimal mark. A lone `.` is left alone.
pub fn parse_amount(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() || matches!(trimmed.to_lowercase().as_str(), "nan" | "none" | "null")
    {
        return 0.0;
    }

    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let digits = NON_NUMERIC.replace_all(body, "");
    let normalized = match (digits.rfind(','), digits.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (Some(_), None) => digits.replace(',', "."),
        _ => digits.into_owned(),
    };

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if negative {
                -value
            } else {
                value
            }
        }
        _ => {
            warn!("Could not read amount from '{}', using 0", text);
            0.0
        }
    }
}

pub fn parse_optional_amount(text: Option<&str>) -> f64 {
    text.map(parse_amount).unwrap_or(0.0)
}

/// Groups thousands with `,` and rounds to `decimal_places` (en locale, `1,234.56`).
///
/// Rounding is done on the decimal text, so any magnitude and precision is
/// exact. Integer parts beyond `u128` are printed ungrouped.
pub fn format_amount(value: f64, decimal_places: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.*}", decimal_places, value.abs());
    let (integer_digits, fraction) = match fixed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let grouped = match integer_digits.parse::<u128>() {
        Ok(integer) => integer.to_formatted_string(&Locale::en),
        Err(_) => {
            warn!("Amount {} too large to group, printing plain digits", value);
            integer_digits.to_string()
        }
    };
    let rounds_to_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if value < 0.0 && !rounds_to_zero { "-" } else { "" };

    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn format_currency(value: f64, currency: &CurrencyFormat) -> String {
    format!(
        "{} {}",
        currency.symbol,
        format_amount(value, currency.decimal_places)
    )
}
