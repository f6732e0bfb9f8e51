// 🔢 Numeric Normalizer
// Converts locale-formatted amounts ("1.585,43") into canonical f64 values
// and renders canonical values back for display.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw amount as it arrives from a form, a CSV cell or a JSON body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    /// True when there is nothing to parse (empty or whitespace text)
    pub fn is_blank(&self) -> bool {
        match self {
            RawAmount::Text(s) => s.trim().is_empty(),
            RawAmount::Number(_) => false,
        }
    }
}

impl From<&str> for RawAmount {
    fn from(s: &str) -> Self {
        RawAmount::Text(s.to_string())
    }
}

impl From<String> for RawAmount {
    fn from(s: String) -> Self {
        RawAmount::Text(s)
    }
}

impl From<f64> for RawAmount {
    fn from(n: f64) -> Self {
        RawAmount::Number(n)
    }
}

/// Malformed numeric text. Absorbed by `normalize`, only surfaced by `parse_localized`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a valid amount: {input:?}")]
pub struct ParseError {
    pub input: String,
}

/// Strict parse of a locale-formatted amount.
///
/// `.` is a thousands separator and `,` the decimal separator. Every `.` is
/// dropped, then `,` becomes `.`. Non-finite results are rejected.
pub fn parse_localized(raw: &str) -> Result<f64, ParseError> {
    let clean = raw.trim().replace('.', "").replace(',', ".");

    clean
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError {
            input: raw.to_string(),
        })
}

/// Fail-soft normalization: anything unusable becomes `0.0`
pub fn normalize(raw: Option<&RawAmount>) -> f64 {
    match raw {
        None => 0.0,
        Some(RawAmount::Number(n)) if n.is_finite() => *n,
        Some(RawAmount::Number(_)) => 0.0,
        Some(RawAmount::Text(s)) => normalize_str(s),
    }
}

/// `normalize` for plain text input
pub fn normalize_str(raw: &str) -> f64 {
    parse_localized(raw).unwrap_or(0.0)
}

/// Render a canonical amount in the same locale convention: `1585.43` → `"1.585,43"`
pub fn format_localized(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{},{}", sign, grouped, frac_part)
}

// ============================================================================
// TESTS
// ============================================================================
