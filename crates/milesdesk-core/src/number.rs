//! # Number Parsing
//!
//! Turns user-typed, locale-ambiguous numeric strings into `f64`.
//!
//! ## Heuristic
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Input has a comma?                                                     │
//! │     YES ──► Brazilian format: drop dots, comma → dot                    │
//! │             "1.234,56" → 1234.56      "29,9" → 29.9                     │
//! │                                                                         │
//! │     NO ───► digits "." 1-2 digits?                                      │
//! │                YES ──► dot is the decimal point                         │
//! │                        "29.00" → 29.0   "123.4" → 123.4                 │
//! │                NO ───► dots are thousands separators                    │
//! │                        "2.970" → 2970   "1.500.000" → 1500000           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Known Limitation
//! Without a comma, three digits after a single dot are always read as a
//! thousands group: `"1.250"` is 1250, never 1.25. Callers that need to warn
//! the user about suspicious input use [`try_parse_decimal`] and inspect the
//! error instead of the lenient [`parse_decimal`].

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors from the strict parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDecimalError {
    /// Input was empty or whitespace only.
    #[error("empty number")]
    Empty,

    /// Input could not be read as a finite number.
    #[error("'{0}' is not a valid number")]
    Invalid(String),
}

/// Parses a number, reporting why it failed.
///
/// ## Example
/// ```rust
/// use milesdesk_core::number::{try_parse_decimal, ParseDecimalError};
///
/// assert_eq!(try_parse_decimal("1.234,56"), Ok(1234.56));
/// assert_eq!(try_parse_decimal(""), Err(ParseDecimalError::Empty));
/// assert!(try_parse_decimal("abc").is_err());
/// ```
pub fn try_parse_decimal(raw: &str) -> Result<f64, ParseDecimalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseDecimalError::Empty);
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replacen(',', ".", 1)
    } else if is_short_decimal(trimmed) {
        trimmed.to_string()
    } else {
        trimmed.replace('.', "")
    };

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseDecimalError::Invalid(raw.to_string())),
    }
}

/// Lenient parse: never fails, returns `0.0` for empty or unparseable input.
///
/// ## Example
/// ```rust
/// use milesdesk_core::number::parse_decimal;
///
/// assert_eq!(parse_decimal("29.00"), 29.0);
/// assert_eq!(parse_decimal("2.970"), 2970.0);
/// assert_eq!(parse_decimal("R$ abc"), 0.0);
/// ```
pub fn parse_decimal(raw: &str) -> f64 {
    try_parse_decimal(raw).unwrap_or(0.0)
}

/// Replaces NaN and infinities with zero.
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `digits "." 1-2 digits`, optional leading minus.
fn is_short_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    match unsigned.split_once('.') {
        Some((int_part, frac_part)) => {
            !int_part.is_empty()
                && int_part.chars().all(|c| c.is_ascii_digit())
                && (1..=2).contains(&frac_part.len())
                && frac_part.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

// =============================================================================
// Serde Helpers
// =============================================================================

/// Stored records written by older clients may hold numbers as typed text.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Deserializes an optional number that may arrive as a JSON number, a
/// user-typed string (`"25.000"`), or `null`.
///
/// Unparseable text becomes `None` so the field falls through to its alias.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(n)) if n.is_finite() => Some(n),
        Some(NumberOrText::Text(s)) => try_parse_decimal(&s).ok(),
        _ => None,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brazilian_format() {
        assert_eq!(parse_decimal("1.234,56"), 1234.56);
        assert_eq!(parse_decimal("29,90"), 29.9);
        assert_eq!(parse_decimal("1.500.000,00"), 1_500_000.0);
    }

    #[test]
    fn test_dot_as_decimal_point() {
        assert_eq!(parse_decimal("29.00"), 29.0);
        assert_eq!(parse_decimal("123.4"), 123.4);
        assert_eq!(parse_decimal("-35.5"), -35.5);
    }

    #[test]
    fn test_dot_as_thousands_separator() {
        assert_eq!(parse_decimal("2.970"), 2970.0);
        assert_eq!(parse_decimal("50.000"), 50_000.0);
        assert_eq!(parse_decimal("1.500.000"), 1_500_000.0);
        assert_eq!(parse_decimal("25000"), 25_000.0);
    }

    /// Documents the ambiguity rather than "fixing" it.
    #[test]
    fn test_three_digit_fraction_is_thousands() {
        assert_eq!(parse_decimal("1.250"), 1250.0);
        assert_eq!(parse_decimal("1,250"), 1.25);
    }

    #[test]
    fn test_empty_and_garbage_are_zero() {
        assert_eq!(parse_decimal(""), 0.0);
        assert_eq!(parse_decimal("   "), 0.0);
        assert_eq!(parse_decimal("abc"), 0.0);
        assert_eq!(parse_decimal("NaN"), 0.0);
        assert_eq!(parse_decimal("inf"), 0.0);
    }

    #[test]
    fn test_strict_parse_errors() {
        assert_eq!(try_parse_decimal(" "), Err(ParseDecimalError::Empty));
        assert_eq!(
            try_parse_decimal("12x"),
            Err(ParseDecimalError::Invalid("12x".to_string()))
        );
        assert_eq!(try_parse_decimal(" 29,00 "), Ok(29.0));
    }

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(12.5), 12.5);
    }

    #[test]
    fn test_deserialize_lenient() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default, deserialize_with = "deserialize_lenient")]
            miles: Option<f64>,
        }

        let parse = |json: &str| serde_json::from_str::<Probe>(json).unwrap().miles;

        assert_eq!(parse(r#"{"miles": 25000}"#), Some(25000.0));
        assert_eq!(parse(r#"{"miles": "25.000"}"#), Some(25000.0));
        assert_eq!(parse(r#"{"miles": "12,5"}"#), Some(12.5));
        assert_eq!(parse(r#"{"miles": null}"#), None);
        assert_eq!(parse(r#"{"miles": "oops"}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }
}
