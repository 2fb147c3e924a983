//! # Money Display
//!
//! Presentation helpers for monetary values.
//!
//! ## Floating Point, Rounded Late
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE COMPOUNDING DRIFT PROBLEM                                          │
//! │                                                                         │
//! │  cost/pax = 1450.004  → round → 1450.00                                 │
//! │  × 3 pax  = 4350.00   (real: 4350.012)                                  │
//! │  profit   = price - 4350.00  → off by a cent, then rounded again ...     │
//! │                                                                         │
//! │  OUR RULE: every calculation feeds raw f64 into the next one.           │
//! │  Rounding to 2 decimals happens ONLY here, when formatting for display. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use milesdesk_core::money::{format_brl, Brl};
//!
//! assert_eq!(format_brl(1234.5), "R$ 1.234,50");
//! assert_eq!(Brl(-5.5).to_string(), "-R$ 5,50");
//! ```

use std::fmt;

/// Rounds to 2 decimal places (half away from zero).
///
/// Display only. Never feed the result back into a calculation.
#[inline]
pub fn round_to_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// Formats with comma as decimal separator and dots between thousands.
///
/// ## Example
/// ```rust
/// use milesdesk_core::money::format_decimal_br;
///
/// assert_eq!(format_decimal_br(1234.56), "1.234,56");
/// assert_eq!(format_decimal_br(0.5), "0,50");
/// ```
pub fn format_decimal_br(value: f64) -> String {
    let cents = (round_to_cents(value).abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{},{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Formats a BRL amount: `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    Brl(value).to_string()
}

/// Formats a percentage with two decimals: `12,34%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_decimal_br(value))
}

fn group_thousands(mut whole: u64) -> String {
    let mut groups = Vec::new();
    loop {
        if whole < 1000 {
            groups.push(whole.to_string());
            break;
        }
        groups.push(format!("{:03}", whole % 1000));
        whole /= 1000;
    }
    groups.reverse();
    groups.join(".")
}

// =============================================================================
// Display Wrapper
// =============================================================================

/// Display wrapper for a BRL amount.
///
/// ## Note
/// This is the only place a currency value is rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brl(pub f64);

impl fmt::Display for Brl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = format_decimal_br(self.0);
        match formatted.strip_prefix('-') {
            Some(unsigned) => write!(f, "-R$ {}", unsigned),
            None => write!(f, "R$ {}", formatted),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_cents() {
        assert_eq!(round_to_cents(353.333_333), 353.33);
        assert_eq!(round_to_cents(1.005_1), 1.01);
        assert_eq!(round_to_cents(f64::NAN), 0.0);
    }

    #[test]
    fn test_format_decimal_br() {
        assert_eq!(format_decimal_br(0.0), "0,00");
        assert_eq!(format_decimal_br(35.0), "35,00");
        assert_eq!(format_decimal_br(1775.0), "1.775,00");
        assert_eq!(format_decimal_br(1_234_567.891), "1.234.567,89");
        assert_eq!(format_decimal_br(-1485.5), "-1.485,50");
    }

    #[test]
    fn test_negative_zero_has_no_sign() {
        assert_eq!(format_decimal_br(-0.001), "0,00");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Brl(1060.0)), "R$ 1.060,00");
        assert_eq!(format!("{}", Brl(353.333)), "R$ 353,33");
        assert_eq!(format!("{}", Brl(-5.5)), "-R$ 5,50");
        assert_eq!(format_brl(0.0), "R$ 0,00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(16.338), "16,34%");
        assert_eq!(format_percent(0.0), "0,00%");
    }
}
