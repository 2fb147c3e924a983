//! # Validation Module
//!
//! Input validation for quotes, interest configuration and ticket issuance.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Form input                                                    │
//! │  └── parse_decimal turns typed text into numbers (never fails)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── installment bounds per payment type                                │
//! │  ├── non-negative, finite rates and amounts                             │
//! │  └── passenger counts, names, PNR locators                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── UNIQUE (payment_type, installments)                                │
//! │  └── CHECK / NOT NULL constraints                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pricing itself never rejects input: the calculator coerces bad numbers to
//! zero. These checks run where a value is about to be stored.

use crate::error::ValidationError;
use crate::interest::PaymentType;
use crate::{MAX_CREDIT_INSTALLMENTS, MAX_PASSENGERS, PNR_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an installment count for a payment type.
///
/// ## Rules
/// - Debit: exactly 1
/// - Credit: 1 to 24
///
/// ## Example
/// ```rust
/// use milesdesk_core::interest::PaymentType;
/// use milesdesk_core::validation::validate_installments;
///
/// assert!(validate_installments(PaymentType::Credit, 12).is_ok());
/// assert!(validate_installments(PaymentType::Credit, 25).is_err());
/// assert!(validate_installments(PaymentType::Debit, 2).is_err());
/// ```
pub fn validate_installments(payment_type: PaymentType, installments: u32) -> ValidationResult<()> {
    let max = payment_type.max_installments();

    if installments == 0 || installments > max {
        return Err(ValidationError::OutOfRange {
            field: "installments".to_string(),
            min: 1,
            max: i64::from(max),
        });
    }

    Ok(())
}

/// Validates a percentage rate.
///
/// ## Rules
/// - Must be finite
/// - Must be non-negative (0% is allowed)
pub fn validate_rate_percent(field: &str, rate: f64) -> ValidationResult<()> {
    if !rate.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if rate < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a monetary amount or mileage figure.
///
/// Same rules as [`validate_rate_percent`]; kept separate so error
/// messages name the right field.
pub fn validate_amount(field: &str, amount: f64) -> ValidationResult<()> {
    validate_rate_percent(field, amount)
}

/// Validates a passenger count.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_PASSENGERS (9, one booking locator)
pub fn validate_passenger_count(count: u32) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::MustBePositive {
            field: "passengers".to_string(),
        });
    }

    if count > MAX_PASSENGERS {
        return Err(ValidationError::OutOfRange {
            field: "passengers".to_string(),
            min: 1,
            max: i64::from(MAX_PASSENGERS),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a passenger name.
///
/// ## Returns
/// The trimmed name.
pub fn validate_passenger_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "passenger name".to_string(),
        });
    }

    if name.chars().count() > 120 {
        return Err(ValidationError::InvalidFormat {
            field: "passenger name".to_string(),
            reason: "must be at most 120 characters".to_string(),
        });
    }

    Ok(name.to_string())
}

/// Validates an airline booking locator (PNR).
///
/// ## Rules
/// - 6 characters after trimming
/// - ASCII letters and digits only
///
/// ## Returns
/// The locator in upper case.
///
/// ## Example
/// ```rust
/// use milesdesk_core::validation::validate_pnr;
///
/// assert_eq!(validate_pnr(" abc12x ").unwrap(), "ABC12X");
/// assert!(validate_pnr("ABC-12").is_err());
/// assert!(validate_pnr("").is_err());
/// ```
pub fn validate_pnr(pnr: &str) -> ValidationResult<String> {
    let pnr = pnr.trim();

    if pnr.is_empty() {
        return Err(ValidationError::Required {
            field: "pnr".to_string(),
        });
    }

    if pnr.len() != PNR_LENGTH || !pnr.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "pnr".to_string(),
            reason: format!("must be {} letters or digits", PNR_LENGTH),
        });
    }

    Ok(pnr.to_ascii_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_installments() {
        assert!(validate_installments(PaymentType::Debit, 1).is_ok());
        assert!(validate_installments(PaymentType::Debit, 0).is_err());
        assert!(validate_installments(PaymentType::Debit, 2).is_err());

        assert!(validate_installments(PaymentType::Credit, 1).is_ok());
        assert!(validate_installments(PaymentType::Credit, MAX_CREDIT_INSTALLMENTS).is_ok());
        assert!(validate_installments(PaymentType::Credit, 0).is_err());
        assert!(validate_installments(PaymentType::Credit, 25).is_err());
    }

    #[test]
    fn test_validate_rate_percent() {
        assert!(validate_rate_percent("rate", 0.0).is_ok());
        assert!(validate_rate_percent("rate", 19.99).is_ok());
        assert!(matches!(
            validate_rate_percent("rate", -1.0),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
        assert!(matches!(
            validate_rate_percent("rate", f64::NAN),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_amount_names_field() {
        let err = validate_amount("total_price", -10.0).unwrap_err();
        assert_eq!(err.to_string(), "total_price must not be negative");
    }

    #[test]
    fn test_validate_passenger_count() {
        assert!(validate_passenger_count(1).is_ok());
        assert!(validate_passenger_count(MAX_PASSENGERS).is_ok());
        assert!(validate_passenger_count(0).is_err());
        assert!(validate_passenger_count(MAX_PASSENGERS + 1).is_err());
    }

    #[test]
    fn test_validate_passenger_name() {
        assert_eq!(validate_passenger_name("  Ana Souza ").unwrap(), "Ana Souza");
        assert!(validate_passenger_name("   ").is_err());
        assert!(validate_passenger_name(&"A".repeat(121)).is_err());
    }

    #[test]
    fn test_validate_pnr() {
        assert_eq!(validate_pnr("xyz789").unwrap(), "XYZ789");
        assert!(validate_pnr("XYZ78").is_err());
        assert!(validate_pnr("XYZ7890").is_err());
        assert!(validate_pnr("XY Z78").is_err());
    }
}
