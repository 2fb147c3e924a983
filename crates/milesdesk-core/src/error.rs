//! # Error Types
//!
//! Domain-specific error types for milesdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  milesdesk-core errors (this file)                                     │
//! │  ├── CoreError        - Conversion / state machine failures            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  milesdesk-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures (wraps CoreError)  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller / UI message     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recoverability
//! Every variant here is locally recoverable. `AlreadyConverted` is not even
//! a failure from the user's point of view: it carries the sale the caller
//! should navigate to.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The quote was already promoted to a sale.
    ///
    /// ## When This Occurs
    /// - A second click on "convert" after the first one succeeded
    /// - Two sessions converting the same quote concurrently
    ///
    /// ## User Workflow
    /// ```text
    /// convert(quote) ──► convertedToSaleId = "S-1" already set
    ///      │
    ///      ▼
    /// AlreadyConverted { sale_id: "S-1" }
    ///      │
    ///      ▼
    /// UI navigates to sale S-1 (no new sale is created)
    /// ```
    #[error("Quote {quote_id} was already converted into sale {sale_id}")]
    AlreadyConverted { quote_id: String, sale_id: String },

    /// Required segment fields are missing at conversion time.
    ///
    /// `missing` lists human-readable descriptions such as
    /// `"segment 2: destination"`.
    #[error("Incomplete segments: {}", missing.join(", "))]
    IncompleteSegments { missing: Vec<String> },

    /// The computed final price is zero or negative.
    #[error("Final price must be greater than zero (got {price:.2})")]
    ZeroOrNegativePrice { price: f64 },

    /// Quote is not in a state that allows the requested transition.
    #[error("Quote {quote_id} is {current_status}, cannot perform operation")]
    InvalidQuoteStatus {
        quote_id: String,
        current_status: String,
    },

    /// Number of passenger identities does not match the sale.
    #[error("Sale has {expected} passengers but {provided} identities were provided")]
    PassengerMismatch { expected: u32, provided: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the existing sale id when the error is `AlreadyConverted`.
    pub fn existing_sale_id(&self) -> Option<&str> {
        match self {
            CoreError::AlreadyConverted { sale_id, .. } => Some(sale_id),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid PNR, invalid number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., two configs for the same installment count).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
