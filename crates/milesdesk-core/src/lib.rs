//! # milesdesk-core: Pricing Engine for MilesDesk
//!
//! This crate is the **heart** of MilesDesk, a back office for agencies that
//! resell airline miles. It prices quotes, resolves card surcharges and turns
//! quotes into sales, all as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MilesDesk Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (web forms)                         │   │
//! │  │    Quote form ──► Pricing panel ──► Checkout ──► Tickets        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed DTOs (ts-rs bindings)            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ milesdesk-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  number  │ │ pricing  │ │ interest │ │    segments      │  │   │
//! │  │   │  parse   │ │ cost /   │ │ rate     │ │ quote ⇄ sale     │  │   │
//! │  │   │  "1.234" │ │ margin   │ │ table    │ │ shapes           │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐                        │   │
//! │  │   │  types   │ │conversion│ │ tickets  │                        │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘                        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  milesdesk-db (Database Layer)                  │   │
//! │  │     SQLite repositories, convert-once guard, configuration      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`number`] - Locale-tolerant number parsing (`"1.234,56"`, `"2.970"`)
//! - [`money`] - BRL display formatting (the only place values are rounded)
//! - [`pricing`] - Cost, suggested price, profit, margin and markup
//! - [`interest`] - Card surcharge table and flat-fee installment split
//! - [`segments`] - Tagged segment model and mileage aggregation
//! - [`types`] - Quote, Sale, Ticket
//! - [`conversion`] - Quote → Sale
//! - [`tickets`] - One ticket per passenger
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output (ids and timestamps aside)
//! 2. **No I/O**: the interest table is always passed in by the caller
//! 3. **Round Late**: money is `f64` end to end, rounded only for display
//! 4. **Never Throw on Arithmetic**: NaN and missing numbers become zero
//!
//! ## Example Usage
//!
//! ```rust
//! use milesdesk_core::pricing::{calculate, PricingInput};
//! use milesdesk_core::money::format_brl;
//!
//! let breakdown = calculate(&PricingInput {
//!     miles_per_passenger: 50_000.0,
//!     cost_per_thousand_miles: 29.0,
//!     boarding_fee_per_passenger: 35.0,
//!     passenger_count: 1,
//!     target_markup_percent: Some(20.0),
//!     manual_price_per_passenger: None,
//! });
//!
//! assert_eq!(format_brl(breakdown.total_cost), "R$ 1.485,00");
//! assert_eq!(format_brl(breakdown.suggested_price_per_passenger), "R$ 1.775,00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod conversion;
pub mod error;
pub mod interest;
pub mod money;
pub mod number;
pub mod pricing;
pub mod segments;
pub mod tickets;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use conversion::{convert, ConversionOptions};
pub use error::{CoreError, CoreResult, ValidationError};
pub use interest::{PaymentInterestConfig, PaymentType};
pub use number::parse_decimal;
pub use pricing::{PricingBreakdown, PricingDefaults, PricingInput};
pub use segments::{QuoteSegments, SaleSegments, TripType};
pub use tickets::issue_tickets;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Highest installment count offered on credit cards.
pub const MAX_CREDIT_INSTALLMENTS: u32 = 24;

/// Passengers on one booking locator.
pub const MAX_PASSENGERS: u32 = 9;

/// Length of an airline booking locator.
pub const PNR_LENGTH: usize = 6;
