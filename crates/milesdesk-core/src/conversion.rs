//! # Quote → Sale Conversion
//!
//! Turns a priced quote into a sale record ready for persistence.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  convert(quote, options, configs)                                       │
//! │                                                                         │
//! │  1. converted_to_sale_id set?  ──YES──► Err(AlreadyConverted{sale_id})  │
//! │  2. passengers = quote.passengers || 1                                  │
//! │  3. QuoteSegments ──to_sale_segments(pax)──► SaleSegments               │
//! │        one way with no miles: quote.miles_needed                        │
//! │        any origin/destination missing? ──► Err(IncompleteSegments)      │
//! │  4. final price = quote.total_price                                     │
//! │        <= 0? ──────────────────────────► Err(ZeroOrNegativePrice)       │
//! │  5. total miles + price ──calculate──► total cost, profit, margin       │
//! │  6. payment method ──interest table──► installments, final amount       │
//! │                                                                         │
//! │  Ok(Sale)   nothing is persisted and the quote is NOT touched           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Linking the quote back (`Quote::link_sale`) happens only after the sale
//! is stored. The storage layer does that with a conditional write so that
//! two concurrent conversions cannot both succeed.

use std::borrow::Cow;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::interest::PaymentInterestConfig;
use crate::number::finite_or_zero;
use crate::pricing::{calculate, margin_percent, PricingInput};
use crate::segments::{QuoteSegments, CURRENT_SCHEMA_VERSION};
use crate::types::{PaymentMethod, Quote, QuoteStatus, Sale};

/// Payment terms chosen at conversion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    pub payment_method: PaymentMethod,
    pub installments: u32,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptions {
            payment_method: PaymentMethod::Pix,
            installments: 1,
        }
    }
}

impl ConversionOptions {
    pub fn new(payment_method: PaymentMethod, installments: u32) -> Self {
        ConversionOptions {
            payment_method,
            installments,
        }
    }
}

/// Builds the sale for `quote`.
///
/// ## Errors
/// - `AlreadyConverted` carrying the existing sale id
/// - `IncompleteSegments` when an origin or destination is blank
/// - `ZeroOrNegativePrice` when the quote has no positive total price
/// - `Validation` for installment counts the payment method cannot take
///
/// ## Example
/// ```rust
/// use milesdesk_core::conversion::{convert, ConversionOptions};
/// use milesdesk_core::segments::{FlightSegment, QuoteSegments};
/// use milesdesk_core::types::{Customer, Quote};
///
/// let mut quote = Quote::new(
///     Customer::named("Ana"),
///     2,
///     QuoteSegments::OneWay {
///         segment: FlightSegment::new("GRU", "SDU", "2026-02-01", 10_000.0),
///     },
/// );
/// quote.total_price = 800.0;
/// quote.cost_per_thousand_miles = 25.0;
///
/// let sale = convert(&quote, &ConversionOptions::default(), &[]).unwrap();
/// assert_eq!(sale.miles_used_total, 20_000.0);
/// assert_eq!(sale.total_cost, 500.0);
/// assert_eq!(sale.profit, 300.0);
/// ```
pub fn convert(
    quote: &Quote,
    options: &ConversionOptions,
    configs: &[PaymentInterestConfig],
) -> CoreResult<Sale> {
    if let Some(sale_id) = &quote.converted_to_sale_id {
        return Err(CoreError::AlreadyConverted {
            quote_id: quote.id.clone(),
            sale_id: sale_id.clone(),
        });
    }
    if quote.status == QuoteStatus::Converted {
        return Err(CoreError::InvalidQuoteStatus {
            quote_id: quote.id.clone(),
            current_status: quote.status.to_string(),
        });
    }

    let passengers = quote.passenger_count();

    let segments = effective_segments(quote).to_sale_segments(passengers);
    let missing = segments.missing_fields();
    if !missing.is_empty() {
        return Err(CoreError::IncompleteSegments { missing });
    }

    let price_total = finite_or_zero(quote.total_price);
    if price_total <= 0.0 {
        return Err(CoreError::ZeroOrNegativePrice {
            price: quote.total_price,
        });
    }

    let totals = segments.totals(passengers);
    let breakdown = calculate(&PricingInput {
        miles_per_passenger: totals.per_passenger_miles,
        cost_per_thousand_miles: quote.cost_per_thousand_miles,
        boarding_fee_per_passenger: quote.boarding_fee_per_passenger,
        passenger_count: passengers,
        target_markup_percent: None,
        manual_price_per_passenger: Some(price_total / f64::from(passengers)),
    });

    // The quote's total is authoritative; the per-passenger split above is
    // only there to drive the cost side of the calculator.
    let profit = price_total - breakdown.total_cost;

    let mut sale = Sale {
        id: uuid::Uuid::new_v4().to_string(),
        quote_id: Some(quote.id.clone()),
        customer: quote.customer.clone(),
        passengers,
        segments,
        price_total,
        boarding_fee_total: finite_or_zero(quote.boarding_fee_per_passenger)
            * f64::from(passengers),
        miles_used_total: totals.total_miles,
        total_cost: breakdown.total_cost,
        profit,
        profit_margin_percent: margin_percent(profit, price_total),
        payment_method: PaymentMethod::default(),
        installments: 1,
        interest_rate_percent: 0.0,
        final_amount: price_total,
        installment_value: price_total,
        schema_version: CURRENT_SCHEMA_VERSION,
        created_at: Utc::now(),
    };
    sale.apply_payment_terms(configs, options.payment_method, options.installments)?;

    Ok(sale)
}

/// One-way quotes from the old screen kept their miles on the quote.
fn effective_segments(quote: &Quote) -> Cow<'_, QuoteSegments> {
    if let QuoteSegments::OneWay { segment } = &quote.segments {
        let fallback = quote.miles_needed.map(finite_or_zero).filter(|m| *m > 0.0);
        if finite_or_zero(segment.miles) <= 0.0 {
            if let Some(miles) = fallback {
                return Cow::Owned(QuoteSegments::OneWay {
                    segment: segment.with_miles(miles),
                });
            }
        }
    }
    Cow::Borrowed(&quote.segments)
}

// =============================================================================
// Unit Tests
// =============================================================================
