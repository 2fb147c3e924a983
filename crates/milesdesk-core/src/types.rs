//! # Domain Types
//!
//! Quotes, sales and tickets.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Quote       │   │      Sale       │   │     Ticket      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │──►│  id (UUID)      │──►│  id (UUID)      │       │
//! │  │  customer       │   │  quote_id       │   │  sale_id (FK)   │       │
//! │  │  QuoteSegments  │   │  SaleSegments   │   │  passenger      │       │
//! │  │  total_price    │   │  price_total    │   │  route (shared) │       │
//! │  │  status         │   │  profit, margin │   │  pnr (shared)   │       │
//! │  │  converted_to_  │   │  payment terms  │   └─────────────────┘       │
//! │  │    sale_id      │   └─────────────────┘                              │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │  QuoteStatus    │   │ PaymentMethod   │                              │
//! │  │  ─────────────  │   │  ─────────────  │                              │
//! │  │  Pending        │   │  Pix, Cash,     │                              │
//! │  │  Sent           │   │  BankTransfer   │                              │
//! │  │  Converted      │   │  Debit, Credit  │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Miles Semantics
//! Quote miles are always per passenger. Sale miles are always per-trip
//! totals that already include every passenger. The segment types in
//! [`crate::segments`] keep the two apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::interest::{compute_installment, resolve_rate, PaymentInterestConfig, PaymentType};
use crate::pricing::{calculate, PricingBreakdown, PricingDefaults, PricingInput};
use crate::segments::{QuoteSegments, SaleSegments, TripType, CURRENT_SCHEMA_VERSION};
use crate::validation::{validate_amount, validate_installments, validate_passenger_count};

// =============================================================================
// Customer
// =============================================================================

/// Who the quote or sale is for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Customer {
    pub fn named(name: impl Into<String>) -> Self {
        Customer {
            name: name.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Quote Status
// =============================================================================

/// Lifecycle of a quote.
///
/// ```text
/// Pending ──► Sent ──► Converted (terminal)
///    │                    ▲
///    └────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Draft being priced.
    #[default]
    Pending,
    /// Sent to the customer.
    Sent,
    /// Promoted to a sale. Entered exactly once.
    Converted,
}

impl QuoteStatus {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self, next),
            (QuoteStatus::Pending, QuoteStatus::Sent)
                | (QuoteStatus::Pending, QuoteStatus::Converted)
                | (QuoteStatus::Sent, QuoteStatus::Converted)
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == QuoteStatus::Converted
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Converted => "converted",
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Instant bank payment.
    #[default]
    Pix,
    Cash,
    BankTransfer,
    /// Debit card. Always one installment.
    Debit,
    /// Credit card. Up to 24 installments.
    Credit,
}

impl PaymentMethod {
    /// Card methods map onto the interest table; the rest never carry a
    /// surcharge.
    pub fn payment_type(&self) -> Option<PaymentType> {
        match self {
            PaymentMethod::Debit => Some(PaymentType::Debit),
            PaymentMethod::Credit => Some(PaymentType::Credit),
            PaymentMethod::Pix | PaymentMethod::Cash | PaymentMethod::BankTransfer => None,
        }
    }
}

// =============================================================================
// Quote
// =============================================================================

/// A non-binding price estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub customer: Customer,
    /// Zero is read as one passenger.
    pub passengers: u32,
    /// Per-passenger miles. Carries the trip type as its tag.
    pub segments: QuoteSegments,
    /// Quote-level miles per passenger, used when a legacy one-way segment
    /// carried none.
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miles_needed: Option<f64>,
    /// Price for all passengers. Zero while still a draft.
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub boarding_fee_per_passenger: f64,
    /// BRL per 1000 miles.
    #[serde(default, alias = "costPerMile")]
    pub cost_per_thousand_miles: f64,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default)]
    pub converted_to_sale_id: Option<String>,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub converted_at: Option<DateTime<Utc>>,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl Quote {
    /// Creates a pending draft with no price yet.
    pub fn new(customer: Customer, passengers: u32, segments: QuoteSegments) -> Self {
        let now = Utc::now();
        Quote {
            id: uuid::Uuid::new_v4().to_string(),
            customer,
            passengers,
            segments,
            miles_needed: None,
            total_price: 0.0,
            boarding_fee_per_passenger: 0.0,
            cost_per_thousand_miles: 0.0,
            status: QuoteStatus::Pending,
            converted_to_sale_id: None,
            converted_at: None,
            notes: None,
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn trip_type(&self) -> TripType {
        self.segments.trip_type()
    }

    /// `passengers || 1`
    #[inline]
    pub fn passenger_count(&self) -> u32 {
        self.passengers.max(1)
    }

    #[inline]
    pub fn is_converted(&self) -> bool {
        self.converted_to_sale_id.is_some()
    }

    /// Checks the fields an agent types in before the quote is stored.
    ///
    /// Legacy rows may carry zero passengers; anything written now needs
    /// 1 to [`MAX_PASSENGERS`](crate::MAX_PASSENGERS) and non-negative money.
    pub fn validate(&self) -> CoreResult<()> {
        validate_passenger_count(self.passengers)?;
        validate_amount("total_price", self.total_price)?;
        validate_amount("cost_per_thousand_miles", self.cost_per_thousand_miles)?;
        validate_amount("boarding_fee_per_passenger", self.boarding_fee_per_passenger)?;
        if let Some(miles) = self.miles_needed {
            validate_amount("miles_needed", miles)?;
        }
        Ok(())
    }

    /// Calculator input for pricing this draft.
    ///
    /// A quote that already has a total price is priced at that total;
    /// otherwise the suggested price applies.
    pub fn pricing_input(&self) -> PricingInput {
        let passengers = self.passenger_count();
        let manual = if self.total_price > 0.0 {
            Some(self.total_price / f64::from(passengers))
        } else {
            None
        };

        PricingInput {
            miles_per_passenger: self.segments.per_passenger_miles(),
            cost_per_thousand_miles: self.cost_per_thousand_miles,
            boarding_fee_per_passenger: self.boarding_fee_per_passenger,
            passenger_count: passengers,
            target_markup_percent: None,
            manual_price_per_passenger: manual,
        }
    }

    /// Prices the quote, filling unset cost, fee and markup from `defaults`.
    pub fn price_quote(&self, defaults: &PricingDefaults) -> PricingBreakdown {
        calculate(&self.pricing_input().with_defaults(defaults))
    }

    /// Pending → Sent.
    pub fn mark_sent(&mut self) -> CoreResult<()> {
        self.transition(QuoteStatus::Sent)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the sale this quote became. Only ever succeeds once.
    pub fn link_sale(&mut self, sale_id: impl Into<String>, at: DateTime<Utc>) -> CoreResult<()> {
        if let Some(existing) = &self.converted_to_sale_id {
            return Err(CoreError::AlreadyConverted {
                quote_id: self.id.clone(),
                sale_id: existing.clone(),
            });
        }

        self.transition(QuoteStatus::Converted)?;
        self.converted_to_sale_id = Some(sale_id.into());
        self.converted_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    fn transition(&mut self, next: QuoteStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidQuoteStatus {
                quote_id: self.id.clone(),
                current_status: self.status.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A confirmed, priced transaction.
///
/// Money values are unrounded; format them with [`crate::money`] for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    /// Quote this sale was converted from, if any.
    pub quote_id: Option<String>,
    pub customer: Customer,
    pub passengers: u32,
    /// Per-trip totals. Carries the trip type as its tag.
    pub segments: SaleSegments,
    /// Base price for all passengers, before card surcharge.
    pub price_total: f64,
    pub boarding_fee_total: f64,
    pub miles_used_total: f64,
    pub total_cost: f64,
    /// `price_total - total_cost`
    pub profit: f64,
    pub profit_margin_percent: f64,
    pub payment_method: PaymentMethod,
    pub installments: u32,
    pub interest_rate_percent: f64,
    /// Amount the customer pays including surcharge.
    pub final_amount: f64,
    pub installment_value: f64,
    pub schema_version: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn trip_type(&self) -> TripType {
        self.segments.trip_type()
    }

    /// Route text printed on every ticket.
    pub fn route_text(&self) -> String {
        self.segments.route_text()
    }

    /// Sets the payment method and resolves its surcharge.
    ///
    /// ## Rules
    /// - Pix, cash, bank transfer: 1 installment, no surcharge
    /// - Debit: always 1 installment, rate from the table (0 if absent)
    /// - Credit: 1 to 24 installments, rate from the table (0 if absent)
    ///
    /// Profit stays computed on the base price; the surcharge belongs to
    /// the card processor.
    pub fn apply_payment_terms(
        &mut self,
        configs: &[PaymentInterestConfig],
        method: PaymentMethod,
        installments: u32,
    ) -> CoreResult<()> {
        let split = match method.payment_type() {
            Some(payment_type) => {
                let installments = payment_type.effective_installments(installments);
                validate_installments(payment_type, installments)?;
                let rate = resolve_rate(configs, payment_type, installments);
                compute_installment(self.price_total, installments, rate)
            }
            None => compute_installment(self.price_total, 1, 0.0),
        };

        self.payment_method = method;
        self.installments = split.installments;
        self.interest_rate_percent = split.interest_rate_percent;
        self.final_amount = split.final_price;
        self.installment_value = split.installment_value;
        Ok(())
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// Passenger identity as typed at issuance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub name: String,
    /// CPF or passport number.
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl Passenger {
    pub fn new(name: impl Into<String>) -> Self {
        Passenger {
            name: name.into(),
            document: None,
        }
    }
}

/// One passenger's ticket on a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub sale_id: String,
    pub passenger_name: String,
    pub passenger_document: Option<String>,
    /// Same on every ticket of the sale.
    pub route: String,
    /// Same on every ticket of the sale.
    pub pnr: String,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::segments::{FlightSegment, RoundTripQuote};

    fn one_way_quote() -> Quote {
        let mut quote = Quote::new(
            Customer::named("Maria Lima"),
            1,
            QuoteSegments::OneWay {
                segment: FlightSegment::new("GRU", "LIS", "2026-03-10", 50_000.0),
            },
        );
        quote.cost_per_thousand_miles = 29.0;
        quote.boarding_fee_per_passenger = 35.0;
        quote
    }

    fn sale(price_total: f64) -> Sale {
        Sale {
            id: "S-1".to_string(),
            quote_id: None,
            customer: Customer::named("Maria Lima"),
            passengers: 1,
            segments: SaleSegments::OneWay {
                segment: FlightSegment::new("GRU", "LIS", "", 50_000.0),
            },
            price_total,
            boarding_fee_total: 35.0,
            miles_used_total: 50_000.0,
            total_cost: 1485.0,
            profit: price_total - 1485.0,
            profit_margin_percent: 0.0,
            payment_method: PaymentMethod::Pix,
            installments: 1,
            interest_rate_percent: 0.0,
            final_amount: price_total,
            installment_value: price_total,
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: Utc::now(),
        }
    }

    /// Absent optionals are left out of the JSON, and the TS binding says so.
    #[test]
    fn test_optional_fields_are_optional_in_json_and_bindings() {
        let json = serde_json::to_value(Customer::named("Ana")).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Ana" }));

        let decl = Customer::decl();
        assert!(decl.contains("email?: string"), "{decl}");
        assert!(!decl.contains("| null"), "{decl}");
        assert!(Quote::decl().contains("notes?: string"));
        assert!(Passenger::decl().contains("document?: string"));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(one_way_quote().validate().is_ok());

        let mut quote = one_way_quote();
        quote.passengers = 10;
        assert!(matches!(
            quote.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut quote = one_way_quote();
        quote.passengers = 0;
        assert!(quote.validate().is_err());

        let mut quote = one_way_quote();
        quote.cost_per_thousand_miles = -29.0;
        let err = quote.validate().unwrap_err();
        assert!(err.to_string().contains("cost_per_thousand_miles"));

        let mut quote = one_way_quote();
        quote.boarding_fee_per_passenger = f64::NAN;
        assert!(quote.validate().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(QuoteStatus::Pending.can_transition_to(QuoteStatus::Sent));
        assert!(QuoteStatus::Pending.can_transition_to(QuoteStatus::Converted));
        assert!(QuoteStatus::Sent.can_transition_to(QuoteStatus::Converted));

        assert!(!QuoteStatus::Sent.can_transition_to(QuoteStatus::Pending));
        assert!(!QuoteStatus::Converted.can_transition_to(QuoteStatus::Sent));
        assert!(!QuoteStatus::Converted.can_transition_to(QuoteStatus::Converted));
        assert!(QuoteStatus::Converted.is_terminal());
    }

    #[test]
    fn test_mark_sent_then_link_sale() {
        let mut quote = one_way_quote();
        quote.mark_sent().unwrap();
        assert_eq!(quote.status, QuoteStatus::Sent);
        assert!(quote.mark_sent().is_err());

        let at = Utc::now();
        quote.link_sale("S-1", at).unwrap();
        assert_eq!(quote.status, QuoteStatus::Converted);
        assert_eq!(quote.converted_to_sale_id.as_deref(), Some("S-1"));
        assert_eq!(quote.converted_at, Some(at));
    }

    #[test]
    fn test_link_sale_twice_reports_existing_sale() {
        let mut quote = one_way_quote();
        quote.link_sale("S-1", Utc::now()).unwrap();

        let err = quote.link_sale("S-2", Utc::now()).unwrap_err();
        assert_eq!(err.existing_sale_id(), Some("S-1"));
        assert_eq!(quote.converted_to_sale_id.as_deref(), Some("S-1"));
    }

    #[test]
    fn test_price_quote_uses_defaults_for_drafts() {
        let quote = one_way_quote();
        let defaults = PricingDefaults {
            target_markup_percent: 20.0,
            ..Default::default()
        };

        let b = quote.price_quote(&defaults);
        assert!((b.suggested_price_per_passenger - 1775.0).abs() < 1e-9);
        assert!((b.final_price_total - 1775.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_quote_respects_total_price() {
        let mut quote = one_way_quote();
        quote.passengers = 2;
        quote.total_price = 4000.0;

        let b = quote.price_quote(&PricingDefaults::default());
        assert!((b.final_price_total - 4000.0).abs() < 1e-9);
        assert!((b.total_cost - 2970.0).abs() < 1e-9);
        assert!((b.profit - 1030.0).abs() < 1e-9);
    }

    #[test]
    fn test_passenger_count_defaults_to_one() {
        let mut quote = one_way_quote();
        quote.passengers = 0;
        assert_eq!(quote.passenger_count(), 1);
    }

    #[test]
    fn test_quote_accepts_legacy_cost_field_name() {
        let quote = one_way_quote();
        let mut json = serde_json::to_value(&quote).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.remove("costPerThousandMiles");
        obj.insert("costPerMile".to_string(), serde_json::json!(31.5));

        let decoded: Quote = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.cost_per_thousand_miles, 31.5);
    }

    #[test]
    fn test_round_trip_quote_serializes_with_tag() {
        let quote = Quote::new(
            Customer::named("João"),
            2,
            QuoteSegments::RoundTrip {
                trip: RoundTripQuote {
                    origin: "GRU".into(),
                    destination: "MCO".into(),
                    ..Default::default()
                },
            },
        );
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["segments"]["tripType"], "round_trip");
        assert_eq!(quote.trip_type(), TripType::RoundTrip);
    }

    #[test]
    fn test_apply_payment_terms_credit() {
        let configs = vec![PaymentInterestConfig::new(PaymentType::Credit, 3, 6.0).unwrap()];
        let mut sale = sale(1000.0);

        sale.apply_payment_terms(&configs, PaymentMethod::Credit, 3).unwrap();
        assert_eq!(sale.installments, 3);
        assert_eq!(sale.interest_rate_percent, 6.0);
        assert!((sale.final_amount - 1060.0).abs() < 1e-9);
        assert!((sale.installment_value - 353.333_333).abs() < 1e-5);
        assert_eq!(sale.price_total, 1000.0);
    }

    #[test]
    fn test_apply_payment_terms_unknown_config_is_zero_rate() {
        let mut sale = sale(1000.0);
        sale.apply_payment_terms(&[], PaymentMethod::Credit, 4).unwrap();
        assert_eq!(sale.interest_rate_percent, 0.0);
        assert_eq!(sale.installment_value, 250.0);
    }

    #[test]
    fn test_apply_payment_terms_debit_and_pix() {
        let configs = vec![PaymentInterestConfig::new(PaymentType::Debit, 1, 1.5).unwrap()];
        let mut sale = sale(1000.0);

        sale.apply_payment_terms(&configs, PaymentMethod::Debit, 6).unwrap();
        assert_eq!(sale.installments, 1);
        assert!((sale.final_amount - 1015.0).abs() < 1e-9);

        sale.apply_payment_terms(&configs, PaymentMethod::Pix, 6).unwrap();
        assert_eq!(sale.installments, 1);
        assert_eq!(sale.interest_rate_percent, 0.0);
        assert_eq!(sale.final_amount, 1000.0);
    }

    #[test]
    fn test_apply_payment_terms_rejects_too_many_installments() {
        let mut sale = sale(1000.0);
        let err = sale
            .apply_payment_terms(&[], PaymentMethod::Credit, 30)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(sale.payment_method, PaymentMethod::Pix);
    }
}
