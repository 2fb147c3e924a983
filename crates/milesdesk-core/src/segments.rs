//! # Flight Segments
//!
//! Segment shapes and mileage aggregation.
//!
//! ## Two Shapes, Three Trip Types
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        QUOTE SHAPE (per passenger)                      │
//! │                                                                         │
//! │  OneWay     { segment }                     miles = per pax             │
//! │  RoundTrip  { trip: origin, destination,    ONE combined record         │
//! │               milesOutbound, milesReturn }  miles = per pax             │
//! │  MultiCity  { segments: [..] }              miles = per pax each        │
//! │                                                                         │
//! │                    │ to_sale_segments(passengers)                       │
//! │                    ▼                                                    │
//! │                                                                         │
//! │                        SALE SHAPE (per-trip totals)                     │
//! │                                                                         │
//! │  OneWay     { segment }                     miles = per pax × pax       │
//! │  RoundTrip  { outbound, inbound }           TWO discrete segments       │
//! │  MultiCity  { segments: [..] }              miles = per pax × pax       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stored Documents
//! Schema version 2 stores the tagged enums below as JSON. Version 1 records
//! (written before the tag existed) are a loose list of [`SegmentRecord`]s
//! whose field names drifted over time (`milesOutbound` / `miles_ida`,
//! `origin` / `from`, ...). They are normalised exactly once, on read, by
//! [`QuoteSegments::decode`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::number::{deserialize_lenient, finite_or_zero};

/// Schema version written by this crate.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// First schema version with tagged segment documents.
pub const TAGGED_SCHEMA_VERSION: u32 = 2;

// =============================================================================
// Trip Type
// =============================================================================

/// Kind of itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
    MultiCity,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::OneWay => "one_way",
            TripType::RoundTrip => "round_trip",
            TripType::MultiCity => "multi_city",
        }
    }
}

impl std::fmt::Display for TripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether segment miles are per passenger (quote) or per-trip totals (sale).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentShape {
    Quote,
    Sale,
}

// =============================================================================
// Flight Segment
// =============================================================================

/// A single flown leg.
///
/// `miles` is per passenger inside a quote and the per-trip total inside a
/// sale. The surrounding type tells you which.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FlightSegment {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub miles: f64,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boarding_fee: Option<f64>,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl FlightSegment {
    pub fn new(from: impl Into<String>, to: impl Into<String>, date: impl Into<String>, miles: f64) -> Self {
        FlightSegment {
            from: from.into(),
            to: to.into(),
            date: date.into(),
            miles,
            ..Default::default()
        }
    }

    /// `GRU → LIS`
    pub fn route(&self) -> String {
        format!("{} → {}", self.from.trim(), self.to.trim())
    }

    pub(crate) fn with_miles(&self, miles: f64) -> Self {
        FlightSegment {
            miles,
            ..self.clone()
        }
    }
}

/// Round trip as a quote stores it: one combined record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RoundTripQuote {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub departure_date: String,
    #[serde(default)]
    pub return_date: String,
    /// Per passenger.
    #[serde(default)]
    pub miles_outbound: f64,
    /// Per passenger.
    #[serde(default)]
    pub miles_return: f64,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boarding_fee: Option<f64>,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[ts(optional)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_time: Option<String>,
}

/// Per-passenger and total miles for an itinerary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MileageTotals {
    pub per_passenger_miles: f64,
    pub total_miles: f64,
}

impl MileageTotals {
    fn from_per_passenger(per_passenger_miles: f64, passengers: u32) -> Self {
        let per_passenger_miles = finite_or_zero(per_passenger_miles);
        MileageTotals {
            per_passenger_miles,
            total_miles: per_passenger_miles * f64::from(passengers),
        }
    }

    fn from_total(total_miles: f64, passengers: u32) -> Self {
        let total_miles = finite_or_zero(total_miles);
        MileageTotals {
            per_passenger_miles: total_miles / f64::from(passengers.max(1)),
            total_miles,
        }
    }
}

// =============================================================================
// Quote Shape
// =============================================================================

/// Segments of a quote. Miles are per passenger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "tripType", rename_all = "snake_case")]
pub enum QuoteSegments {
    OneWay { segment: FlightSegment },
    RoundTrip { trip: RoundTripQuote },
    MultiCity { segments: Vec<FlightSegment> },
}

impl QuoteSegments {
    pub fn trip_type(&self) -> TripType {
        match self {
            QuoteSegments::OneWay { .. } => TripType::OneWay,
            QuoteSegments::RoundTrip { .. } => TripType::RoundTrip,
            QuoteSegments::MultiCity { .. } => TripType::MultiCity,
        }
    }

    /// Miles one passenger consumes across the whole itinerary.
    pub fn per_passenger_miles(&self) -> f64 {
        match self {
            QuoteSegments::OneWay { segment } => finite_or_zero(segment.miles),
            QuoteSegments::RoundTrip { trip } => {
                finite_or_zero(trip.miles_outbound) + finite_or_zero(trip.miles_return)
            }
            QuoteSegments::MultiCity { segments } => {
                segments.iter().map(|s| finite_or_zero(s.miles)).sum()
            }
        }
    }

    /// Aggregates miles: `total = per passenger × passengers`.
    pub fn totals(&self, passengers: u32) -> MileageTotals {
        MileageTotals::from_per_passenger(self.per_passenger_miles(), passengers)
    }

    /// Remaps into sale shape, multiplying every leg by `passengers`.
    ///
    /// ## Example
    /// ```rust
    /// use milesdesk_core::segments::{QuoteSegments, RoundTripQuote};
    ///
    /// let quote = QuoteSegments::RoundTrip {
    ///     trip: RoundTripQuote {
    ///         origin: "GRU".into(),
    ///         destination: "LIS".into(),
    ///         miles_outbound: 25_000.0,
    ///         miles_return: 25_000.0,
    ///         ..Default::default()
    ///     },
    /// };
    ///
    /// let sale = quote.to_sale_segments(2);
    /// let legs = sale.legs();
    /// assert_eq!(legs.len(), 2);
    /// assert_eq!(legs[0].miles, 50_000.0);
    /// assert_eq!(legs[1].from, "LIS");
    /// ```
    pub fn to_sale_segments(&self, passengers: u32) -> SaleSegments {
        let pax = f64::from(passengers);
        match self {
            QuoteSegments::OneWay { segment } => SaleSegments::OneWay {
                segment: segment.with_miles(finite_or_zero(segment.miles) * pax),
            },
            QuoteSegments::RoundTrip { trip } => SaleSegments::RoundTrip {
                outbound: FlightSegment {
                    from: trip.origin.clone(),
                    to: trip.destination.clone(),
                    date: trip.departure_date.clone(),
                    miles: finite_or_zero(trip.miles_outbound) * pax,
                    boarding_fee: trip.boarding_fee,
                    airline: trip.airline.clone(),
                    time: trip.departure_time.clone(),
                },
                inbound: FlightSegment {
                    from: trip.destination.clone(),
                    to: trip.origin.clone(),
                    date: trip.return_date.clone(),
                    miles: finite_or_zero(trip.miles_return) * pax,
                    boarding_fee: trip.boarding_fee,
                    airline: trip.airline.clone(),
                    time: trip.return_time.clone(),
                },
            },
            QuoteSegments::MultiCity { segments } => SaleSegments::MultiCity {
                segments: segments
                    .iter()
                    .map(|s| s.with_miles(finite_or_zero(s.miles) * pax))
                    .collect(),
            },
        }
    }

    /// Builds the tagged form from loose legacy records.
    ///
    /// `miles_needed` is the quote-level fallback older one-way quotes used
    /// when the segment itself carried no miles.
    pub fn from_records(
        trip_type: TripType,
        records: &[SegmentRecord],
        miles_needed: Option<f64>,
    ) -> QuoteSegments {
        let first = records.first().cloned().unwrap_or_default();

        match trip_type {
            TripType::OneWay => {
                let miles = first
                    .one_way_miles()
                    .or(miles_needed.map(finite_or_zero).filter(|m| *m > 0.0))
                    .unwrap_or(0.0);
                QuoteSegments::OneWay {
                    segment: first.to_segment(miles),
                }
            }
            TripType::RoundTrip => QuoteSegments::RoundTrip {
                trip: round_trip_from_records(records),
            },
            TripType::MultiCity => QuoteSegments::MultiCity {
                segments: records
                    .iter()
                    .map(|r| r.to_segment(r.miles.map(finite_or_zero).unwrap_or(0.0)))
                    .collect(),
            },
        }
    }

    /// Reads a stored segment document.
    ///
    /// ## Versions
    /// - `>= 2`: tagged [`QuoteSegments`] JSON
    /// - `< 2`: JSON array (or single object) of [`SegmentRecord`]
    pub fn decode(
        schema_version: u32,
        trip_type: TripType,
        json: &str,
        miles_needed: Option<f64>,
    ) -> Result<QuoteSegments, serde_json::Error> {
        if schema_version >= TAGGED_SCHEMA_VERSION {
            return serde_json::from_str(json);
        }

        let records = parse_records(json)?;
        Ok(QuoteSegments::from_records(trip_type, &records, miles_needed))
    }
}

fn round_trip_from_records(records: &[SegmentRecord]) -> RoundTripQuote {
    let first = records.first().cloned().unwrap_or_default();

    // Two discrete legs written by old clients: outbound then return.
    if records.len() >= 2 && first.miles_outbound.is_none() && first.miles_return.is_none() {
        let second = &records[1];
        return RoundTripQuote {
            origin: first.from.clone().unwrap_or_default(),
            destination: first.to.clone().unwrap_or_default(),
            departure_date: first.date.clone().unwrap_or_default(),
            return_date: second.date.clone().unwrap_or_default(),
            miles_outbound: first.miles.map(finite_or_zero).unwrap_or(0.0),
            miles_return: second.miles.map(finite_or_zero).unwrap_or(0.0),
            boarding_fee: first.boarding_fee,
            airline: first.airline.clone(),
            departure_time: first.time.clone(),
            return_time: second.time.clone(),
        };
    }

    RoundTripQuote {
        origin: first.from.clone().unwrap_or_default(),
        destination: first.to.clone().unwrap_or_default(),
        departure_date: first.date.clone().unwrap_or_default(),
        return_date: first.return_date.clone().unwrap_or_default(),
        miles_outbound: first.miles_outbound.map(finite_or_zero).unwrap_or(0.0),
        miles_return: first.miles_return.map(finite_or_zero).unwrap_or(0.0),
        boarding_fee: first.boarding_fee,
        airline: first.airline.clone(),
        departure_time: first.time.clone(),
        return_time: first.return_time.clone(),
    }
}

fn parse_records(json: &str) -> Result<Vec<SegmentRecord>, serde_json::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<SegmentRecord>),
        One(SegmentRecord),
    }

    Ok(match serde_json::from_str::<OneOrMany>(json)? {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![record],
    })
}

// =============================================================================
// Sale Shape
// =============================================================================

/// Segments of a sale. Miles are per-trip totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "tripType", rename_all = "snake_case")]
pub enum SaleSegments {
    OneWay { segment: FlightSegment },
    RoundTrip { outbound: FlightSegment, inbound: FlightSegment },
    MultiCity { segments: Vec<FlightSegment> },
}

impl SaleSegments {
    pub fn trip_type(&self) -> TripType {
        match self {
            SaleSegments::OneWay { .. } => TripType::OneWay,
            SaleSegments::RoundTrip { .. } => TripType::RoundTrip,
            SaleSegments::MultiCity { .. } => TripType::MultiCity,
        }
    }

    /// Legs in flying order.
    pub fn legs(&self) -> Vec<&FlightSegment> {
        match self {
            SaleSegments::OneWay { segment } => vec![segment],
            SaleSegments::RoundTrip { outbound, inbound } => vec![outbound, inbound],
            SaleSegments::MultiCity { segments } => segments.iter().collect(),
        }
    }

    /// Σ leg miles. Already includes every passenger.
    pub fn total_miles(&self) -> f64 {
        self.legs().iter().map(|s| finite_or_zero(s.miles)).sum()
    }

    /// Aggregates miles: `per passenger = total ÷ passengers`.
    pub fn totals(&self, passengers: u32) -> MileageTotals {
        MileageTotals::from_total(self.total_miles(), passengers)
    }

    /// Route text shared by every ticket: `GRU → LIS / LIS → GRU`.
    pub fn route_text(&self) -> String {
        self.legs()
            .iter()
            .map(|s| s.route())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// Reads a stored sale segment document.
    ///
    /// Version 1 rows hold loose records whose miles are already totals. A
    /// single combined round-trip record is split into its two legs.
    pub fn decode(
        schema_version: u32,
        trip_type: TripType,
        json: &str,
    ) -> Result<SaleSegments, serde_json::Error> {
        if schema_version >= TAGGED_SCHEMA_VERSION {
            return serde_json::from_str(json);
        }

        let records = parse_records(json)?;
        let first = records.first().cloned().unwrap_or_default();

        Ok(match trip_type {
            TripType::OneWay => SaleSegments::OneWay {
                segment: first.to_segment(first.one_way_miles().unwrap_or(0.0)),
            },
            TripType::RoundTrip if records.len() >= 2 => SaleSegments::RoundTrip {
                outbound: first.to_segment(first.miles.map(finite_or_zero).unwrap_or(0.0)),
                inbound: records[1].to_segment(records[1].miles.map(finite_or_zero).unwrap_or(0.0)),
            },
            TripType::RoundTrip => QuoteSegments::RoundTrip {
                trip: round_trip_from_records(&records),
            }
            .to_sale_segments(1),
            TripType::MultiCity => SaleSegments::MultiCity {
                segments: records
                    .iter()
                    .map(|r| r.to_segment(r.miles.map(finite_or_zero).unwrap_or(0.0)))
                    .collect(),
            },
        })
    }

    /// Describes every missing origin/destination, empty when complete.
    pub fn missing_fields(&self) -> Vec<String> {
        let legs = self.legs();
        if legs.is_empty() {
            return vec!["segments: at least one segment".to_string()];
        }

        let mut missing = Vec::new();
        for (index, leg) in legs.iter().enumerate() {
            if leg.from.trim().is_empty() {
                missing.push(format!("segment {}: origin", index + 1));
            }
            if leg.to.trim().is_empty() {
                missing.push(format!("segment {}: destination", index + 1));
            }
        }
        missing
    }
}

// =============================================================================
// Loose Records
// =============================================================================

/// A segment as older clients stored it. Every field is optional and numeric
/// fields accept typed text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    #[serde(default, alias = "origin")]
    pub from: Option<String>,
    #[serde(default, alias = "destination")]
    pub to: Option<String>,
    #[serde(default, alias = "departureDate", alias = "departure_date")]
    pub date: Option<String>,
    #[serde(default, alias = "return_date")]
    pub return_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub miles: Option<f64>,
    #[serde(default, alias = "miles_ida", deserialize_with = "deserialize_lenient")]
    pub miles_outbound: Option<f64>,
    #[serde(default, alias = "miles_volta", deserialize_with = "deserialize_lenient")]
    pub miles_return: Option<f64>,
    #[serde(default, alias = "boarding_fee", deserialize_with = "deserialize_lenient")]
    pub boarding_fee: Option<f64>,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default, alias = "departureTime")]
    pub time: Option<String>,
    #[serde(default, alias = "return_time")]
    pub return_time: Option<String>,
}

impl SegmentRecord {
    /// `miles || milesOutbound`, treating zero as absent.
    fn one_way_miles(&self) -> Option<f64> {
        self.miles
            .map(finite_or_zero)
            .filter(|m| *m > 0.0)
            .or_else(|| self.miles_outbound.map(finite_or_zero).filter(|m| *m > 0.0))
    }

    fn to_segment(&self, miles: f64) -> FlightSegment {
        FlightSegment {
            from: self.from.clone().unwrap_or_default(),
            to: self.to.clone().unwrap_or_default(),
            date: self.date.clone().unwrap_or_default(),
            miles,
            boarding_fee: self.boarding_fee,
            airline: self.airline.clone(),
            time: self.time.clone(),
        }
    }
}

/// Aggregates loose records of either shape without ever failing.
///
/// ## Rules
/// - Quote shape: `total = per passenger × passengers`
///   - one way: `miles || milesOutbound || 0`
///   - round trip: one combined record → `outbound + return`;
///     two discrete records → `Σ miles`
///   - multi city: `Σ miles`
/// - Sale shape: `total = Σ miles`, `per passenger = total ÷ passengers`
pub fn aggregate(
    trip_type: TripType,
    records: &[SegmentRecord],
    passengers: u32,
    shape: SegmentShape,
) -> MileageTotals {
    match shape {
        SegmentShape::Quote => {
            QuoteSegments::from_records(trip_type, records, None).totals(passengers)
        }
        SegmentShape::Sale => {
            let total = match trip_type {
                TripType::OneWay => records
                    .first()
                    .and_then(SegmentRecord::one_way_miles)
                    .unwrap_or(0.0),
                TripType::RoundTrip | TripType::MultiCity => records
                    .iter()
                    .map(|r| {
                        r.miles.map(finite_or_zero).unwrap_or_else(|| {
                            r.miles_outbound.map(finite_or_zero).unwrap_or(0.0)
                                + r.miles_return.map(finite_or_zero).unwrap_or(0.0)
                        })
                    })
                    .sum(),
            };
            MileageTotals::from_total(total, passengers)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn records(json: &str) -> Vec<SegmentRecord> {
        parse_records(json).unwrap()
    }

    #[test]
    fn test_round_trip_quote_to_sale() {
        let quote = QuoteSegments::RoundTrip {
            trip: RoundTripQuote {
                origin: "GRU".into(),
                destination: "LIS".into(),
                departure_date: "2026-03-10".into(),
                return_date: "2026-03-24".into(),
                miles_outbound: 25_000.0,
                miles_return: 25_000.0,
                ..Default::default()
            },
        };

        assert_eq!(quote.totals(2).total_miles, 100_000.0);

        let sale = quote.to_sale_segments(2);
        let legs = sale.legs();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].route(), "GRU → LIS");
        assert_eq!(legs[0].date, "2026-03-10");
        assert_eq!(legs[0].miles, 50_000.0);
        assert_eq!(legs[1].route(), "LIS → GRU");
        assert_eq!(legs[1].date, "2026-03-24");
        assert_eq!(legs[1].miles, 50_000.0);
        assert_eq!(sale.total_miles(), 100_000.0);
        assert_eq!(sale.totals(2).per_passenger_miles, 50_000.0);
    }

    #[test]
    fn test_multi_city_totals() {
        let quote = QuoteSegments::MultiCity {
            segments: vec![
                FlightSegment::new("GRU", "MIA", "2026-05-01", 10_000.0),
                FlightSegment::new("MIA", "JFK", "2026-05-05", 15_000.0),
                FlightSegment::new("JFK", "GRU", "2026-05-12", 20_000.0),
            ],
        };

        let totals = quote.totals(2);
        assert_eq!(totals.per_passenger_miles, 45_000.0);
        assert_eq!(totals.total_miles, 90_000.0);

        let sale = quote.to_sale_segments(2);
        let miles: Vec<f64> = sale.legs().iter().map(|s| s.miles).collect();
        assert_eq!(miles, vec![20_000.0, 30_000.0, 40_000.0]);
    }

    #[test]
    fn test_one_way_quote() {
        let quote = QuoteSegments::OneWay {
            segment: FlightSegment::new("CNF", "SSA", "2026-07-01", 12_500.0),
        };
        assert_eq!(quote.totals(3).total_miles, 37_500.0);
        assert_eq!(quote.to_sale_segments(3).legs()[0].miles, 37_500.0);
    }

    #[test]
    fn test_nan_miles_are_zero() {
        let quote = QuoteSegments::OneWay {
            segment: FlightSegment::new("A", "B", "", f64::NAN),
        };
        assert_eq!(quote.totals(2), MileageTotals::default());
    }

    #[test]
    fn test_legacy_combined_round_trip_record() {
        let recs = records(
            r#"[{"origin": "GRU", "destination": "CDG", "departureDate": "2026-09-01",
                 "returnDate": "2026-09-15", "miles_ida": "30.000", "miles_volta": 28000}]"#,
        );
        let quote = QuoteSegments::from_records(TripType::RoundTrip, &recs, None);

        match &quote {
            QuoteSegments::RoundTrip { trip } => {
                assert_eq!(trip.origin, "GRU");
                assert_eq!(trip.destination, "CDG");
                assert_eq!(trip.return_date, "2026-09-15");
                assert_eq!(trip.miles_outbound, 30_000.0);
                assert_eq!(trip.miles_return, 28_000.0);
            }
            other => panic!("expected round trip, got {:?}", other),
        }
        assert_eq!(quote.per_passenger_miles(), 58_000.0);
    }

    #[test]
    fn test_legacy_two_leg_round_trip() {
        let recs = records(
            r#"[{"from": "GRU", "to": "LIS", "date": "2026-03-10", "miles": 20000},
                {"from": "LIS", "to": "GRU", "date": "2026-03-20", "miles": 22000}]"#,
        );
        let quote = QuoteSegments::from_records(TripType::RoundTrip, &recs, None);
        assert_eq!(quote.per_passenger_miles(), 42_000.0);

        let sale = quote.to_sale_segments(1);
        assert_eq!(sale.legs()[1].date, "2026-03-20");
    }

    #[test]
    fn test_legacy_one_way_fallbacks() {
        let recs = records(r#"{"from": "GRU", "to": "REC", "milesOutbound": 9000}"#);
        let quote = QuoteSegments::from_records(TripType::OneWay, &recs, None);
        assert_eq!(quote.per_passenger_miles(), 9_000.0);

        let recs = records(r#"[{"from": "GRU", "to": "REC", "miles_ida": "9.000"}]"#);
        let quote = QuoteSegments::from_records(TripType::OneWay, &recs, None);
        assert_eq!(quote.per_passenger_miles(), 9_000.0);
        assert_eq!(quote.totals(2).total_miles, 18_000.0);

        let recs = records(r#"[{"from": "GRU", "to": "REC", "miles": 0}]"#);
        let quote = QuoteSegments::from_records(TripType::OneWay, &recs, Some(11_000.0));
        assert_eq!(quote.per_passenger_miles(), 11_000.0);

        let quote = QuoteSegments::from_records(TripType::OneWay, &[], None);
        assert_eq!(quote.per_passenger_miles(), 0.0);
    }

    #[test]
    fn test_decode_versions() {
        let tagged = serde_json::to_string(&QuoteSegments::OneWay {
            segment: FlightSegment::new("GRU", "POA", "2026-01-02", 7_000.0),
        })
        .unwrap();
        assert!(tagged.contains(r#""tripType":"one_way""#));

        let decoded = QuoteSegments::decode(2, TripType::OneWay, &tagged, None).unwrap();
        assert_eq!(decoded.per_passenger_miles(), 7_000.0);

        let legacy = r#"[{"origin": "GRU", "destination": "POA", "miles": "7.000"}]"#;
        let decoded = QuoteSegments::decode(1, TripType::OneWay, legacy, None).unwrap();
        assert_eq!(decoded, QuoteSegments::OneWay {
            segment: FlightSegment::new("GRU", "POA", "", 7_000.0),
        });

        assert!(QuoteSegments::decode(2, TripType::OneWay, "not json", None).is_err());
    }

    #[test]
    fn test_aggregate_quote_shape() {
        let recs = records(r#"[{"miles": 10000}, {"miles": 15000}, {"miles": "20.000"}]"#);
        let totals = aggregate(TripType::MultiCity, &recs, 2, SegmentShape::Quote);
        assert_eq!(totals.per_passenger_miles, 45_000.0);
        assert_eq!(totals.total_miles, 90_000.0);

        let recs = records(r#"[{"milesOutbound": 25000, "milesReturn": 25000}]"#);
        let totals = aggregate(TripType::RoundTrip, &recs, 2, SegmentShape::Quote);
        assert_eq!(totals.total_miles, 100_000.0);
    }

    #[test]
    fn test_aggregate_sale_shape() {
        let recs = records(r#"[{"miles": 50000}, {"miles": 50000}]"#);
        let totals = aggregate(TripType::RoundTrip, &recs, 2, SegmentShape::Sale);
        assert_eq!(totals.total_miles, 100_000.0);
        assert_eq!(totals.per_passenger_miles, 50_000.0);
    }

    #[test]
    fn test_aggregate_never_fails_on_garbage() {
        let recs = records(r#"[{"miles": "abc"}, {}]"#);
        let totals = aggregate(TripType::MultiCity, &recs, 0, SegmentShape::Sale);
        assert_eq!(totals, MileageTotals::default());

        let totals = aggregate(TripType::OneWay, &[], 3, SegmentShape::Quote);
        assert_eq!(totals, MileageTotals::default());
    }

    #[test]
    fn test_decode_legacy_sale_rows() {
        let two_legs = r#"[{"from": "GRU", "to": "LIS", "miles": 50000},
                           {"from": "LIS", "to": "GRU", "miles": 50000}]"#;
        let sale = SaleSegments::decode(1, TripType::RoundTrip, two_legs).unwrap();
        assert_eq!(sale.total_miles(), 100_000.0);
        assert_eq!(sale.legs()[1].from, "LIS");

        let combined = r#"[{"origin": "GRU", "destination": "LIS",
                            "milesOutbound": 40000, "milesReturn": 30000}]"#;
        let sale = SaleSegments::decode(1, TripType::RoundTrip, combined).unwrap();
        assert_eq!(sale.legs().len(), 2);
        assert_eq!(sale.legs()[1].miles, 30_000.0);

        let tagged = serde_json::to_string(&sale).unwrap();
        assert_eq!(SaleSegments::decode(2, TripType::OneWay, &tagged).unwrap(), sale);
    }

    #[test]
    fn test_route_text_and_missing_fields() {
        let sale = SaleSegments::MultiCity {
            segments: vec![
                FlightSegment::new("GRU", "MIA", "", 1.0),
                FlightSegment::new("MIA", " ", "", 1.0),
            ],
        };
        assert_eq!(sale.route_text(), "GRU → MIA / MIA → ");
        assert_eq!(sale.missing_fields(), vec!["segment 2: destination".to_string()]);

        let empty = SaleSegments::MultiCity { segments: vec![] };
        assert_eq!(empty.missing_fields().len(), 1);
    }
}
