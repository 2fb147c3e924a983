//! # Mileage Cost Calculator
//!
//! Derives cost, price, profit, margin and markup for a trip paid in miles.
//!
//! ## Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  miles/pax ──► (÷1000 × cost per thousand) ──► miles cost/pax           │
//! │                                                   │                     │
//! │                          + boarding fee/pax ◄─────┤                     │
//! │                                 │                 │                     │
//! │                         cost/pax × pax = TOTAL COST                     │
//! │                                                   │                     │
//! │  manual price/pax > 0 ? ──YES──► final price/pax  │                     │
//! │          │ NO                                     ▼                     │
//! │          └──► miles cost/pax × (1 + markup%) + fee = suggested/pax      │
//! │                                                                         │
//! │  final price/pax × pax = FINAL PRICE TOTAL                              │
//! │  PROFIT = final total - total cost                                      │
//! │  MARGIN = profit / final total   (against PRICE)                        │
//! │  MARKUP = (price/pax - fee - miles cost) / miles cost  (against COST)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every value stays unrounded. Missing inputs are zero and only produce
//! degenerate (zero) outputs, never an error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::number::finite_or_zero;

// =============================================================================
// Defaults
// =============================================================================

/// Agency-wide pricing defaults (loaded from configuration by the caller).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingDefaults {
    /// Markup applied when a draft has no manual price.
    #[serde(default = "default_markup_percent")]
    pub target_markup_percent: f64,

    /// Supplier cost per 1,000 miles used when a draft has none.
    #[serde(default)]
    pub cost_per_thousand_miles: f64,

    /// Boarding fee per passenger used when a draft has none.
    #[serde(default)]
    pub boarding_fee_per_passenger: f64,
}

fn default_markup_percent() -> f64 {
    20.0
}

impl Default for PricingDefaults {
    fn default() -> Self {
        PricingDefaults {
            target_markup_percent: default_markup_percent(),
            cost_per_thousand_miles: 0.0,
            boarding_fee_per_passenger: 0.0,
        }
    }
}

// =============================================================================
// Input
// =============================================================================

/// Inputs to the calculator. Every field defaults to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingInput {
    pub miles_per_passenger: f64,
    pub cost_per_thousand_miles: f64,
    pub boarding_fee_per_passenger: f64,
    pub passenger_count: u32,
    /// `None` takes the agency default; `Some(0.0)` prices at cost.
    #[ts(optional)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_markup_percent: Option<f64>,
    /// Overrides the suggested price when greater than zero.
    pub manual_price_per_passenger: Option<f64>,
}

impl PricingInput {
    /// Fills zero cost and fee fields, and an unset markup, from agency
    /// defaults.
    ///
    /// ## Example
    /// ```rust
    /// use milesdesk_core::pricing::{PricingDefaults, PricingInput};
    ///
    /// let input = PricingInput {
    ///     miles_per_passenger: 50_000.0,
    ///     passenger_count: 1,
    ///     ..Default::default()
    /// }
    /// .with_defaults(&PricingDefaults {
    ///     target_markup_percent: 20.0,
    ///     cost_per_thousand_miles: 29.0,
    ///     boarding_fee_per_passenger: 35.0,
    /// });
    ///
    /// assert_eq!(input.cost_per_thousand_miles, 29.0);
    /// ```
    pub fn with_defaults(mut self, defaults: &PricingDefaults) -> Self {
        if self.cost_per_thousand_miles <= 0.0 {
            self.cost_per_thousand_miles = defaults.cost_per_thousand_miles;
        }
        if self.boarding_fee_per_passenger <= 0.0 {
            self.boarding_fee_per_passenger = defaults.boarding_fee_per_passenger;
        }
        if self.target_markup_percent.is_none() {
            self.target_markup_percent = Some(defaults.target_markup_percent);
        }
        self
    }
}

// =============================================================================
// Breakdown
// =============================================================================

/// Full pricing breakdown. Values are unrounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub cost_per_passenger_miles: f64,
    pub cost_per_passenger_total: f64,
    pub total_cost: f64,
    pub suggested_price_per_passenger: f64,
    pub final_price_per_passenger: f64,
    pub final_price_total: f64,
    pub profit: f64,
    /// Profit as a percentage of price.
    pub profit_margin_percent: f64,
    pub effective_miles_price_per_passenger: f64,
    /// Profit on the miles portion as a percentage of miles cost.
    pub miles_markup_percent: f64,
}

impl PricingBreakdown {
    /// True when the final price does not cover the total cost.
    pub fn is_loss(&self) -> bool {
        self.profit < 0.0
    }
}

/// Runs the calculator.
///
/// ## Example
/// ```rust
/// use milesdesk_core::pricing::{calculate, PricingInput};
///
/// let breakdown = calculate(&PricingInput {
///     miles_per_passenger: 50_000.0,
///     cost_per_thousand_miles: 29.0,
///     boarding_fee_per_passenger: 35.0,
///     passenger_count: 1,
///     target_markup_percent: Some(20.0),
///     manual_price_per_passenger: None,
/// });
///
/// assert_eq!(breakdown.total_cost, 1485.0);
/// assert_eq!(breakdown.suggested_price_per_passenger, 1775.0);
/// ```
pub fn calculate(input: &PricingInput) -> PricingBreakdown {
    let miles = finite_or_zero(input.miles_per_passenger);
    let cost_per_thousand = finite_or_zero(input.cost_per_thousand_miles);
    let boarding_fee = finite_or_zero(input.boarding_fee_per_passenger);
    let markup = input.target_markup_percent.map_or(0.0, finite_or_zero);
    let passengers = f64::from(input.passenger_count);

    let cost_per_passenger_miles = (miles / 1000.0) * cost_per_thousand;
    let cost_per_passenger_total = cost_per_passenger_miles + boarding_fee;
    let total_cost = cost_per_passenger_total * passengers;

    let suggested_price_per_passenger =
        cost_per_passenger_miles * (1.0 + markup / 100.0) + boarding_fee;

    let final_price_per_passenger = match input.manual_price_per_passenger.map(finite_or_zero) {
        Some(manual) if manual > 0.0 => manual,
        _ => suggested_price_per_passenger,
    };
    let final_price_total = final_price_per_passenger * passengers;

    let profit = final_price_total - total_cost;
    let profit_margin_percent = margin_percent(profit, final_price_total);

    let effective_miles_price_per_passenger = (final_price_per_passenger - boarding_fee).max(0.0);
    let miles_markup_percent = if cost_per_passenger_miles > 0.0 {
        (effective_miles_price_per_passenger - cost_per_passenger_miles) / cost_per_passenger_miles
            * 100.0
    } else {
        0.0
    };

    PricingBreakdown {
        cost_per_passenger_miles,
        cost_per_passenger_total,
        total_cost,
        suggested_price_per_passenger,
        final_price_per_passenger,
        final_price_total,
        profit,
        profit_margin_percent,
        effective_miles_price_per_passenger,
        miles_markup_percent,
    }
}

/// Profit as a percentage of price. Zero when there is no price.
#[inline]
pub fn margin_percent(profit: f64, price: f64) -> f64 {
    if price > 0.0 {
        finite_or_zero(profit) / price * 100.0
    } else {
        0.0
    }
}

/// Cost of a block of miles at a given price per thousand.
#[inline]
pub fn miles_cost(miles: f64, cost_per_thousand_miles: f64) -> f64 {
    finite_or_zero(miles) / 1000.0 * finite_or_zero(cost_per_thousand_miles)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn reference_input() -> PricingInput {
        PricingInput {
            miles_per_passenger: 50_000.0,
            cost_per_thousand_miles: 29.0,
            boarding_fee_per_passenger: 35.0,
            passenger_count: 1,
            target_markup_percent: Some(20.0),
            manual_price_per_passenger: None,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let b = calculate(&reference_input());

        assert!(approx(b.cost_per_passenger_miles, 1450.0));
        assert!(approx(b.cost_per_passenger_total, 1485.0));
        assert!(approx(b.total_cost, 1485.0));
        assert!(approx(b.suggested_price_per_passenger, 1775.0));
        assert!(approx(b.final_price_total, 1775.0));
        assert!(approx(b.profit, 290.0));
        assert!(approx(b.profit_margin_percent, 290.0 / 1775.0 * 100.0));
        assert!(approx(b.effective_miles_price_per_passenger, 1740.0));
        assert!(approx(b.miles_markup_percent, 20.0));
    }

    #[test]
    fn test_profit_matches_formula_for_any_price() {
        for manual in [1.0, 999.99, 1485.0, 1775.0, 2500.5] {
            let b = calculate(&PricingInput {
                manual_price_per_passenger: Some(manual),
                ..reference_input()
            });
            assert!(approx(b.final_price_total, manual));
            assert!(approx(b.profit, manual - 1485.0));
        }
    }

    #[test]
    fn test_manual_price_zero_falls_back_to_suggested() {
        let b = calculate(&PricingInput {
            manual_price_per_passenger: Some(0.0),
            ..reference_input()
        });
        assert!(approx(b.final_price_per_passenger, 1775.0));
    }

    #[test]
    fn test_multiple_passengers() {
        let b = calculate(&PricingInput {
            passenger_count: 3,
            manual_price_per_passenger: Some(2000.0),
            ..reference_input()
        });
        assert!(approx(b.total_cost, 4455.0));
        assert!(approx(b.final_price_total, 6000.0));
        assert!(approx(b.profit, 1545.0));
        assert!(approx(b.profit_margin_percent, 25.75));
    }

    /// Margin is against price, markup against cost.
    #[test]
    fn test_margin_and_markup_differ() {
        let b = calculate(&PricingInput {
            boarding_fee_per_passenger: 0.0,
            target_markup_percent: Some(100.0),
            ..reference_input()
        });
        assert!(approx(b.miles_markup_percent, 100.0));
        assert!(approx(b.profit_margin_percent, 50.0));
    }

    #[test]
    fn test_all_zero_inputs_are_degenerate_not_errors() {
        let b = calculate(&PricingInput::default());
        assert_eq!(b, PricingBreakdown::default());
    }

    #[test]
    fn test_nan_inputs_are_zero() {
        let b = calculate(&PricingInput {
            miles_per_passenger: f64::NAN,
            cost_per_thousand_miles: 29.0,
            passenger_count: 2,
            ..Default::default()
        });
        assert_eq!(b.total_cost, 0.0);
        assert_eq!(b.profit_margin_percent, 0.0);
        assert_eq!(b.miles_markup_percent, 0.0);
    }

    #[test]
    fn test_price_below_fee_clamps_effective_miles_price() {
        let b = calculate(&PricingInput {
            manual_price_per_passenger: Some(20.0),
            ..reference_input()
        });
        assert_eq!(b.effective_miles_price_per_passenger, 0.0);
        assert!(approx(b.miles_markup_percent, -100.0));
        assert!(b.is_loss());
    }

    #[test]
    fn test_with_defaults_only_fills_missing() {
        let defaults = PricingDefaults {
            target_markup_percent: 15.0,
            cost_per_thousand_miles: 30.0,
            boarding_fee_per_passenger: 40.0,
        };

        let filled = PricingInput::default().with_defaults(&defaults);
        assert_eq!(filled.cost_per_thousand_miles, 30.0);
        assert_eq!(filled.boarding_fee_per_passenger, 40.0);
        assert_eq!(filled.target_markup_percent, Some(15.0));

        let kept = reference_input().with_defaults(&defaults);
        assert_eq!(kept, reference_input());
    }

    #[test]
    fn test_explicit_zero_markup_survives_defaults() {
        let defaults = PricingDefaults {
            target_markup_percent: 15.0,
            ..Default::default()
        };

        let input = PricingInput {
            target_markup_percent: Some(0.0),
            ..reference_input()
        }
        .with_defaults(&defaults);
        assert_eq!(input.target_markup_percent, Some(0.0));

        // Priced at cost: suggested covers miles and fee, nothing more.
        let b = calculate(&input);
        assert!(approx(b.suggested_price_per_passenger, 1485.0));
        assert!(approx(b.profit, 0.0));
    }

    #[test]
    fn test_miles_cost() {
        assert!(approx(miles_cost(90_000.0, 29.0), 2610.0));
        assert_eq!(miles_cost(f64::NAN, 29.0), 0.0);
    }
}
