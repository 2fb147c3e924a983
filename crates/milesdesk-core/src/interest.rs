//! # Installment Interest
//!
//! Resolves card surcharge rates from the agency's rate table and splits the
//! surcharged amount into installments.
//!
//! ## Flat-Fee Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base R$ 1.000,00, credit 3×, rate 6%                                   │
//! │                                                                         │
//! │  final price       = 1000 × (1 + 6/100)  = 1060.00                      │
//! │  installment value = 1060 / 3            =  353.33                      │
//! │                                                                         │
//! │  The surcharge is applied ONCE to the whole amount and then split       │
//! │  evenly. This is NOT an amortizing / declining-balance schedule.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rate Lookup
//! ```text
//! (payment type, installments)
//!      │
//!      ├── no config matches ──────────────────────────► rate 0 (no surcharge)
//!      │
//!      ├── per_installment + rates[installments] exists ► that rate
//!      │
//!      └── otherwise ──────────────────────────────────► config's flat rate
//! ```
//!
//! The rate table is always passed in by the caller; nothing here fetches it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::number::finite_or_zero;
use crate::validation::{validate_installments, validate_rate_percent, ValidationResult};
use crate::MAX_CREDIT_INSTALLMENTS;

// =============================================================================
// Payment Type
// =============================================================================

/// Card payment type that can carry a surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Debit,
    Credit,
}

impl PaymentType {
    /// Highest installment count this payment type accepts.
    pub const fn max_installments(&self) -> u32 {
        match self {
            PaymentType::Debit => 1,
            PaymentType::Credit => MAX_CREDIT_INSTALLMENTS,
        }
    }

    /// Debit is always a single installment; credit keeps the request.
    pub const fn effective_installments(&self, requested: u32) -> u32 {
        match self {
            PaymentType::Debit => 1,
            PaymentType::Credit => requested,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Debit => "debit",
            PaymentType::Credit => "credit",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a config's rate is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConfigType {
    /// Single `interest_rate_percent` for the config.
    #[default]
    Flat,
    /// `per_installment_rates[n]` overrides the flat rate when present.
    PerInstallment,
}

// =============================================================================
// Payment Interest Config
// =============================================================================

/// One row of the agency's surcharge table.
///
/// Construct through [`PaymentInterestConfig::new`] so that debit/credit
/// installment limits are enforced before the config ever reaches
/// [`resolve_rate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInterestConfig {
    pub payment_type: PaymentType,
    pub installments: u32,
    pub interest_rate_percent: f64,
    #[serde(default)]
    pub config_type: ConfigType,
    #[serde(default)]
    pub per_installment_rates: BTreeMap<u32, f64>,
}

impl PaymentInterestConfig {
    /// Creates a validated flat-rate config.
    ///
    /// ## Rules
    /// - Debit: installments must be exactly 1
    /// - Credit: installments between 1 and 24
    /// - Rate must be finite and not negative
    ///
    /// ## Example
    /// ```rust
    /// use milesdesk_core::interest::{PaymentInterestConfig, PaymentType};
    ///
    /// assert!(PaymentInterestConfig::new(PaymentType::Credit, 3, 6.0).is_ok());
    /// assert!(PaymentInterestConfig::new(PaymentType::Debit, 2, 1.5).is_err());
    /// ```
    pub fn new(
        payment_type: PaymentType,
        installments: u32,
        interest_rate_percent: f64,
    ) -> ValidationResult<Self> {
        let config = PaymentInterestConfig {
            payment_type,
            installments,
            interest_rate_percent,
            config_type: ConfigType::Flat,
            per_installment_rates: BTreeMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Switches the config to per-installment rates.
    pub fn with_per_installment_rates(
        mut self,
        rates: impl IntoIterator<Item = (u32, f64)>,
    ) -> ValidationResult<Self> {
        self.config_type = ConfigType::PerInstallment;
        self.per_installment_rates = rates.into_iter().collect();
        self.validate()?;
        Ok(self)
    }

    /// Checks the debit/credit installment invariant and rate sanity.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_installments(self.payment_type, self.installments)?;
        validate_rate_percent("interest_rate_percent", self.interest_rate_percent)?;

        for (&count, &rate) in &self.per_installment_rates {
            if count == 0 || count > self.payment_type.max_installments() {
                return Err(ValidationError::OutOfRange {
                    field: "per_installment_rates".to_string(),
                    min: 1,
                    max: self.payment_type.max_installments() as i64,
                });
            }
            validate_rate_percent("per_installment_rates", rate)?;
        }

        Ok(())
    }

    /// The rate this config yields for `installments`.
    pub fn rate_for(&self, installments: u32) -> f64 {
        let rate = match self.config_type {
            ConfigType::PerInstallment => self
                .per_installment_rates
                .get(&installments)
                .copied()
                .unwrap_or(self.interest_rate_percent),
            ConfigType::Flat => self.interest_rate_percent,
        };
        finite_or_zero(rate)
    }
}

/// Rejects tables with two configs for the same `(payment type, installments)`.
pub fn validate_config_table(configs: &[PaymentInterestConfig]) -> ValidationResult<()> {
    let mut seen = std::collections::HashSet::new();
    for config in configs {
        config.validate()?;
        if !seen.insert((config.payment_type, config.installments)) {
            return Err(ValidationError::Duplicate {
                field: "interest config".to_string(),
                value: format!("{} {}x", config.payment_type, config.installments),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves the surcharge rate (percent) for a payment.
///
/// Unknown combinations are not an error: they resolve to `0.0`.
///
/// ## Example
/// ```rust
/// use milesdesk_core::interest::{resolve_rate, PaymentInterestConfig, PaymentType};
///
/// let table = vec![PaymentInterestConfig::new(PaymentType::Credit, 3, 6.0).unwrap()];
///
/// assert_eq!(resolve_rate(&table, PaymentType::Credit, 3), 6.0);
/// assert_eq!(resolve_rate(&table, PaymentType::Credit, 4), 0.0);
/// ```
pub fn resolve_rate(
    configs: &[PaymentInterestConfig],
    payment_type: PaymentType,
    installments: u32,
) -> f64 {
    let installments = payment_type.effective_installments(installments);

    configs
        .iter()
        .find(|c| c.payment_type == payment_type && c.installments == installments)
        .map(|c| c.rate_for(installments))
        .unwrap_or(0.0)
}

/// Result of splitting a surcharged amount into installments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentQuote {
    pub installments: u32,
    pub interest_rate_percent: f64,
    pub installment_value: f64,
    pub final_price: f64,
}

impl InstallmentQuote {
    /// Surcharge added on top of the base amount.
    pub fn surcharge(&self, base_amount: f64) -> f64 {
        self.final_price - finite_or_zero(base_amount)
    }
}

/// Applies the flat-fee model.
///
/// `installments == 0` is treated as a single installment.
///
/// ## Example
/// ```rust
/// use milesdesk_core::interest::compute_installment;
///
/// let quote = compute_installment(1000.0, 3, 6.0);
/// assert!((quote.final_price - 1060.0).abs() < 1e-9);
/// assert!((quote.installment_value - 353.333).abs() < 0.001);
/// ```
pub fn compute_installment(base_amount: f64, installments: u32, rate_percent: f64) -> InstallmentQuote {
    let installments = installments.max(1);
    let rate = finite_or_zero(rate_percent);
    let final_price = finite_or_zero(base_amount) * (1.0 + rate / 100.0);

    InstallmentQuote {
        installments,
        interest_rate_percent: rate,
        installment_value: final_price / f64::from(installments),
        final_price,
    }
}

/// Resolves the rate and computes the installment split in one step.
pub fn quote_installments(
    configs: &[PaymentInterestConfig],
    payment_type: PaymentType,
    installments: u32,
    base_amount: f64,
) -> InstallmentQuote {
    let installments = payment_type.effective_installments(installments);
    let rate = resolve_rate(configs, payment_type, installments);
    compute_installment(base_amount, installments, rate)
}

/// Every installment option for a payment type, for the checkout selector.
///
/// Debit yields one option; credit yields 1× through 24×.
pub fn installment_options(
    configs: &[PaymentInterestConfig],
    payment_type: PaymentType,
    base_amount: f64,
) -> Vec<InstallmentQuote> {
    (1..=payment_type.max_installments())
        .map(|n| quote_installments(configs, payment_type, n, base_amount))
        .collect()
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

    fn table() -> Vec<PaymentInterestConfig> {
        vec![
            PaymentInterestConfig::new(PaymentType::Debit, 1, 1.99).unwrap(),
            PaymentInterestConfig::new(PaymentType::Credit, 1, 3.5).unwrap(),
            PaymentInterestConfig::new(PaymentType::Credit, 3, 6.0).unwrap(),
            PaymentInterestConfig::new(PaymentType::Credit, 6, 9.0)
                .unwrap()
                .with_per_installment_rates([(6, 8.5)])
                .unwrap(),
            PaymentInterestConfig::new(PaymentType::Credit, 10, 12.0)
                .unwrap()
                .with_per_installment_rates([(12, 14.0)])
                .unwrap(),
        ]
    }

    #[test]
    fn test_flat_credit_three_installments() {
        let rate = resolve_rate(&table(), PaymentType::Credit, 3);
        assert!(approx(rate, 6.0));

        let quote = compute_installment(1000.0, 3, rate);
        assert!(approx(quote.final_price, 1060.0));
        assert!((quote.installment_value - 353.33).abs() < 0.005);
        assert!(approx(quote.surcharge(1000.0), 60.0));
    }

    #[test]
    fn test_per_installment_override() {
        assert!(approx(resolve_rate(&table(), PaymentType::Credit, 6), 8.5));
    }

    #[test]
    fn test_per_installment_without_entry_uses_flat_rate() {
        assert!(approx(resolve_rate(&table(), PaymentType::Credit, 10), 12.0));
    }

    #[test]
    fn test_missing_config_is_zero_rate() {
        let rate = resolve_rate(&table(), PaymentType::Credit, 5);
        assert_eq!(rate, 0.0);

        let quote = compute_installment(1000.0, 5, rate);
        assert!(approx(quote.installment_value, 200.0));
        assert!(approx(quote.final_price, 1000.0));
    }

    #[test]
    fn test_debit_is_always_one_installment() {
        let quote = quote_installments(&table(), PaymentType::Debit, 4, 500.0);
        assert_eq!(quote.installments, 1);
        assert!(approx(quote.interest_rate_percent, 1.99));
        assert!(approx(quote.final_price, 509.95));
    }

    #[test]
    fn test_debit_without_config_has_no_surcharge() {
        let credit_only = vec![PaymentInterestConfig::new(PaymentType::Credit, 2, 4.0).unwrap()];
        let quote = quote_installments(&credit_only, PaymentType::Debit, 1, 300.0);
        assert_eq!(quote.interest_rate_percent, 0.0);
        assert!(approx(quote.final_price, 300.0));
    }

    #[test]
    fn test_zero_installments_treated_as_one() {
        let quote = compute_installment(100.0, 0, 0.0);
        assert_eq!(quote.installments, 1);
        assert!(approx(quote.installment_value, 100.0));
    }

    #[test]
    fn test_config_validation() {
        assert!(PaymentInterestConfig::new(PaymentType::Debit, 1, 2.0).is_ok());
        assert!(PaymentInterestConfig::new(PaymentType::Debit, 0, 2.0).is_err());
        assert!(PaymentInterestConfig::new(PaymentType::Debit, 3, 2.0).is_err());
        assert!(PaymentInterestConfig::new(PaymentType::Credit, 24, 30.0).is_ok());
        assert!(PaymentInterestConfig::new(PaymentType::Credit, 25, 30.0).is_err());
        assert!(PaymentInterestConfig::new(PaymentType::Credit, 0, 1.0).is_err());
        assert!(PaymentInterestConfig::new(PaymentType::Credit, 2, -1.0).is_err());
        assert!(PaymentInterestConfig::new(PaymentType::Credit, 2, f64::NAN).is_err());

        let bad_override = PaymentInterestConfig::new(PaymentType::Credit, 2, 4.0)
            .unwrap()
            .with_per_installment_rates([(30, 1.0)]);
        assert!(bad_override.is_err());
    }

    #[test]
    fn test_duplicate_configs_rejected() {
        let mut configs = table();
        configs.push(PaymentInterestConfig::new(PaymentType::Credit, 3, 7.0).unwrap());
        assert!(matches!(
            validate_config_table(&configs),
            Err(ValidationError::Duplicate { .. })
        ));
        assert!(validate_config_table(&table()).is_ok());
    }

    #[test]
    fn test_installment_options() {
        let credit = installment_options(&table(), PaymentType::Credit, 1000.0);
        assert_eq!(credit.len(), 24);
        assert_eq!(credit[0].installments, 1);
        assert!(approx(credit[2].final_price, 1060.0));
        assert_eq!(credit[23].interest_rate_percent, 0.0);

        let debit = installment_options(&table(), PaymentType::Debit, 1000.0);
        assert_eq!(debit.len(), 1);
    }

    #[test]
    fn test_config_json_shape() {
        let json = r#"{
            "paymentType": "credit",
            "installments": 6,
            "interestRatePercent": 9.0,
            "configType": "per_installment",
            "perInstallmentRates": {"6": 8.5}
        }"#;
        let config: PaymentInterestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.config_type, ConfigType::PerInstallment);
        assert!(approx(config.rate_for(6), 8.5));
    }
}
