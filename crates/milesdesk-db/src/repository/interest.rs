//! # Interest Config Repository
//!
//! Stores the agency's card surcharge table.
//!
//! ```text
//! payment_interest_configs
//! ┌────────┬──────────────┬──────────┬─────────────────┬───────────────────┐
//! │ type   │ installments │ rate (%) │ config_type     │ per_installment   │
//! ├────────┼──────────────┼──────────┼─────────────────┼───────────────────┤
//! │ debit  │ 1            │ 1.99     │ flat            │ {}                │
//! │ credit │ 3            │ 6.00     │ flat            │ {}                │
//! │ credit │ 6            │ 9.00     │ per_installment │ {"6": 8.5}        │
//! └────────┴──────────────┴──────────┴─────────────────┴───────────────────┘
//!   UNIQUE (payment_type, installments)
//! ```
//!
//! Every write validates through the core before touching the table, so a
//! debit row with more than one installment never reaches the resolver.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use milesdesk_core::interest::{validate_config_table, ConfigType};
use milesdesk_core::{CoreError, PaymentInterestConfig, PaymentType};

#[derive(Debug, sqlx::FromRow)]
struct InterestConfigRow {
    payment_type: PaymentType,
    installments: i64,
    interest_rate_percent: f64,
    config_type: ConfigType,
    per_installment_rates: String,
}

impl TryFrom<InterestConfigRow> for PaymentInterestConfig {
    type Error = DbError;

    fn try_from(row: InterestConfigRow) -> DbResult<Self> {
        let id = format!("{} {}x", row.payment_type, row.installments);
        let installments = u32::try_from(row.installments)
            .map_err(|_| DbError::corrupt("PaymentInterestConfig", &id, "negative installments"))?;
        let per_installment_rates: BTreeMap<u32, f64> =
            serde_json::from_str(&row.per_installment_rates)
                .map_err(|e| DbError::corrupt("PaymentInterestConfig", &id, e))?;

        Ok(PaymentInterestConfig {
            payment_type: row.payment_type,
            installments,
            interest_rate_percent: row.interest_rate_percent,
            config_type: row.config_type,
            per_installment_rates,
        })
    }
}

/// Repository for the surcharge table.
#[derive(Debug, Clone)]
pub struct InterestConfigRepository {
    pool: SqlitePool,
}

impl InterestConfigRepository {
    /// Creates a new InterestConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InterestConfigRepository { pool }
    }

    /// The whole table, ordered by payment type then installments.
    ///
    /// This is what callers hand to the pricing functions.
    pub async fn list_all(&self) -> DbResult<Vec<PaymentInterestConfig>> {
        list_all_with(&self.pool).await
    }

    /// Gets the config for one `(payment type, installments)` pair.
    pub async fn get(
        &self,
        payment_type: PaymentType,
        installments: u32,
    ) -> DbResult<Option<PaymentInterestConfig>> {
        let row: Option<InterestConfigRow> = sqlx::query_as(
            r#"
            SELECT payment_type, installments, interest_rate_percent,
                   config_type, per_installment_rates
            FROM payment_interest_configs
            WHERE payment_type = ?1 AND installments = ?2
            "#,
        )
        .bind(payment_type)
        .bind(i64::from(installments))
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentInterestConfig::try_from).transpose()
    }

    /// Inserts or replaces the config for its `(payment type, installments)`.
    pub async fn upsert(&self, config: &PaymentInterestConfig) -> DbResult<()> {
        config.validate().map_err(CoreError::from)?;
        upsert_with(&self.pool, config).await
    }

    /// Replaces the whole table atomically.
    ///
    /// ## Errors
    /// - `Domain(Validation(Duplicate))` if two configs share a key
    /// - `Domain(Validation(..))` for any invalid config
    pub async fn replace_all(&self, configs: &[PaymentInterestConfig]) -> DbResult<()> {
        validate_config_table(configs).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM payment_interest_configs")
            .execute(&mut *tx)
            .await?;
        for config in configs {
            upsert_with(&mut *tx, config).await?;
        }
        tx.commit().await?;

        info!(count = configs.len(), "Interest table replaced");
        Ok(())
    }

    /// Removes a config. Returns whether a row was deleted.
    pub async fn delete(&self, payment_type: PaymentType, installments: u32) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM payment_interest_configs WHERE payment_type = ?1 AND installments = ?2",
        )
        .bind(payment_type)
        .bind(i64::from(installments))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) async fn list_all_with<'e, E>(executor: E) -> DbResult<Vec<PaymentInterestConfig>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<InterestConfigRow> = sqlx::query_as(
        r#"
        SELECT payment_type, installments, interest_rate_percent,
               config_type, per_installment_rates
        FROM payment_interest_configs
        ORDER BY payment_type, installments
        "#,
    )
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(PaymentInterestConfig::try_from).collect()
}

async fn upsert_with<'e, E>(executor: E, config: &PaymentInterestConfig) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        payment_type = %config.payment_type,
        installments = config.installments,
        rate = config.interest_rate_percent,
        "Saving interest config"
    );

    let rates = serde_json::to_string(&config.per_installment_rates)?;

    sqlx::query(
        r#"
        INSERT INTO payment_interest_configs (
            payment_type, installments, interest_rate_percent,
            config_type, per_installment_rates, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (payment_type, installments) DO UPDATE SET
            interest_rate_percent = excluded.interest_rate_percent,
            config_type = excluded.config_type,
            per_installment_rates = excluded.per_installment_rates,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(config.payment_type)
    .bind(i64::from(config.installments))
    .bind(config.interest_rate_percent)
    .bind(config.config_type)
    .bind(rates)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
