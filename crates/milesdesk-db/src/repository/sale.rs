//! # Sale Repository
//!
//! Database operations for sales.
//!
//! ## Where Sales Come From
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ConversionService ──► insert (inside the convert-once transaction)     │
//! │  Walk-in sale      ──► insert (no quote_id)                             │
//! │                                                                         │
//! │  Sales are immutable once written. Payment terms are fixed at           │
//! │  conversion time.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use milesdesk_core::segments::{SaleSegments, CURRENT_SCHEMA_VERSION};
use milesdesk_core::{CoreError, Customer, PaymentMethod, Sale, TripType};

const SELECT_SALE: &str = r#"
    SELECT
        id, quote_id, customer_name, customer_email, customer_phone,
        trip_type, passengers, segments, schema_version,
        price_total, boarding_fee_total, miles_used_total,
        total_cost, profit, profit_margin_percent,
        payment_method, installments, interest_rate_percent,
        final_amount, installment_value, created_at
    FROM sales
"#;

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    quote_id: Option<String>,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    trip_type: TripType,
    passengers: i64,
    segments: String,
    schema_version: i64,
    price_total: f64,
    boarding_fee_total: f64,
    miles_used_total: f64,
    total_cost: f64,
    profit: f64,
    profit_margin_percent: f64,
    payment_method: PaymentMethod,
    installments: i64,
    interest_rate_percent: f64,
    final_amount: f64,
    installment_value: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        let passengers = u32::try_from(row.passengers)
            .map_err(|_| DbError::corrupt("Sale", &row.id, "negative passenger count"))?;
        let installments = u32::try_from(row.installments)
            .map_err(|_| DbError::corrupt("Sale", &row.id, "negative installments"))?;
        let schema_version = u32::try_from(row.schema_version)
            .map_err(|_| DbError::corrupt("Sale", &row.id, "negative schema version"))?;
        let segments = SaleSegments::decode(schema_version, row.trip_type, &row.segments)
            .map_err(|e| DbError::corrupt("Sale", &row.id, e))?;

        Ok(Sale {
            id: row.id,
            quote_id: row.quote_id,
            customer: Customer {
                name: row.customer_name,
                email: row.customer_email,
                phone: row.customer_phone,
            },
            passengers,
            segments,
            price_total: row.price_total,
            boarding_fee_total: row.boarding_fee_total,
            miles_used_total: row.miles_used_total,
            total_cost: row.total_cost,
            profit: row.profit,
            profit_margin_percent: row.profit_margin_percent,
            payment_method: row.payment_method,
            installments,
            interest_rate_percent: row.interest_rate_percent,
            final_amount: row.final_amount,
            installment_value: row.installment_value,
            schema_version,
            created_at: row.created_at,
        })
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale that did not come from a quote.
    ///
    /// Converted sales go through [`crate::ConversionService`], which also
    /// links the quote.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        if sale.price_total <= 0.0 || !sale.price_total.is_finite() {
            return Err(CoreError::ZeroOrNegativePrice {
                price: sale.price_total,
            }
            .into());
        }
        if sale.quote_id.is_some() {
            return Err(DbError::QueryFailed(
                "sales with a quote must be created through the conversion service".to_string(),
            ));
        }
        insert_sale_with(&self.pool, sale).await
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sale::try_from).transpose()
    }

    /// Gets the sale a quote was converted into.
    pub async fn get_by_quote_id(&self, quote_id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SELECT_SALE} WHERE quote_id = ?1"))
            .bind(quote_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Sale::try_from).transpose()
    }

    /// Lists the most recent sales.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let rows: Vec<SaleRow> =
            sqlx::query_as(&format!("{SELECT_SALE} ORDER BY created_at DESC LIMIT ?1"))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Sale::try_from).collect()
    }

    /// Number of sales created from quotes.
    pub async fn count_converted(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE quote_id IS NOT NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Inserts a sale row through any executor.
pub(crate) async fn insert_sale_with<'e, E>(executor: E, sale: &Sale) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        id = %sale.id,
        quote_id = ?sale.quote_id,
        trip_type = %sale.trip_type(),
        price_total = sale.price_total,
        "Inserting sale"
    );

    let segments = serde_json::to_string(&sale.segments)?;

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, quote_id, customer_name, customer_email, customer_phone,
            trip_type, passengers, segments, schema_version,
            price_total, boarding_fee_total, miles_used_total,
            total_cost, profit, profit_margin_percent,
            payment_method, installments, interest_rate_percent,
            final_amount, installment_value, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12,
            ?13, ?14, ?15,
            ?16, ?17, ?18,
            ?19, ?20, ?21
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.quote_id)
    .bind(&sale.customer.name)
    .bind(&sale.customer.email)
    .bind(&sale.customer.phone)
    .bind(sale.trip_type())
    .bind(i64::from(sale.passengers))
    .bind(segments)
    .bind(i64::from(CURRENT_SCHEMA_VERSION))
    .bind(sale.price_total)
    .bind(sale.boarding_fee_total)
    .bind(sale.miles_used_total)
    .bind(sale.total_cost)
    .bind(sale.profit)
    .bind(sale.profit_margin_percent)
    .bind(sale.payment_method)
    .bind(i64::from(sale.installments))
    .bind(sale.interest_rate_percent)
    .bind(sale.final_amount)
    .bind(sale.installment_value)
    .bind(sale.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
